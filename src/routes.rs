use std::sync::Arc;

use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    AppState,
    auth::{self, CurrentUser, MaybeUser},
    booking::{BookingDraft, BookingError, BookingStep, Confirmation},
    catalog::{self, Category, Section},
    checkout,
    error::AppResult,
    location,
    models::{AuthSession, Credentials, PaymentStatus, Toast, ToastVariant},
    payment::PaymentForm,
    realtime,
    templates::{self, BookingView, PageContext},
};

const FLASH_COOKIE: &str = "flash";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/movies", get(movies))
        .route("/search", get(search))
        .route("/location", get(location_form).post(set_location))
        .route("/auth", get(auth_form))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-out", post(sign_out))
        .route("/movies/{id}/book", post(start_booking))
        .route("/book/{draft}", get(booking))
        .route("/book/{draft}/showtime", post(choose_showtime))
        .route("/book/{draft}/tickets", post(choose_tickets))
        .route("/book/{draft}/seats", post(toggle_seat))
        .route("/book/{draft}/proceed", post(proceed))
        .route("/book/{draft}/back", post(back))
        .route("/book/{draft}/pay", post(pay))
        .route("/bookings", get(my_bookings))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .route("/events/movies", get(realtime::movie_events))
        .route("/events/showtimes/{movie}", get(realtime::showtime_events))
        .route("/events/bookings", get(realtime::booking_events))
        .with_state(state)
}

/// Stores a toast for the page the next redirect lands on.
fn with_flash(jar: CookieJar, toast: Toast) -> CookieJar {
    let variant = match toast.variant {
        ToastVariant::Default => "default",
        ToastVariant::Destructive => "destructive",
    };
    let value = format!("{}|{}|{}", variant, toast.title, toast.description);
    jar.add(Cookie::build((FLASH_COOKIE, urlencoding::encode(&value).into_owned())).path("/").http_only(true))
}

fn take_flash(jar: CookieJar) -> (CookieJar, Option<Toast>) {
    let toast = jar.get(FLASH_COOKIE).and_then(|c| {
        let value = urlencoding::decode(c.value()).ok()?;
        let mut parts = value.splitn(3, '|');
        let variant = parts.next()?;
        let title = parts.next()?;
        let description = parts.next().unwrap_or_default();
        Some(match variant {
            "destructive" => Toast::error(title, description),
            _ => Toast::info(title, description),
        })
    });
    match toast {
        Some(toast) => (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), Some(toast)),
        None => (jar, None),
    }
}

fn context<'a>(
    user: Option<&'a AuthSession>,
    jar: &CookieJar,
    category: Category,
    toast: Option<Toast>,
) -> PageContext<'a> {
    PageContext { user, location: location::selected_location(jar), category, toast }
}

fn unprocessable(body: String) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Html(body)).into_response()
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, Html<String>)> {
    let movies = catalog::load_movies(&state.cache, &state.backend, Category::Movies).await?;
    let first_visit = location::selected_location(&jar).is_none();

    let (jar, toast) = take_flash(jar);
    let ctx = context(user.as_ref(), &jar, Category::Movies, toast);
    Ok((jar, Html(templates::home_page(&ctx, &movies, first_visit))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MoviesQuery {
    category: String,
    section: String,
    genre: String,
}

pub async fn movies(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Query(q): Query<MoviesQuery>,
) -> AppResult<(CookieJar, Html<String>)> {
    let category = Category::parse(&q.category);
    let section = Section::parse(&q.section);
    let genre = Some(q.genre.trim()).filter(|g| !g.is_empty());

    let movies = catalog::load_movies(&state.cache, &state.backend, category).await?;
    let genres = catalog::all_genres(&movies);
    let shown = catalog::filter_movies(&movies, section, genre);
    debug!(category = category.name(), section = section.slug(), genre = ?genre, count = shown.len(), "listing movies");

    let (jar, toast) = take_flash(jar);
    let ctx = context(user.as_ref(), &jar, category, toast);
    Ok((jar, Html(templates::movies_page(&ctx, section, &shown, &genres, genre))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    q: String,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Query(q): Query<SearchQuery>,
) -> AppResult<Html<String>> {
    let results = catalog::search(&state.backend, &q.q).await?;
    let ctx = context(user.as_ref(), &jar, Category::Movies, None);
    Ok(Html(templates::search_page(&ctx, &q.q, &results)))
}

pub async fn location_form(
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Query(q): Query<SearchQuery>,
) -> Html<String> {
    let matches = location::filter_locations(&q.q);
    let ctx = context(user.as_ref(), &jar, Category::Movies, None);
    Html(templates::location_page(&ctx, &q.q, &matches))
}

#[derive(Debug, Deserialize)]
pub struct LocationForm {
    city: String,
}

pub async fn set_location(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Form(form): Form<LocationForm>,
) -> Response {
    let Some(city) = location::find_location(&form.city) else {
        let toast = Toast::error("Unknown city", format!("We don't serve \"{}\" yet.", form.city.trim()));
        let ctx = context(user.as_ref(), &jar, Category::Movies, Some(toast));
        return unprocessable(templates::location_page(&ctx, "", &[]));
    };

    debug!(city, "location selected");
    let jar = jar.add(location::location_cookie(city, state.config.cookie_secure));
    let jar = with_flash(jar, Toast::info("Location updated", format!("Showing theaters in {city}")));
    (jar, Redirect::to("/")).into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthQuery {
    return_to: String,
}

pub async fn auth_form(MaybeUser(user): MaybeUser, jar: CookieJar, Query(q): Query<AuthQuery>) -> Response {
    let return_to = auth::safe_return_to(&q.return_to);
    if user.is_some() {
        return Redirect::to(return_to).into_response();
    }
    let (jar, toast) = take_flash(jar);
    let ctx = context(None, &jar, Category::Movies, toast);
    let body = templates::auth_page(&ctx, return_to, "");
    (jar, Html(body)).into_response()
}

#[derive(Clone, Copy)]
enum AuthAction {
    SignIn,
    SignUp,
}

async fn authenticate(state: &AppState, jar: CookieJar, creds: Credentials, action: AuthAction) -> Response {
    let return_to = auth::safe_return_to(&creds.return_to).to_string();
    let failed = |jar: &CookieJar, title: &str, message: String| {
        let ctx = context(None, jar, Category::Movies, Some(Toast::error(title, message)));
        unprocessable(templates::auth_page(&ctx, &return_to, &creds.email))
    };

    if let Err(message) = auth::validate_credentials(&creds.email, &creds.password) {
        return failed(&jar, "Check your details", message.to_string());
    }

    let email = creds.email.trim();
    let result = match action {
        AuthAction::SignIn => state.backend.sign_in(email, &creds.password).await,
        AuthAction::SignUp => state.backend.sign_up(email, &creds.password).await,
    };

    match result {
        Ok(session) => {
            info!(user_id = %session.user_id, "signed in");
            let jar = auth::store_session(jar, &session, state.config.cookie_secure);
            let toast = match action {
                AuthAction::SignIn => Toast::info("Welcome back", session.email.clone()),
                AuthAction::SignUp => Toast::info("Account created", format!("Signed in as {}", session.email)),
            };
            (with_flash(jar, toast), Redirect::to(&return_to)).into_response()
        },
        Err(err) => {
            warn!(error = %err, "authentication failed");
            let title = match action {
                AuthAction::SignIn => "Sign in failed",
                AuthAction::SignUp => "Sign up failed",
            };
            failed(&jar, title, err.to_string())
        },
    }
}

pub async fn sign_in(State(state): State<Arc<AppState>>, jar: CookieJar, Form(creds): Form<Credentials>) -> Response {
    authenticate(&state, jar, creds, AuthAction::SignIn).await
}

pub async fn sign_up(State(state): State<Arc<AppState>>, jar: CookieJar, Form(creds): Form<Credentials>) -> Response {
    authenticate(&state, jar, creds, AuthAction::SignUp).await
}

pub async fn sign_out(jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = with_flash(auth::clear_session(jar), Toast::info("Signed out", ""));
    (jar, Redirect::to("/"))
}

pub async fn start_booking(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(movie_id): Path<String>,
) -> AppResult<Response> {
    let movie = state.backend.get_movie(&movie_id).await?;
    if !catalog::is_now_showing(&movie) {
        let jar = with_flash(jar, Toast::error("Not bookable yet", format!("{} is coming soon.", movie.title)));
        return Ok((jar, Redirect::to("/")).into_response());
    }

    let draft_id = state.cache.create_draft(&BookingDraft::new(movie.id.as_str())).await?;
    debug!(draft_id = %draft_id, movie_id = %movie.id, "booking started");
    Ok(Redirect::to(&format!("/book/{draft_id}")).into_response())
}

fn draft_expired(jar: CookieJar) -> Response {
    let jar = with_flash(jar, Toast::error("Booking expired", "Please start your booking again."));
    (jar, Redirect::to("/")).into_response()
}

async fn render_booking(
    state: &AppState,
    ctx: &PageContext<'_>,
    draft_id: &str,
    draft: &BookingDraft,
) -> AppResult<String> {
    let movie = state.backend.get_movie(&draft.movie_id).await?;
    let theaters = if draft.step == BookingStep::Theater {
        let showtimes = state.backend.showtimes_for_movie(&movie.id, state.config.today()).await?;
        catalog::group_by_theater(showtimes, ctx.location)
    } else {
        Vec::new()
    };
    let view = BookingView { draft_id, movie: &movie, draft, theaters: &theaters };
    Ok(templates::booking_page(ctx, &view))
}

pub async fn booking(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(draft_id): Path<String>,
) -> AppResult<Response> {
    let Some(draft) = state.cache.get_draft(&draft_id).await? else {
        return Ok(draft_expired(jar));
    };
    let (jar, toast) = take_flash(jar);
    let ctx = context(user.as_ref(), &jar, Category::Movies, toast);
    let body = render_booking(&state, &ctx, &draft_id, &draft).await?;
    Ok((jar, Html(body)).into_response())
}

/// Saves the draft and redirects back to it, or re-renders the step with the error as a toast.
async fn finish_step(
    state: &AppState,
    user: Option<&AuthSession>,
    jar: CookieJar,
    draft_id: &str,
    draft: BookingDraft,
    outcome: Result<(), BookingError>,
) -> AppResult<Response> {
    match outcome {
        Ok(()) => {
            state.cache.save_draft(draft_id, &draft).await?;
            debug!(draft_id, step = %draft.step, "booking step saved");
            Ok(Redirect::to(&format!("/book/{draft_id}")).into_response())
        },
        Err(err) => {
            debug!(draft_id, error = %err, "booking step rejected");
            let ctx = context(user, &jar, Category::Movies, Some(Toast::error("Can't do that", err.to_string())));
            Ok(unprocessable(render_booking(state, &ctx, draft_id, &draft).await?))
        },
    }
}

#[derive(Debug, Deserialize)]
pub struct ShowtimeForm {
    showtime_id: String,
}

pub async fn choose_showtime(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(draft_id): Path<String>,
    Form(form): Form<ShowtimeForm>,
) -> AppResult<Response> {
    let Some(mut draft) = state.cache.get_draft(&draft_id).await? else {
        return Ok(draft_expired(jar));
    };
    let showtimes = state.backend.showtimes_for_movie(&draft.movie_id, state.config.today()).await?;
    let outcome = match showtimes.iter().find(|s| s.id == form.showtime_id) {
        Some(showtime) => draft.select_showtime(showtime),
        None => Err(BookingError::ForeignShowtime),
    };
    finish_step(&state, user.as_ref(), jar, &draft_id, draft, outcome).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TicketsForm {
    count: String,
}

pub async fn choose_tickets(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(draft_id): Path<String>,
    Form(form): Form<TicketsForm>,
) -> AppResult<Response> {
    let Some(mut draft) = state.cache.get_draft(&draft_id).await? else {
        return Ok(draft_expired(jar));
    };
    let outcome = match form.count.trim().parse::<u8>() {
        Ok(count) => draft.set_ticket_count(count),
        Err(_) => Err(BookingError::InvalidTicketCount(0)),
    };
    finish_step(&state, user.as_ref(), jar, &draft_id, draft, outcome).await
}

#[derive(Debug, Deserialize)]
pub struct SeatForm {
    seat: String,
}

pub async fn toggle_seat(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(draft_id): Path<String>,
    Form(form): Form<SeatForm>,
) -> AppResult<Response> {
    let Some(mut draft) = state.cache.get_draft(&draft_id).await? else {
        return Ok(draft_expired(jar));
    };
    let outcome = draft.toggle_seat(&form.seat);
    finish_step(&state, user.as_ref(), jar, &draft_id, draft, outcome).await
}

fn sign_in_first(jar: CookieJar, draft_id: &str) -> Response {
    let jar = with_flash(jar, Toast::error("Sign in required", "Please sign in to book tickets."));
    let return_to = format!("/book/{draft_id}");
    (jar, Redirect::to(&format!("/auth?return_to={}", urlencoding::encode(&return_to)))).into_response()
}

pub async fn proceed(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(draft_id): Path<String>,
) -> AppResult<Response> {
    let Some(mut draft) = state.cache.get_draft(&draft_id).await? else {
        return Ok(draft_expired(jar));
    };
    match draft.proceed_to_payment(user.is_some()) {
        Err(BookingError::NotSignedIn) => Ok(sign_in_first(jar, &draft_id)),
        outcome => finish_step(&state, user.as_ref(), jar, &draft_id, draft, outcome).await,
    }
}

pub async fn back(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(draft_id): Path<String>,
) -> AppResult<Response> {
    let Some(mut draft) = state.cache.get_draft(&draft_id).await? else {
        return Ok(draft_expired(jar));
    };
    draft.back();
    state.cache.save_draft(&draft_id, &draft).await?;
    Ok(Redirect::to(&format!("/book/{draft_id}")).into_response())
}

/// Re-renders the payment step with a destructive toast.
async fn payment_rejected(
    state: &AppState,
    session: &AuthSession,
    jar: &CookieJar,
    draft_id: &str,
    draft: &BookingDraft,
    toast: Toast,
) -> AppResult<Response> {
    let ctx = context(Some(session), jar, Category::Movies, Some(toast));
    Ok(unprocessable(render_booking(state, &ctx, draft_id, draft).await?))
}

pub async fn pay(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(draft_id): Path<String>,
    Form(form): Form<PaymentForm>,
) -> AppResult<Response> {
    let Some(mut draft) = state.cache.get_draft(&draft_id).await? else {
        return Ok(draft_expired(jar));
    };
    let Some(session) = user else {
        return Ok(sign_in_first(jar, &draft_id));
    };
    if draft.step != BookingStep::Payment {
        let err = BookingError::WrongStep { action: "confirm payment", step: draft.step };
        return finish_step(&state, Some(&session), jar, &draft_id, draft, Err(err)).await;
    }

    let details = match form.validate(state.config.today()) {
        Ok(details) => details,
        Err(err) => {
            let toast = Toast::error("Invalid payment details", err.to_string());
            return payment_rejected(&state, &session, &jar, &draft_id, &draft, toast).await;
        },
    };

    if !state.cache.claim_payment(&draft_id).await? {
        debug!(draft_id, "payment already in progress");
        let jar = with_flash(jar, Toast::info("Payment in progress", "This booking is already being paid for."));
        return Ok((jar, Redirect::to(&format!("/book/{draft_id}"))).into_response());
    }

    let delay = state.config.payment_delay_ms;
    let booking = match checkout::checkout(&state.backend, &session, &draft, delay, &state.config.theater_tz).await {
        Ok(booking) => booking,
        Err(err) => {
            // releases the claim; the draft is still at the payment step
            state.cache.save_draft(&draft_id, &draft).await?;
            let toast = Toast::error("Payment failed", err.to_string());
            return payment_rejected(&state, &session, &jar, &draft_id, &draft, toast).await;
        },
    };

    draft.complete(Confirmation { booking_id: booking.id.clone(), payment_label: details.label() })?;
    state.cache.save_draft(&draft_id, &draft).await?;

    let toast = Toast::info("Booking confirmed", format!("A confirmation email has been sent to {}", session.email));
    Ok((with_flash(jar, toast), Redirect::to(&format!("/book/{draft_id}"))).into_response())
}

pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, Html<String>)> {
    let bookings = state.backend.list_bookings(&session).await?;
    let titles: Vec<(String, String)> = catalog::load_movies(&state.cache, &state.backend, Category::Movies)
        .await?
        .into_iter()
        .map(|m| (m.id, m.title))
        .collect();

    let (jar, toast) = take_flash(jar);
    let ctx = context(Some(&session), &jar, Category::Movies, toast);
    let body = templates::bookings_page(&ctx, &bookings, &titles, &state.config.theater_tz);
    Ok((jar, Html(body)))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    jar: CookieJar,
    Path(booking_id): Path<String>,
) -> (CookieJar, Redirect) {
    let toast = match state.backend.update_payment_status(&session, &booking_id, PaymentStatus::Cancelled).await {
        Ok(()) => {
            info!(booking_id = %booking_id, "booking cancelled");
            Toast::info("Booking cancelled", "")
        },
        Err(err) => {
            warn!(booking_id = %booking_id, error = %err, "cancel failed");
            Toast::error("Could not cancel booking", err.to_string())
        },
    };
    (with_flash(jar, toast), Redirect::to("/bookings"))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use scraper::{Html as Doc, Selector};
    use tower::ServiceExt;

    use super::*;

    /// Drives the router like a browser: keeps cookies between requests.
    struct Browser {
        state: Arc<AppState>,
        cookies: Vec<(String, String)>,
    }

    struct Page {
        status: StatusCode,
        location: Option<String>,
        body: String,
    }

    impl Page {
        fn doc(&self) -> Doc {
            Doc::parse_document(&self.body)
        }

        fn count(&self, css: &str) -> usize {
            self.doc().select(&Selector::parse(css).unwrap()).count()
        }

        fn attrs(&self, css: &str, attr: &str) -> Vec<String> {
            self.doc()
                .select(&Selector::parse(css).unwrap())
                .filter_map(|e| e.value().attr(attr).map(str::to_string))
                .collect()
        }

        fn text(&self, css: &str) -> String {
            self.doc().select(&Selector::parse(css).unwrap()).flat_map(|e| e.text()).collect()
        }
    }

    impl Browser {
        async fn new() -> Self {
            Self::with_state(crate::test_state().await)
        }

        fn with_state(state: Arc<AppState>) -> Self {
            Self { state, cookies: Vec::new() }
        }

        fn build(&self, method: &str, uri: &str, form: Option<&str>) -> Request<Body> {
            let mut req = Request::builder().method(method).uri(uri);
            if !self.cookies.is_empty() {
                let header = self.cookies.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("; ");
                req = req.header(header::COOKIE, header);
            }
            let body = match form {
                Some(form) => {
                    req = req.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                    Body::from(form.to_string())
                },
                None => Body::empty(),
            };
            req.body(body).unwrap()
        }

        async fn request(&mut self, method: &str, uri: &str, form: Option<&str>) -> Page {
            let req = self.build(method, uri, form);
            let resp = router(self.state.clone()).oneshot(req).await.unwrap();
            self.read(resp).await
        }

        async fn read(&mut self, resp: Response) -> Page {
            for value in resp.headers().get_all(header::SET_COOKIE) {
                let cookie = Cookie::parse(value.to_str().unwrap().to_string()).unwrap();
                self.cookies.retain(|(k, _)| k != cookie.name());
                let removed = cookie.value().is_empty() || cookie.max_age() == Some(time::Duration::ZERO);
                if !removed {
                    self.cookies.push((cookie.name().to_string(), cookie.value().to_string()));
                }
            }

            let status = resp.status();
            let location = resp.headers().get(header::LOCATION).map(|v| v.to_str().unwrap().to_string());
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            Page { status, location, body: String::from_utf8(bytes.to_vec()).unwrap() }
        }

        async fn get(&mut self, uri: &str) -> Page {
            self.request("GET", uri, None).await
        }

        async fn post(&mut self, uri: &str, form: &str) -> Page {
            self.request("POST", uri, Some(form)).await
        }
    }

    const CARD: &str = "method=card&card_number=4111+1111+1111+1111&card_expiry=12%2F99&card_cvv=123&card_name=Asha+Rao";

    fn enc(s: &str) -> String {
        urlencoding::encode(s).into_owned()
    }

    /// Signs in and walks a two-seat Dune booking in Pune up to the payment step.
    async fn reach_payment(browser: &mut Browser) -> String {
        browser.post("/location", "city=Pune").await;
        let draft_url = browser.post("/movies/movie-1/book", "").await.location.unwrap();

        let page = browser.get(&draft_url).await;
        let showtime = page.attrs("input[name=showtime_id]", "value")[0].clone();
        browser.post(&format!("{draft_url}/showtime"), &format!("showtime_id={}", enc(&showtime))).await;
        browser.post(&format!("{draft_url}/tickets"), "count=2").await;

        let page = browser.get(&draft_url).await;
        for seat in &page.attrs("button.seat[data-state=available]", "value")[..2] {
            browser.post(&format!("{draft_url}/seats"), &format!("seat={seat}")).await;
        }
        browser.post("/auth/sign-in", "email=asha%40example.com&password=secret1").await;
        browser.post(&format!("{draft_url}/proceed"), "").await;
        assert_eq!(browser.get(&draft_url).await.attrs("#step", "data-step"), ["payment"]);
        draft_url
    }

    async fn booking_statuses(browser: &mut Browser) -> Vec<String> {
        let mut statuses = browser.get("/bookings").await.attrs("li.booking", "data-status");
        statuses.sort();
        statuses
    }

    #[tokio::test]
    async fn health_check() {
        let mut browser = Browser::new().await;
        let page = browser.get("/health").await;
        assert_eq!(page.status, StatusCode::OK);
        assert_eq!(page.body, "ok");
    }

    #[tokio::test]
    async fn first_visit_asks_for_location_then_remembers_it() {
        let mut browser = Browser::new().await;
        let home = browser.get("/").await;
        assert_eq!(home.status, StatusCode::OK);
        assert_eq!(home.count("#location-picker"), 1);

        let resp = browser.post("/location", "city=pune").await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER);
        assert_eq!(resp.location.as_deref(), Some("/"));

        let home = browser.get("/").await;
        assert_eq!(home.count("#location-picker"), 0);
        assert!(home.text("#location").contains("Pune"));
        assert!(home.text("#toast").contains("Showing theaters in Pune"));

        // flash is shown once
        assert_eq!(browser.get("/").await.count("#toast"), 0);
    }

    #[tokio::test]
    async fn unknown_city_is_rejected() {
        let mut browser = Browser::new().await;
        let page = browser.post("/location", "city=Atlantis").await;
        assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(page.attrs("#toast", "data-variant"), ["destructive"]);
        assert!(browser.cookies.iter().all(|(k, _)| k != location::LOCATION_COOKIE));
    }

    #[tokio::test]
    async fn movies_page_filters_by_category_and_genre() {
        let mut browser = Browser::new().await;
        let all = browser.get("/movies?section=all").await;
        assert_eq!(all.count(".movie-card"), 14);

        let comedy = browser.get("/movies?section=all&genre=Comedy").await;
        assert_eq!(comedy.count(".movie-card"), 3);

        let events = browser.get("/movies?category=events&section=now-showing").await;
        assert_eq!(events.attrs(".movie-card", "data-movie-id"), ["movie-13"]);
    }

    #[tokio::test]
    async fn search_finds_by_title_and_ignores_blank_queries() {
        let mut browser = Browser::new().await;
        let page = browser.get("/search?q=batman").await;
        assert!(page.text("#search-results").contains("The Batman"));

        let page = browser.get("/search?q=%20%20").await;
        assert_eq!(page.count("#search-results"), 0);
    }

    #[tokio::test]
    async fn upcoming_movies_cannot_be_booked() {
        let mut browser = Browser::new().await;
        let resp = browser.post("/movies/movie-8/book", "").await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER);
        assert_eq!(resp.location.as_deref(), Some("/"));
        assert!(browser.get("/").await.text("#toast").contains("coming soon"));
    }

    #[tokio::test]
    async fn unknown_draft_redirects_home() {
        let mut browser = Browser::new().await;
        let resp = browser.get("/book/not-a-draft").await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER);
        assert!(browser.get("/").await.text("#toast").contains("Booking expired"));
    }

    #[tokio::test]
    async fn bookings_require_sign_in() {
        let mut browser = Browser::new().await;
        let resp = browser.get("/bookings").await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER);
        assert_eq!(resp.location.as_deref(), Some("/auth?return_to=%2Fbookings"));
    }

    #[tokio::test]
    async fn short_password_is_rejected_before_calling_backend() {
        let mut browser = Browser::new().await;
        let page = browser.post("/auth/sign-in", "email=asha%40example.com&password=123").await;
        assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(page.text("#toast").contains("at least 6"));
        assert!(browser.cookies.iter().all(|(k, _)| !k.starts_with("sb_")));
    }

    #[tokio::test]
    async fn change_stream_is_server_sent_events() {
        let state = crate::test_state().await;
        let req = Request::builder().uri("/events/movies").body(Body::empty()).unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");
    }

    #[tokio::test]
    async fn full_booking_flow_creates_a_paid_booking() {
        let mut browser = Browser::new().await;
        browser.post("/location", "city=Pune").await;

        let resp = browser.post("/movies/movie-1/book", "").await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER);
        let draft_url = resp.location.unwrap();
        assert!(draft_url.starts_with("/book/"));

        // theater step: only theaters in the selected city
        let page = browser.get(&draft_url).await;
        assert_eq!(page.attrs("#step", "data-step"), ["theater"]);
        assert_eq!(page.count(".theater"), 2);
        assert!(page.text(".theater").contains("Pune"));
        let showtime = page.attrs("input[name=showtime_id]", "value")[0].clone();

        let resp = browser.post(&format!("{draft_url}/showtime"), &format!("showtime_id={}", enc(&showtime))).await;
        assert_eq!(resp.location.as_deref(), Some(draft_url.as_str()));

        // out-of-order action is rejected
        let page = browser.post(&format!("{draft_url}/seats"), "seat=A1").await;
        assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);

        browser.post(&format!("{draft_url}/tickets"), "count=2").await;
        let page = browser.get(&draft_url).await;
        assert_eq!(page.attrs("#step", "data-step"), ["seats"]);
        assert_eq!(page.attrs("button#proceed", "disabled").len(), 1);

        let free = page.attrs("button.seat[data-state=available]", "value");
        let booked = page.attrs("button.seat[data-state=booked]", "value");
        assert!(!booked.is_empty());
        let page = browser.post(&format!("{draft_url}/seats"), &format!("seat={}", booked[0])).await;
        assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);

        for seat in &free[..2] {
            browser.post(&format!("{draft_url}/seats"), &format!("seat={seat}")).await;
        }
        let page = browser.get(&draft_url).await;
        assert_eq!(page.attrs("button#proceed", "disabled").len(), 0);

        // signing in is required before payment
        let resp = browser.post(&format!("{draft_url}/proceed"), "").await;
        let auth_url = resp.location.unwrap();
        assert!(auth_url.starts_with("/auth?return_to="));

        let creds = format!("email=asha%40example.com&password=secret1&return_to={}", enc(&draft_url));
        let resp = browser.post("/auth/sign-in", &creds).await;
        assert_eq!(resp.location.as_deref(), Some(draft_url.as_str()));

        browser.post(&format!("{draft_url}/proceed"), "").await;
        let page = browser.get(&draft_url).await;
        assert_eq!(page.attrs("#step", "data-step"), ["payment"]);

        let bad_card = "method=card&card_number=1234&card_expiry=12%2F99&card_cvv=123&card_name=Asha";
        let page = browser.post(&format!("{draft_url}/pay"), bad_card).await;
        assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(page.text("#toast").contains("16 digits"));

        let card = "method=card&card_number=4111+1111+1111+1111&card_expiry=12%2F99&card_cvv=123&card_name=Asha+Rao";
        let resp = browser.post(&format!("{draft_url}/pay"), card).await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER);

        let page = browser.get(&draft_url).await;
        assert_eq!(page.attrs("#step", "data-step"), ["success"]);
        assert!(page.text("#confirmation").contains("Card •••• 1111"));
        assert!(page.text("#toast").contains("confirmation email"));
        let booking_id = page.text("#booking-id");

        let page = browser.get("/bookings").await;
        assert_eq!(page.attrs("li.booking", "data-status"), ["paid"]);
        assert!(page.text("li.booking").contains("Dune: Part Two"));

        let resp = browser.post(&format!("/bookings/{booking_id}/cancel"), "").await;
        assert_eq!(resp.location.as_deref(), Some("/bookings"));
        let page = browser.get("/bookings").await;
        assert_eq!(page.attrs("li.booking", "data-status"), ["cancelled"]);
        assert!(page.text("#toast").contains("Booking cancelled"));
    }

    #[tokio::test]
    async fn double_submitted_payment_books_once() {
        let mut config = crate::config::Config::for_tests();
        config.payment_delay_ms = 100;
        let mut browser = Browser::with_state(crate::test_state_with(config).await);
        let draft_url = reach_payment(&mut browser).await;

        let pay = format!("{draft_url}/pay");
        let first = router(browser.state.clone()).oneshot(browser.build("POST", &pay, Some(CARD)));
        let second = router(browser.state.clone()).oneshot(browser.build("POST", &pay, Some(CARD)));
        let (first, second) = tokio::join!(first, second);
        assert_eq!(first.unwrap().status(), StatusCode::SEE_OTHER);
        assert_eq!(second.unwrap().status(), StatusCode::SEE_OTHER);

        assert_eq!(booking_statuses(&mut browser).await, ["paid"]);
        assert_eq!(browser.get(&draft_url).await.attrs("#step", "data-step"), ["success"]);
    }

    #[tokio::test]
    async fn failed_payment_confirmation_keeps_booking_pending() {
        let mut browser = Browser::new().await;
        let draft_url = reach_payment(&mut browser).await;
        let state = browser.state.clone();
        let mock = state.backend.mock().unwrap();

        mock.fail_payment_updates(true);
        let page = browser.post(&format!("{draft_url}/pay"), CARD).await;
        assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(page.attrs("#toast", "data-variant"), ["destructive"]);
        assert!(page.text("#toast").contains("Payment failed"));
        assert_eq!(page.attrs("#step", "data-step"), ["payment"]);
        assert_eq!(booking_statuses(&mut browser).await, ["pending"]);

        // a retry books again; the first row is left pending
        mock.fail_payment_updates(false);
        let resp = browser.post(&format!("{draft_url}/pay"), CARD).await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER);
        assert_eq!(browser.get(&draft_url).await.attrs("#step", "data-step"), ["success"]);
        assert_eq!(booking_statuses(&mut browser).await, ["paid", "pending"]);
    }

    #[tokio::test]
    async fn bad_ticket_counts_are_shown_as_a_toast() {
        let mut browser = Browser::new().await;
        let draft_url = browser.post("/movies/movie-1/book", "").await.location.unwrap();
        let page = browser.get(&draft_url).await;
        let showtime = page.attrs("input[name=showtime_id]", "value")[0].clone();
        browser.post(&format!("{draft_url}/showtime"), &format!("showtime_id={}", enc(&showtime))).await;

        for form in ["count=300", "count=x", "count=0", ""] {
            let page = browser.post(&format!("{draft_url}/tickets"), form).await;
            assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY, "{form}");
            assert!(page.text("#toast").contains("between 1 and 10"), "{form}");
            assert_eq!(page.attrs("#step", "data-step"), ["tickets"]);
        }
    }

    #[tokio::test]
    async fn anonymous_cancel_returns_home_after_sign_in() {
        let mut browser = Browser::new().await;
        let resp = browser.post("/bookings/b-1/cancel", "").await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER);
        assert_eq!(resp.location.as_deref(), Some("/auth?return_to=%2F"));
    }

    #[tokio::test]
    async fn showtime_and_booking_streams() {
        let mut browser = Browser::new().await;
        assert_eq!(browser.get("/events/bookings").await.status, StatusCode::UNAUTHORIZED);

        browser.post("/auth/sign-in", "email=asha%40example.com&password=secret1").await;
        for uri in ["/events/bookings", "/events/showtimes/movie-1"] {
            let resp = router(browser.state.clone()).oneshot(browser.build("GET", uri, None)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream", "{uri}");
        }

        let page = browser.get("/bookings").await;
        assert_eq!(page.attrs("script[data-live]", "data-live"), ["/events/bookings"]);
    }
}
