use jiff::{
    Timestamp,
    civil::{Date, Time},
    tz::TimeZone,
};
use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::{
    booking::{BookingDraft, BookingStep, MAX_TICKETS, SEAT_ROWS, SEATS_PER_ROW, SeatId, SeatState},
    catalog::{self, Category, Section},
    location::{AVAILABLE_LOCATIONS, POPULAR_LOCATIONS},
    models::{AuthSession, Booking, Movie, PaymentStatus, TheaterWithShowtimes, Toast, ToastVariant},
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

const LIVE_RELOAD: &str = r#"
const events = new EventSource(document.currentScript.dataset.live);
['movie', 'showtime', 'booking'].forEach((name) => {
  events.addEventListener(name, () => window.location.reload());
});
"#;

const PAYMENT_TABS: &str = r#"
document.querySelectorAll('input[name=method]').forEach((radio) => {
  radio.addEventListener('change', () => {
    document.getElementById('card-fields').hidden = radio.value !== 'card';
    document.getElementById('upi-fields').hidden = radio.value !== 'upi';
  });
});
document.getElementById('payment-form').addEventListener('submit', () => {
  const pay = document.getElementById('pay');
  pay.disabled = true;
  pay.textContent = 'Processing...';
});
"#;

const MOVIE_EVENTS: &str = "/events/movies";

/// Everything the shared header and toast area need.
pub struct PageContext<'a> {
    pub user: Option<&'a AuthSession>,
    pub location: Option<&'static str>,
    pub category: Category,
    pub toast: Option<Toast>,
}

pub struct BookingView<'a> {
    pub draft_id: &'a str,
    pub movie: &'a Movie,
    pub draft: &'a BookingDraft,
    pub theaters: &'a [TheaterWithShowtimes],
}

pub fn home_page(ctx: &PageContext, movies: &[Movie], show_location_picker: bool) -> String {
    let now_showing = catalog::now_showing(movies);
    let upcoming = catalog::upcoming(movies);
    let recommended = catalog::recommended(movies);

    page(
        "CineBook",
        ctx,
        Some(MOVIE_EVENTS),
        html! {
            @if show_location_picker {
                (location_prompt())
            }
            @if let Some(movie) = catalog::featured(movies) {
                (hero(movie))
            }
            div class="max-w-7xl mx-auto px-6 py-10 space-y-12" {
                (movie_row(ctx, Section::NowShowing, &now_showing))
                (movie_row(ctx, Section::Upcoming, &upcoming))
                (movie_row(ctx, Section::Recommended, &recommended))
            }
        },
    )
}

pub fn movies_page(
    ctx: &PageContext,
    section: Section,
    movies: &[Movie],
    genres: &[String],
    genre: Option<&str>,
) -> String {
    let title = catalog::section_title(ctx.category, section, ctx.location);
    let base = format!("/movies?category={}&section={}", ctx.category.name(), section.slug());

    page(
        &title,
        ctx,
        Some(MOVIE_EVENTS),
        html! {
            div class="max-w-7xl mx-auto px-6 py-10" {
                div class="flex items-baseline justify-between gap-4" {
                    h1 class="text-3xl font-bold text-gray-900" { (title) }
                    p class="text-sm text-gray-500" { (movies.len()) " titles" }
                }

                div class="mt-6 flex flex-wrap gap-2" {
                    a class=(chip_class(genre.is_none())) href=(base) { "All genres" }
                    @for g in genres {
                        a class=(chip_class(genre == Some(g.as_str())))
                            href=(format!("{}&genre={}", base, urlencoding::encode(g))) { (g) }
                    }
                }

                @if movies.is_empty() {
                    p class="mt-10 text-gray-600" { "Nothing to show here yet." }
                } @else {
                    div class="mt-8 grid grid-cols-2 gap-6 md:grid-cols-4 lg:grid-cols-5" {
                        @for movie in movies {
                            (movie_card(movie))
                        }
                    }
                }
            }
        },
    )
}

pub fn search_page(ctx: &PageContext, query: &str, results: &[Movie]) -> String {
    page(
        "Search",
        ctx,
        None,
        html! {
            div class="max-w-5xl mx-auto px-6 py-10" {
                h1 class="text-2xl font-bold text-gray-900" { "Search" }
                @if query.trim().is_empty() {
                    p class="mt-4 text-gray-600" { "Type a movie, event or play to search." }
                } @else if results.is_empty() {
                    p class="mt-4 text-gray-600" { "No results for \"" (query.trim()) "\"." }
                } @else {
                    p class="mt-2 text-sm text-gray-500" { (results.len()) " results for \"" (query.trim()) "\"" }
                    ul id="search-results" class="mt-6 divide-y divide-gray-200 bg-white shadow rounded-lg" {
                        @for movie in results {
                            li class="flex items-center gap-4 p-4" {
                                (poster(movie, "h-20 w-14"))
                                div class="flex-1" {
                                    p class="font-semibold text-gray-900" { (movie.title) }
                                    p class="text-sm text-gray-500" { (movie.genre_list().join(", ")) }
                                }
                                (book_button(movie))
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn location_page(ctx: &PageContext, query: &str, matches: &[&'static str]) -> String {
    page(
        "Choose your city",
        ctx,
        None,
        html! {
            div class="max-w-3xl mx-auto px-6 py-10" {
                h1 class="text-2xl font-bold text-gray-900" { "Choose your city" }
                form class="mt-6" method="get" action="/location" {
                    input class="w-full rounded-md border border-gray-300 px-3 py-2" type="search" name="q"
                        value=(query) placeholder="Search for your city" autofocus;
                }

                @if query.trim().is_empty() {
                    h2 class="mt-8 text-sm font-semibold uppercase tracking-wide text-gray-500" { "Popular cities" }
                    (city_buttons(&POPULAR_LOCATIONS, ctx.location))
                    h2 class="mt-8 text-sm font-semibold uppercase tracking-wide text-gray-500" { "All cities" }
                    (city_buttons(&AVAILABLE_LOCATIONS, ctx.location))
                } @else if matches.is_empty() {
                    p class="mt-8 text-gray-600" { "We are not in \"" (query.trim()) "\" yet." }
                } @else {
                    (city_buttons(matches, ctx.location))
                }
            }
        },
    )
}

pub fn auth_page(ctx: &PageContext, return_to: &str, email: &str) -> String {
    let form = |action: &str, label: &str, autocomplete: &str| {
        html! {
            form class="space-y-4" method="post" action=(action) {
                input type="hidden" name="return_to" value=(return_to);
                div {
                    label class="block text-sm font-medium text-gray-700" { "Email" }
                    input class="mt-1 w-full rounded-md border border-gray-300 px-3 py-2" type="email" name="email"
                        value=(email) required;
                }
                div {
                    label class="block text-sm font-medium text-gray-700" { "Password" }
                    input class="mt-1 w-full rounded-md border border-gray-300 px-3 py-2" type="password" name="password"
                        minlength="6" autocomplete=(autocomplete) required;
                }
                button class="w-full rounded-md bg-rose-600 px-4 py-2 font-semibold text-white hover:bg-rose-700" type="submit" { (label) }
            }
        }
    };

    page(
        "Sign in",
        ctx,
        None,
        html! {
            div class="max-w-4xl mx-auto px-6 py-12 grid gap-8 md:grid-cols-2" {
                div id="sign-in" class="bg-white shadow rounded-lg p-8" {
                    h1 class="text-2xl font-bold text-gray-900" { "Sign in" }
                    div class="mt-6" { (form("/auth/sign-in", "Sign in", "current-password")) }
                }
                div id="sign-up" class="bg-white shadow rounded-lg p-8" {
                    h2 class="text-2xl font-bold text-gray-900" { "Create an account" }
                    div class="mt-6" { (form("/auth/sign-up", "Sign up", "new-password")) }
                }
            }
        },
    )
}

pub fn booking_page(ctx: &PageContext, view: &BookingView) -> String {
    let draft = view.draft;
    let body = match draft.step {
        BookingStep::Theater => theater_step(view),
        BookingStep::Tickets => tickets_step(view),
        BookingStep::Seats => seats_step(view),
        BookingStep::Payment => payment_step(view),
        BookingStep::Success => success_step(view),
    };
    let live = (draft.step == BookingStep::Theater)
        .then(|| format!("/events/showtimes/{}", urlencoding::encode(&view.movie.id)));

    page(
        &format!("Book {}", view.movie.title),
        ctx,
        live.as_deref(),
        html! {
            div class="max-w-4xl mx-auto px-6 py-10" {
                div class="flex items-center gap-4" {
                    (poster(view.movie, "h-24 w-16"))
                    div {
                        h1 class="text-2xl font-bold text-gray-900" { (view.movie.title) }
                        @if let Some(show) = &draft.show {
                            p class="mt-1 text-sm text-gray-600" {
                                (show.theater_name) " · " (format_show_date(show.show_date)) " · " (format_show_time(show.show_time))
                            }
                        }
                    }
                }
                (step_indicator(draft.step))
                div id="step" data-step=(draft.step.as_str()) class="mt-6 bg-white shadow rounded-lg p-6" {
                    (body)
                }
            }
        },
    )
}

pub fn bookings_page(
    ctx: &PageContext,
    bookings: &[Booking],
    titles: &[(String, String)],
    tz: &TimeZone,
) -> String {
    let title_of = |movie_id: &str| {
        titles.iter().find(|(id, _)| id == movie_id).map(|(_, t)| t.as_str()).unwrap_or(movie_id).to_string()
    };

    page(
        "My bookings",
        ctx,
        Some("/events/bookings"),
        html! {
            div class="max-w-4xl mx-auto px-6 py-10" {
                h1 class="text-2xl font-bold text-gray-900" { "My bookings" }
                @if bookings.is_empty() {
                    div class="mt-8 bg-white shadow rounded-lg p-8" {
                        p class="text-gray-600" { "You have no bookings yet." }
                        a class="mt-4 inline-block text-rose-600 hover:text-rose-800" href="/" { "Browse movies" }
                    }
                } @else {
                    ul class="mt-8 space-y-4" {
                        @for booking in bookings {
                            li class="booking bg-white shadow rounded-lg p-6" data-status=(status_slug(booking.payment_status)) {
                                div class="flex items-start justify-between gap-4" {
                                    div {
                                        p class="text-lg font-semibold text-gray-900" { (title_of(&booking.movie_id)) }
                                        p class="mt-1 text-sm text-gray-600" { (format_timestamp(booking.show_time, tz)) }
                                        p class="mt-1 text-sm text-gray-600" { "Seats: " (booking.seats.join(", ")) }
                                        p class="mt-1 text-sm text-gray-600" { "Total: " (format_price(booking.total_price)) }
                                    }
                                    div class="text-right" {
                                        span class=(status_class(booking.payment_status)) { (booking.payment_status.label()) }
                                        @if booking.payment_status != PaymentStatus::Cancelled {
                                            form class="mt-3" method="post" action=(format!("/bookings/{}/cancel", booking.id)) {
                                                button class="text-sm text-gray-500 hover:text-rose-700" type="submit" { "Cancel booking" }
                                            }
                                        }
                                    }
                                }
                                p class="mt-3 text-xs text-gray-400" { "Booked " (format_timestamp(booking.booking_date, tz)) }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn error_page(message: String) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Something went wrong" }
                script src=(TAILWIND_CDN) {}
            }
            body class="min-h-screen bg-gray-50 flex items-center justify-center" {
                div class="max-w-xl w-full px-6" {
                    div class="bg-white shadow rounded-lg p-8" {
                        h1 class="text-2xl font-bold text-gray-900" { "Something went wrong" }
                        p class="mt-4 text-gray-700" { (message) }
                        a class="mt-6 inline-block text-rose-600 hover:text-rose-800" href="/" { "Back to movies" }
                    }
                }
            }
        }
    }
    .into_string()
}

pub fn format_show_time(t: Time) -> String {
    let hour = t.hour();
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", hour12, t.minute(), suffix)
}

pub fn format_show_date(d: Date) -> String {
    d.strftime("%a, %d %b").to_string()
}

pub fn format_price(amount: f64) -> String {
    if amount.fract() == 0.0 { format!("₹{amount:.0}") } else { format!("₹{amount:.2}") }
}

fn format_timestamp(ts: Timestamp, tz: &TimeZone) -> String {
    ts.to_zoned(tz.clone()).strftime("%a, %d %b %Y · %I:%M %p").to_string()
}

/// `live` is an event-stream URL; any event on it reloads the page.
fn page(title: &str, ctx: &PageContext, live: Option<&str>, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | CineBook" }
                script src=(TAILWIND_CDN) {}
            }
            body class="min-h-screen bg-gray-50" {
                (header(ctx))
                @if let Some(toast) = &ctx.toast {
                    (toast_markup(toast))
                }
                main { (body) }
                @if let Some(url) = live {
                    script data-live=(url) { (PreEscaped(LIVE_RELOAD)) }
                }
            }
        }
    }
    .into_string()
}

fn header(ctx: &PageContext) -> Markup {
    html! {
        header class="bg-gray-900 text-white" {
            div class="max-w-7xl mx-auto px-6 py-4 flex items-center gap-6" {
                a class="text-xl font-bold text-rose-500" href="/" { "CineBook" }
                form class="flex-1" method="get" action="/search" {
                    input class="w-full rounded-md bg-gray-800 px-3 py-2 text-sm text-white placeholder-gray-400"
                        type="search" name="q" placeholder="Search for movies, events, plays...";
                }
                a id="location" class="text-sm text-gray-300 hover:text-white" href="/location" {
                    "📍 " (ctx.location.unwrap_or("Select city"))
                }
                @match ctx.user {
                    Some(user) => {
                        a class="text-sm text-gray-300 hover:text-white" href="/bookings" { "My bookings" }
                        form method="post" action="/auth/sign-out" {
                            button id="user" class="text-sm text-gray-300 hover:text-white" type="submit" title="Sign out" {
                                (user.email) " · Sign out"
                            }
                        }
                    },
                    None => {
                        a id="sign-in-link" class="rounded-md bg-rose-600 px-3 py-1.5 text-sm font-semibold hover:bg-rose-700" href="/auth" { "Sign in" }
                    },
                }
            }
            nav class="bg-gray-800" {
                div class="max-w-7xl mx-auto px-6 flex gap-6 text-sm" {
                    @for category in Category::ALL {
                        a class=(if category == ctx.category { "py-2 text-white border-b-2 border-rose-500" } else { "py-2 text-gray-400 hover:text-white" })
                            href=(format!("/movies?category={}&section=all", category.name())) { (category.name()) }
                    }
                }
            }
        }
    }
}

fn toast_markup(toast: &Toast) -> Markup {
    let (class, variant) = match toast.variant {
        ToastVariant::Default => ("border-green-500 bg-white", "default"),
        ToastVariant::Destructive => ("border-red-500 bg-red-50", "destructive"),
    };
    html! {
        div id="toast" role="status" data-variant=(variant)
            class=(format!("fixed right-6 top-6 z-50 max-w-sm rounded-lg border-l-4 p-4 shadow-lg {class}")) {
            p class="font-semibold text-gray-900" { (toast.title) }
            @if !toast.description.is_empty() {
                p class="mt-1 text-sm text-gray-700" { (toast.description) }
            }
        }
    }
}

fn location_prompt() -> Markup {
    html! {
        div id="location-picker" class="bg-rose-50 border-b border-rose-200" {
            div class="max-w-7xl mx-auto px-6 py-6" {
                p class="font-semibold text-gray-900" { "Where are you watching?" }
                p class="text-sm text-gray-600" { "Pick your city to see theaters near you." }
                (city_buttons(&POPULAR_LOCATIONS, None))
                a class="mt-3 inline-block text-sm text-rose-600 hover:text-rose-800" href="/location" { "More cities" }
            }
        }
    }
}

fn city_buttons(cities: &[&'static str], current: Option<&str>) -> Markup {
    html! {
        div class="mt-3 flex flex-wrap gap-2" {
            @for city in cities {
                form method="post" action="/location" {
                    input type="hidden" name="city" value=(city);
                    button class=(chip_class(current == Some(*city))) type="submit" { (city) }
                }
            }
        }
    }
}

fn chip_class(active: bool) -> &'static str {
    if active {
        "rounded-full bg-rose-600 px-3 py-1 text-sm text-white"
    } else {
        "rounded-full border border-gray-300 bg-white px-3 py-1 text-sm text-gray-700 hover:border-rose-400"
    }
}

fn hero(movie: &Movie) -> Markup {
    html! {
        section id="featured" class="bg-gray-900 text-white" {
            div class="max-w-7xl mx-auto px-6 py-12 flex gap-8 items-center" {
                (poster(movie, "h-72 w-48 hidden md:block"))
                div {
                    p class="text-sm uppercase tracking-wide text-rose-400" { "Featured" }
                    h1 class="mt-2 text-4xl font-bold" { (movie.title) }
                    p class="mt-3 text-gray-300" {
                        "⭐ " (format!("{:.1}", movie.rating_value()))
                        @let duration = catalog::format_duration(movie.duration);
                        @if !duration.is_empty() { " · " (duration) }
                        " · " (movie.genre_list().join(", "))
                    }
                    @if let Some(description) = &movie.description {
                        p class="mt-4 max-w-2xl text-gray-300" { (description) }
                    }
                    div class="mt-6 flex gap-4" {
                        (book_button(movie))
                        @if let Some(trailer) = &movie.trailer_url {
                            a class="rounded-md border border-gray-500 px-4 py-2 text-sm hover:border-white" href=(trailer)
                                target="_blank" rel="noopener noreferrer" { "Watch trailer" }
                        }
                    }
                }
            }
        }
    }
}

fn movie_row(ctx: &PageContext, section: Section, movies: &[Movie]) -> Markup {
    let title = catalog::section_title(ctx.category, section, ctx.location);
    html! {
        section id=(section.slug()) {
            div class="flex items-baseline justify-between" {
                h2 class="text-2xl font-bold text-gray-900" { (title) }
                a class="text-sm text-rose-600 hover:text-rose-800"
                    href=(format!("/movies?category={}&section={}", ctx.category.name(), section.slug())) { "See all" }
            }
            @if movies.is_empty() {
                p class="mt-4 text-gray-500" { "Nothing here right now." }
            } @else {
                div class="mt-4 grid grid-cols-2 gap-6 md:grid-cols-4 lg:grid-cols-6" {
                    @for movie in movies.iter().take(6) {
                        (movie_card(movie))
                    }
                }
            }
        }
    }
}

fn movie_card(movie: &Movie) -> Markup {
    html! {
        article class="movie-card" data-movie-id=(movie.id) {
            (poster(movie, "aspect-[2/3] w-full"))
            h3 class="mt-2 font-semibold text-gray-900 leading-tight" { (movie.title) }
            p class="text-xs text-gray-500" { (movie.genre_list().join(" · ")) }
            @if catalog::is_now_showing(movie) {
                p class="mt-1 text-sm text-gray-700" {
                    "⭐ " (format!("{:.1}", movie.rating_value()))
                    @if let Some(votes) = movie.votes { span class="text-gray-400" { " (" (votes) " votes)" } }
                }
            }
            div class="mt-2" { (book_button(movie)) }
        }
    }
}

fn book_button(movie: &Movie) -> Markup {
    html! {
        @if catalog::is_now_showing(movie) {
            form method="post" action=(format!("/movies/{}/book", movie.id)) {
                button class="rounded-md bg-rose-600 px-4 py-2 text-sm font-semibold text-white hover:bg-rose-700" type="submit" { "Book tickets" }
            }
        } @else {
            span class="inline-block rounded-md bg-gray-200 px-3 py-1 text-xs font-medium text-gray-600" { "Coming soon" }
        }
    }
}

fn poster(movie: &Movie, size: &str) -> Markup {
    html! {
        @match &movie.poster_url {
            Some(url) => {
                img class=(format!("{size} rounded-md object-cover bg-gray-200")) src=(url) alt=(movie.title) loading="lazy";
            },
            None => {
                div class=(format!("{size} rounded-md bg-gray-300")) {}
            },
        }
    }
}

fn step_indicator(current: BookingStep) -> Markup {
    let steps = [BookingStep::Theater, BookingStep::Tickets, BookingStep::Seats, BookingStep::Payment];
    let index = |s: BookingStep| steps.iter().position(|x| *x == s).unwrap_or(steps.len());
    html! {
        ol class="mt-6 flex gap-4 text-sm" {
            @for step in steps {
                li class=(if index(step) <= index(current) { "font-semibold text-rose-600" } else { "text-gray-400" }) { (step.label()) }
            }
        }
    }
}

fn back_button(draft_id: &str) -> Markup {
    html! {
        form method="post" action=(format!("/book/{draft_id}/back")) {
            button class="text-sm text-gray-500 hover:text-gray-800" type="submit" { "← Back" }
        }
    }
}

fn theater_step(view: &BookingView) -> Markup {
    html! {
        h2 class="text-lg font-semibold text-gray-900" { "Choose a theater and showtime" }
        @if view.theaters.is_empty() {
            p id="no-showtimes" class="mt-4 text-gray-600" { "No shows available in your city for this title." }
        }
        @for group in view.theaters {
            div class="theater mt-6" {
                p class="font-semibold text-gray-900" { (group.theater.name) }
                p class="text-xs text-gray-500" {
                    (group.theater.address.as_deref().unwrap_or(&group.theater.location))
                    @if let Some(amenities) = &group.theater.amenities { " · " (amenities.join(", ")) }
                }
                @for date in show_dates(group) {
                    div class="mt-2 flex flex-wrap items-center gap-2" {
                        span class="w-28 text-sm text-gray-600" { (format_show_date(date)) }
                        @for show in group.showtimes.iter().filter(|s| s.show_date == date) {
                            form method="post" action=(format!("/book/{}/showtime", view.draft_id)) {
                                input type="hidden" name="showtime_id" value=(show.id);
                                button class="showtime rounded-md border border-green-500 px-3 py-1 text-sm text-green-700 hover:bg-green-50"
                                    type="submit" title=(format_price(show.price)) { (format_show_time(show.show_time)) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Distinct show dates for a theater, earliest first.
fn show_dates(group: &TheaterWithShowtimes) -> Vec<Date> {
    let mut dates: Vec<Date> = group.showtimes.iter().map(|s| s.show_date).collect();
    dates.sort();
    dates.dedup();
    dates
}

fn tickets_step(view: &BookingView) -> Markup {
    let price = view.draft.show.as_ref().map(|s| s.price).unwrap_or(0.0);
    html! {
        h2 class="text-lg font-semibold text-gray-900" { "How many tickets?" }
        p class="mt-1 text-sm text-gray-500" { (format_price(price)) " per ticket" }
        form class="mt-4 flex flex-wrap gap-2" method="post" action=(format!("/book/{}/tickets", view.draft_id)) {
            @for n in 1..=MAX_TICKETS {
                button class=(chip_class(n == view.draft.ticket_count)) type="submit" name="count" value=(n) { (n) }
            }
        }
        div class="mt-6" { (back_button(view.draft_id)) }
    }
}

fn seats_step(view: &BookingView) -> Markup {
    let draft = view.draft;
    let booked = draft.booked();
    html! {
        h2 class="text-lg font-semibold text-gray-900" {
            "Select " (draft.ticket_count) " seat(s)"
        }
        p class="mt-1 text-sm text-gray-500" { (draft.selected_seats.len()) " of " (draft.ticket_count) " selected" }
        div class="mt-6 flex justify-center" {
            div class="w-2/3 rounded-t-full border-t-4 border-gray-300 pt-1 text-center text-xs text-gray-400" { "SCREEN" }
        }
        div id="seat-grid" class="mt-4 space-y-2" {
            @for row in SEAT_ROWS {
                div class="flex items-center justify-center gap-1" {
                    span class="w-6 text-xs text-gray-500" { (row) }
                    @for number in 1..=SEATS_PER_ROW {
                        @if let Some(seat) = SeatId::new(row, number) {
                            (seat_button(view.draft_id, seat, draft.seat_state(seat, &booked)))
                        }
                    }
                }
            }
        }
        div class="mt-6 flex items-center justify-between" {
            (back_button(view.draft_id))
            div class="flex items-center gap-4" {
                span class="text-sm text-gray-700" { "Total " (format_price(draft.total_price())) }
                form method="post" action=(format!("/book/{}/proceed", view.draft_id)) {
                    button id="proceed" class="rounded-md bg-rose-600 px-4 py-2 font-semibold text-white hover:bg-rose-700 disabled:opacity-40"
                        type="submit" disabled[!draft.can_proceed()] { "Proceed to payment" }
                }
            }
        }
    }
}

fn seat_button(draft_id: &str, seat: SeatId, state: SeatState) -> Markup {
    let (class, state_name) = match state {
        SeatState::Available => ("border-green-500 text-green-700 hover:bg-green-50", "available"),
        SeatState::Selected => ("border-rose-600 bg-rose-600 text-white", "selected"),
        SeatState::Booked => ("border-gray-200 bg-gray-200 text-gray-400 cursor-not-allowed", "booked"),
    };
    html! {
        form method="post" action=(format!("/book/{draft_id}/seats")) {
            button class=(format!("seat h-7 w-7 rounded border text-xs {class}")) type="submit" name="seat"
                value=(seat.to_string()) aria-label=(format!("Row {} seat {}", seat.row(), seat.number())) data-state=(state_name) disabled[state == SeatState::Booked] { (seat.number()) }
        }
    }
}

fn payment_step(view: &BookingView) -> Markup {
    let draft = view.draft;
    let field = "mt-1 w-full rounded-md border border-gray-300 px-3 py-2";
    html! {
        h2 class="text-lg font-semibold text-gray-900" { "Payment" }
        div class="mt-2 text-sm text-gray-600" {
            p { "Seats: " (draft.seat_labels().join(", ")) }
            p class="font-semibold text-gray-900" { "Amount payable: " (format_price(draft.total_price())) }
        }
        form id="payment-form" class="mt-6 space-y-4" method="post" action=(format!("/book/{}/pay", view.draft_id)) {
            div class="flex gap-6" {
                label { input type="radio" name="method" value="card" checked; " Card" }
                label { input type="radio" name="method" value="upi"; " UPI" }
            }
            div id="card-fields" class="space-y-3" {
                input class=(field) name="card_number" placeholder="1234 5678 9012 3456" inputmode="numeric" autocomplete="cc-number";
                div class="flex gap-3" {
                    input class=(field) name="card_expiry" placeholder="MM/YY" autocomplete="cc-exp";
                    input class=(field) name="card_cvv" placeholder="CVV" inputmode="numeric" autocomplete="cc-csc";
                }
                input class=(field) name="card_name" placeholder="Name on card" autocomplete="cc-name";
            }
            div id="upi-fields" class="space-y-3" hidden {
                input class=(field) name="upi_id" placeholder="name@bank";
            }
            p class="text-xs text-gray-400" { "This is a demo checkout. No money is charged." }
            button id="pay" class="w-full rounded-md bg-rose-600 px-4 py-2 font-semibold text-white hover:bg-rose-700 disabled:opacity-40" type="submit" {
                "Pay " (format_price(draft.total_price()))
            }
        }
        div class="mt-4" { (back_button(view.draft_id)) }
        script { (PreEscaped(PAYMENT_TABS)) }
    }
}

fn success_step(view: &BookingView) -> Markup {
    let draft = view.draft;
    html! {
        div id="confirmation" class="text-center" {
            p class="text-4xl" { "🎉" }
            h2 class="mt-2 text-2xl font-bold text-gray-900" { "Booking confirmed" }
            @if let Some(confirmation) = &draft.confirmation {
                p class="mt-2 text-sm text-gray-500" { "Booking ID " span id="booking-id" { (confirmation.booking_id) } }
                p class="mt-1 text-sm text-gray-500" { "Paid with " (confirmation.payment_label) }
            }
            @if let Some(show) = &draft.show {
                p class="mt-4 text-gray-700" { (show.theater_name) ", " (show.theater_location) }
                p class="text-gray-700" { (format_show_date(show.show_date)) " at " (format_show_time(show.show_time)) }
            }
            p class="mt-2 text-gray-700" { "Seats: " (draft.seat_labels().join(", ")) }
            p class="mt-2 font-semibold text-gray-900" { "Total paid: " (format_price(draft.total_price())) }
            div class="mt-6 flex justify-center gap-4" {
                a class="rounded-md bg-rose-600 px-4 py-2 text-sm font-semibold text-white hover:bg-rose-700" href="/bookings" { "View my bookings" }
                a class="rounded-md border border-gray-300 px-4 py-2 text-sm text-gray-700" href="/" { "Back to movies" }
            }
        }
    }
}

fn status_slug(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Paid => "paid",
        PaymentStatus::Cancelled => "cancelled",
    }
}

fn status_class(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "rounded-full bg-yellow-100 px-3 py-1 text-xs font-medium text-yellow-800",
        PaymentStatus::Paid => "rounded-full bg-green-100 px-3 py-1 text-xs font-medium text-green-800",
        PaymentStatus::Cancelled => "rounded-full bg-gray-200 px-3 py-1 text-xs font-medium text-gray-600",
    }
}
