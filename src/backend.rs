use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use jiff::civil::Date;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;
use wreq::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::{
    mock::MockBackend,
    models::{AuthSession, Booking, Movie, NewBooking, PaymentStatus, Showtime},
};

const SEARCH_LIMIT: usize = 10;
const SHOWTIME_COLUMNS: &str = "id,movie_id,theater_id,show_date,show_time,available_seats,price,is_active,theaters(id,name,location,address,amenities)";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("could not reach the booking service: {0}")]
    Http(#[from] wreq::Error),
    #[error("{message} (status {status})")]
    Api { status: u16, message: String },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Auth(String),
    #[error("unexpected response from the booking service: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for the hosted data backend (PostgREST tables plus a GoTrue-style auth API).
///
/// With no backend URL configured every call is answered by an in-memory [`MockBackend`].
pub struct BackendClient {
    client: wreq::Client,
    base_url: String,
    anon_key: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    mock: Option<MockBackend>,
}

impl BackendClient {
    pub fn new(client: wreq::Client, base_url: String, anon_key: String, rps: u32) -> Self {
        let mock = if base_url.trim().is_empty() {
            tracing::warn!("Using mock backend - no BACKEND_URL provided");
            Some(MockBackend::seeded())
        } else {
            None
        };

        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN),
        )));
        Self { client, base_url: base_url.trim_end_matches('/').to_string(), anon_key, limiter, mock }
    }

    #[cfg(test)]
    pub fn mock(&self) -> Option<&MockBackend> {
        self.mock.as_ref()
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorize(&self, req: wreq::RequestBuilder, token: Option<&str>) -> wreq::RequestBuilder {
        let bearer = token.unwrap_or(&self.anon_key);
        req.header("apikey", self.anon_key.as_str()).header(AUTHORIZATION, format!("Bearer {bearer}"))
    }

    async fn send<T: DeserializeOwned>(&self, req: wreq::RequestBuilder) -> Result<T, BackendError> {
        self.limiter.until_ready().await;

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(BackendError::Api { status: status.as_u16(), message: error_message(&body) });
        }
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn list_movies(&self, category: Option<&str>) -> Result<Vec<Movie>, BackendError> {
        if let Some(mock) = &self.mock {
            return Ok(mock.list_movies(category).await);
        }

        let mut query = vec![("select", "*".to_string()), ("order", "rating.desc".to_string())];
        if let Some(category) = category {
            query.push(("category", format!("eq.{category}")));
        }
        debug!(category = ?category, "fetching movies");
        self.send(self.authorize(self.client.get(self.rest_url("movies")), None).query(&query)).await
    }

    pub async fn search_movies(&self, term: &str) -> Result<Vec<Movie>, BackendError> {
        if let Some(mock) = &self.mock {
            return Ok(mock.search_movies(term, SEARCH_LIMIT).await);
        }

        let query = [
            ("select", "*".to_string()),
            ("or", format!("(title.ilike.*{term}*,description.ilike.*{term}*)")),
            ("order", "rating.desc".to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
        ];
        debug!(term = %term, "searching movies");
        self.send(self.authorize(self.client.get(self.rest_url("movies")), None).query(&query)).await
    }

    pub async fn get_movie(&self, id: &str) -> Result<Movie, BackendError> {
        if let Some(mock) = &self.mock {
            return mock.get_movie(id).await.ok_or(BackendError::NotFound("movie"));
        }

        let query = [("select", "*".to_string()), ("id", format!("eq.{id}"))];
        let rows: Vec<Movie> = self
            .send(self.authorize(self.client.get(self.rest_url("movies")), None).query(&query))
            .await?;
        rows.into_iter().next().ok_or(BackendError::NotFound("movie"))
    }

    /// Active showtimes for a movie from `from` onwards, earliest time first.
    pub async fn showtimes_for_movie(
        &self,
        movie_id: &str,
        from: Date,
    ) -> Result<Vec<Showtime>, BackendError> {
        if let Some(mock) = &self.mock {
            return Ok(mock.showtimes_for_movie(movie_id, from).await);
        }

        let query = [
            ("select", SHOWTIME_COLUMNS.to_string()),
            ("movie_id", format!("eq.{movie_id}")),
            ("is_active", "eq.true".to_string()),
            ("show_date", format!("gte.{from}")),
            ("order", "show_time.asc".to_string()),
        ];
        debug!(movie_id = %movie_id, from = %from, "fetching showtimes");
        self.send(self.authorize(self.client.get(self.rest_url("showtimes")), None).query(&query))
            .await
    }

    pub async fn create_booking(
        &self,
        session: &AuthSession,
        booking: &NewBooking,
    ) -> Result<Booking, BackendError> {
        if let Some(mock) = &self.mock {
            return mock.create_booking(booking).await;
        }

        let req = self
            .authorize(self.client.post(self.rest_url("bookings")), Some(&session.access_token))
            .header("Prefer", "return=representation")
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(booking)?);
        let rows: Vec<Booking> = self.send(req).await?;
        rows.into_iter().next().ok_or(BackendError::NotFound("created booking"))
    }

    pub async fn update_payment_status(
        &self,
        session: &AuthSession,
        booking_id: &str,
        status: PaymentStatus,
    ) -> Result<(), BackendError> {
        if let Some(mock) = &self.mock {
            return mock.update_payment_status(&session.user_id, booking_id, status).await;
        }

        let body = serde_json::json!({ "payment_status": status });
        let req = self
            .authorize(self.client.patch(self.rest_url("bookings")), Some(&session.access_token))
            .query(&[("id", format!("eq.{booking_id}"))])
            .header("Prefer", "return=representation")
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string());
        let rows: Vec<Booking> = self.send(req).await?;
        if rows.is_empty() {
            return Err(BackendError::NotFound("booking"));
        }
        Ok(())
    }

    pub async fn list_bookings(&self, session: &AuthSession) -> Result<Vec<Booking>, BackendError> {
        if let Some(mock) = &self.mock {
            return Ok(mock.list_bookings(&session.user_id).await);
        }

        let query = [
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", session.user_id)),
            ("order", "booking_date.desc".to_string()),
        ];
        let req = self
            .authorize(self.client.get(self.rest_url("bookings")), Some(&session.access_token))
            .query(&query);
        self.send(req).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        if let Some(mock) = &self.mock {
            return mock.sign_in(email, password);
        }

        let url = format!("{}/auth/v1/token", self.base_url);
        let req = self
            .authorize(self.client.post(url), None)
            .query(&[("grant_type", "password")])
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::json!({ "email": email, "password": password }).to_string());
        let resp: TokenResponse = self.send(req).await?;
        resp.into_session()
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        if let Some(mock) = &self.mock {
            return mock.sign_in(email, password);
        }

        let url = format!("{}/auth/v1/signup", self.base_url);
        let req = self
            .authorize(self.client.post(url), None)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::json!({ "email": email, "password": password }).to_string());
        let resp: TokenResponse = self.send(req).await?;
        resp.into_session()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self) -> Result<AuthSession, BackendError> {
        let (Some(access_token), Some(user)) = (self.access_token, self.user) else {
            return Err(BackendError::Auth(
                "Check your inbox to confirm your email, then sign in.".to_string(),
            ));
        };
        Ok(AuthSession { access_token, user_id: user.id, email: user.email.unwrap_or_default() })
    }
}

/// Pulls the human-readable message out of a backend error body.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error_description: Option<String>,
        msg: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| e.message.or(e.error_description).or(e.msg))
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() { "request failed".to_string() } else { body.to_string() }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_structured_fields() {
        assert_eq!(error_message(r#"{"message": "duplicate key"}"#), "duplicate key");
        assert_eq!(
            error_message(r#"{"error": "invalid_grant", "error_description": "Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
        assert_eq!(error_message(""), "request failed");
    }

    #[test]
    fn token_response_without_session_asks_for_confirmation() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"user": {"id": "u-1", "email": "a@b.co"}}"#).unwrap();
        assert!(matches!(resp.into_session(), Err(BackendError::Auth(_))));

        let resp: TokenResponse = serde_json::from_str(
            r#"{"access_token": "tok", "user": {"id": "u-1", "email": "a@b.co"}}"#,
        )
        .unwrap();
        let session = resp.into_session().unwrap();
        assert_eq!(session.user_id, "u-1");
        assert_eq!(session.access_token, "tok");
    }
}
