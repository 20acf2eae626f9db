use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{Method, request::Parts},
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::models::AuthSession;

const TOKEN_COOKIE: &str = "sb_access_token";
const USER_ID_COOKIE: &str = "sb_user_id";
const EMAIL_COOKIE: &str = "sb_user_email";
const MIN_PASSWORD_LEN: usize = 6;

pub fn session_from_jar(jar: &CookieJar) -> Option<AuthSession> {
    let access_token = jar.get(TOKEN_COOKIE)?.value().to_string();
    let user_id = jar.get(USER_ID_COOKIE)?.value().to_string();
    if access_token.is_empty() || user_id.is_empty() {
        return None;
    }
    let email = jar.get(EMAIL_COOKIE).map(|c| c.value().to_string()).unwrap_or_default();
    Some(AuthSession { access_token, user_id, email })
}

pub fn store_session(jar: CookieJar, session: &AuthSession, secure: bool) -> CookieJar {
    let build = |name: &'static str, value: String| {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .same_site(cookie::SameSite::Lax)
            .max_age(time::Duration::days(7))
            .secure(secure)
            .build()
    };
    jar.add(build(TOKEN_COOKIE, session.access_token.clone()))
        .add(build(USER_ID_COOKIE, session.user_id.clone()))
        .add(build(EMAIL_COOKIE, session.email.clone()))
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    [TOKEN_COOKIE, USER_ID_COOKIE, EMAIL_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| jar.remove(Cookie::build(name).path("/")))
}

pub fn validate_credentials(email: &str, password: &str) -> Result<(), &'static str> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err("Enter a valid email address.");
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err("Password must be at least 6 characters.");
    }
    Ok(())
}

/// Only same-site relative paths are followed after signing in.
pub fn safe_return_to(path: &str) -> &str {
    if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') { path } else { "/" }
}

/// The signed-in user, if any.
pub struct MaybeUser(pub Option<AuthSession>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_from_jar(&CookieJar::from_headers(&parts.headers))))
    }
}

/// Page to come back to after signing in; form posts go home.
fn return_path(parts: &Parts) -> &str {
    if parts.method == Method::GET { parts.uri.path() } else { "/" }
}

/// The signed-in user; anonymous requests are sent to the sign-in page.
pub struct CurrentUser(pub AuthSession);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_from_jar(&CookieJar::from_headers(&parts.headers)).map(Self).ok_or_else(|| {
            Redirect::to(&format!("/auth?return_to={}", urlencoding::encode(return_path(parts))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AuthSession {
        AuthSession {
            access_token: "tok".to_string(),
            user_id: "u-1".to_string(),
            email: "asha@example.com".to_string(),
        }
    }

    #[test]
    fn session_round_trips_through_cookies() {
        let jar = store_session(CookieJar::new(), &session(), false);
        assert_eq!(session_from_jar(&jar), Some(session()));

        let jar = clear_session(jar);
        assert_eq!(session_from_jar(&jar), None);
    }

    #[test]
    fn credentials_need_email_and_six_char_password() {
        assert!(validate_credentials("asha@example.com", "secret").is_ok());
        assert!(validate_credentials("asha", "secret").is_err());
        assert!(validate_credentials("asha@example.com", "12345").is_err());
    }

    #[test]
    fn return_to_rejects_offsite_targets() {
        assert_eq!(safe_return_to("/book/abc"), "/book/abc");
        assert_eq!(safe_return_to("//evil.example"), "/");
        assert_eq!(safe_return_to("https://evil.example"), "/");
        assert_eq!(safe_return_to(""), "/");
    }
}
