use axum_extra::extract::cookie::{Cookie, CookieJar};

pub const AVAILABLE_LOCATIONS: [&str; 10] = [
    "Mumbai",
    "Delhi",
    "Bangalore",
    "Hyderabad",
    "Chennai",
    "Kolkata",
    "Pune",
    "Ahmedabad",
    "Jaipur",
    "Lucknow",
];

pub const POPULAR_LOCATIONS: [&str; 5] = ["Mumbai", "Delhi", "Bangalore", "Hyderabad", "Chennai"];

pub const LOCATION_COOKIE: &str = "location";

pub fn filter_locations(query: &str) -> Vec<&'static str> {
    let needle = query.trim().to_lowercase();
    AVAILABLE_LOCATIONS.iter().copied().filter(|l| l.to_lowercase().contains(&needle)).collect()
}

/// Canonical spelling of a supported city, matched case-insensitively.
pub fn find_location(name: &str) -> Option<&'static str> {
    let name = name.trim();
    AVAILABLE_LOCATIONS.iter().copied().find(|l| l.eq_ignore_ascii_case(name))
}

pub fn selected_location(jar: &CookieJar) -> Option<&'static str> {
    jar.get(LOCATION_COOKIE).and_then(|c| find_location(c.value()))
}

pub fn location_cookie(city: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((LOCATION_COOKIE, city))
        .path("/")
        .max_age(time::Duration::days(365))
        .same_site(cookie::SameSite::Lax)
        .secure(secure)
        .build()
}
