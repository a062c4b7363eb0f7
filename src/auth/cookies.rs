//! Session cookie construction. Both tokens ride in `HttpOnly` strict
//! same-site cookies; `Secure` is added in production only.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration as TimeDuration;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

pub fn session_cookie(
    name: &'static str,
    value: String,
    max_age: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(TimeDuration::seconds(max_age.as_secs() as i64))
        .build()
}

/// Cookie with matching name and path, used to clear a session cookie.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}
