use axum_extra::extract::cookie::Cookie;
use chrono::{DateTime, Duration, Utc};

use classmark_models::AccessTokenResponse;

/// What a successful login, verification or rotation hands back: the access
/// token for the body and the refresh cookie for the jar.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access: AccessTokenResponse,
    pub refresh_cookie: Cookie<'static>,
}

/// Which refresh cookie a request carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentedSession {
    Teacher(String),
    Student(String),
}

/// `now + ttl_minutes`, saturating instead of overflowing.
pub fn expires_after(now: DateTime<Utc>, ttl_minutes: i64) -> DateTime<Utc> {
    Duration::try_minutes(ttl_minutes)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
