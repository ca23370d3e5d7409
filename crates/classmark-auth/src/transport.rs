//! Refresh token transport.
//!
//! A refresh token travels to the browser in an HttpOnly cookie. When the
//! holder asked not to be remembered, the cookie value carries the
//! [`SESSION_ONLY_PREFIX`] and the cookie is sent without `Expires`, so the
//! browser drops it when the session ends. The prefix is stripped before the
//! value reaches the token store.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use time::OffsetDateTime;

pub const SESSION_ONLY_PREFIX: &str = "!-!";

pub const TEACHER_REFRESH_COOKIE: &str = "teacher_refresh_token";
pub const STUDENT_REFRESH_COOKIE: &str = "student_refresh_token";

const DELETED_VALUE: &str = "deleted";

pub fn wrap_for_transport(value: &str, session_only: bool) -> String {
    if session_only {
        format!("{SESSION_ONLY_PREFIX}{value}")
    } else {
        value.to_string()
    }
}

/// Returns the stored token value and whether it was marked session-only.
pub fn unwrap_from_transport(transported: &str) -> (&str, bool) {
    match transported.strip_prefix(SESSION_ONLY_PREFIX) {
        Some(value) => (value, true),
        None => (transported, false),
    }
}

/// Attributes shared by every refresh cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Cookie carrying `value`, wrapped for transport.
    pub fn refresh_cookie(
        &self,
        name: &'static str,
        value: &str,
        session_only: bool,
        expires_at: DateTime<Utc>,
    ) -> Cookie<'static> {
        let builder = Cookie::build((name, wrap_for_transport(value, session_only)))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure);

        if session_only {
            return builder.build();
        }

        match OffsetDateTime::from_unix_timestamp(expires_at.timestamp()) {
            Ok(expires) => builder.expires(expires).build(),
            Err(_) => builder.build(),
        }
    }

    /// Overwrites the named cookie with an already expired one.
    pub fn removal_cookie(&self, name: &'static str) -> Cookie<'static> {
        Cookie::build((name, DELETED_VALUE))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }
}
