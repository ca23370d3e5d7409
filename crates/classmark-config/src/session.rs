//! Refresh cookie and token lifetime configuration.
//!
//! All lifetimes are in minutes because that is the unit the token service
//! issues in.
//!
//! # Environment Variables
//!
//! - `COOKIE_SECURE`: set the `Secure` attribute on refresh cookies (default: true)
//! - `TOKEN_LENGTH_BYTES`: random bytes per issued token (default: 32)
//! - `TEACHER_REFRESH_TTL_MINUTES`: teacher refresh session lifetime (default: 10080, 7 days)
//! - `TEACHER_RESET_TTL_MINUTES`: password reset link lifetime (default: 60)
//! - `STUDENT_LOGIN_TTL_MINUTES`: student login link lifetime (default: 15)
//! - `STUDENT_SESSION_TTL_MINUTES`: stored lifetime of a session-only student token (default: 1440)
//! - `SELF_SIGN_KEY_LENGTH_BYTES`: random bytes in a generated self-sign key (default: 6)
//! - `SELF_SIGN_KEY_TTL_MINUTES`: lifetime of a generated self-sign key (default: 720)
//! - `TOKEN_SWEEP_INTERVAL_SECS`: period of the expired token sweep (default: 300)

use crate::{env_flag, env_parse};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Mirrors the deployment: true behind HTTPS.
    pub cookie_secure: bool,
    pub token_length_bytes: usize,
    pub teacher_refresh_ttl_minutes: i64,
    pub teacher_reset_ttl_minutes: i64,
    pub student_login_ttl_minutes: i64,
    /// A student who asks for a browser-session login still gets a row with an
    /// expiry; this is how long it lives server side.
    pub student_session_ttl_minutes: i64,
    pub self_sign_key_length_bytes: usize,
    pub self_sign_key_ttl_minutes: i64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_secure: true,
            token_length_bytes: 32,
            teacher_refresh_ttl_minutes: 7 * 24 * 60,
            teacher_reset_ttl_minutes: 60,
            student_login_ttl_minutes: 15,
            student_session_ttl_minutes: 24 * 60,
            self_sign_key_length_bytes: 6,
            self_sign_key_ttl_minutes: 12 * 60,
            sweep_interval_secs: 300,
        }
    }
}

impl SessionConfig {
    /// Creates a `SessionConfig` from environment variables, falling back to
    /// [`SessionConfig::default`] for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cookie_secure: env_flag("COOKIE_SECURE", defaults.cookie_secure),
            token_length_bytes: env_parse("TOKEN_LENGTH_BYTES", defaults.token_length_bytes),
            teacher_refresh_ttl_minutes: env_parse(
                "TEACHER_REFRESH_TTL_MINUTES",
                defaults.teacher_refresh_ttl_minutes,
            ),
            teacher_reset_ttl_minutes: env_parse(
                "TEACHER_RESET_TTL_MINUTES",
                defaults.teacher_reset_ttl_minutes,
            ),
            student_login_ttl_minutes: env_parse(
                "STUDENT_LOGIN_TTL_MINUTES",
                defaults.student_login_ttl_minutes,
            ),
            student_session_ttl_minutes: env_parse(
                "STUDENT_SESSION_TTL_MINUTES",
                defaults.student_session_ttl_minutes,
            ),
            self_sign_key_length_bytes: env_parse(
                "SELF_SIGN_KEY_LENGTH_BYTES",
                defaults.self_sign_key_length_bytes,
            ),
            self_sign_key_ttl_minutes: env_parse(
                "SELF_SIGN_KEY_TTL_MINUTES",
                defaults.self_sign_key_ttl_minutes,
            ),
            sweep_interval_secs: env_parse(
                "TOKEN_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_secs,
            ),
        }
    }
}
