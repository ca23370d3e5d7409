//! # Classmark Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`jwt`]: access token signing
//! - [`session`]: refresh cookies, token lifetimes and the expiry sweep
//! - [`email`]: SMTP and the outgoing mail queue
//! - [`captcha`]: CAPTCHA verification for public auth endpoints
//! - [`cors`]: allowed browser origins
//!
//! # Example
//!
//! ```ignore
//! use classmark_config::{JwtConfig, SessionConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let session_config = SessionConfig::from_env();
//! ```

pub mod captcha;
pub mod cors;
pub mod email;
pub mod jwt;
pub mod session;

pub use captcha::CaptchaConfig;
pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use jwt::JwtConfig;
pub use session::SessionConfig;

/// Reads a boolean flag; `true`/`1` (any case) enable it.
pub(crate) fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}

/// Reads and parses a variable, falling back to `default` when unset or malformed.
pub(crate) fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
