//! Shared utilities.
//!
//! - [`captcha`]: CAPTCHA verification for public auth endpoints
//! - [`email`]: notifiers, the bounded outgoing mail queue and templates

pub mod captcha;
pub mod email;
