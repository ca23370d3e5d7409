use std::env;

use crate::env_flag;

/// CAPTCHA gate for teacher login, password reset requests and student
/// access requests.
#[derive(Clone, Debug)]
pub struct CaptchaConfig {
    pub enabled: bool,
    pub secret: String,
    /// `siteverify` style endpoint accepting `secret`, `response` and `remoteip`.
    pub verify_url: String,
}

impl CaptchaConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_flag("CAPTCHA_ENABLED", false),
            secret: env::var("CAPTCHA_SECRET").unwrap_or_default(),
            verify_url: env::var("CAPTCHA_VERIFY_URL")
                .unwrap_or_else(|_| "https://hcaptcha.com/siteverify".to_string()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            secret: String::new(),
            verify_url: String::new(),
        }
    }
}
