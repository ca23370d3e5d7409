//! CAPTCHA verification for the unauthenticated auth endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{instrument, warn};

use classmark_config::CaptchaConfig;

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Whether `response` is a solved challenge. A missing response fails.
    async fn verify(&self, response: Option<&str>, remote_ip: Option<&str>) -> bool;
}

/// Accepts everything. Used when `CAPTCHA_ENABLED` is off.
pub struct DisabledCaptcha;

#[async_trait]
impl CaptchaVerifier for DisabledCaptcha {
    async fn verify(&self, _response: Option<&str>, _remote_ip: Option<&str>) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
}

/// Verifies against an hCaptcha/reCAPTCHA style `siteverify` endpoint.
pub struct HttpCaptchaVerifier {
    client: reqwest::Client,
    secret: String,
    verify_url: String,
}

impl HttpCaptchaVerifier {
    pub fn new(config: &CaptchaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret: config.secret.clone(),
            verify_url: config.verify_url.clone(),
        }
    }

    async fn site_verify(&self, response: &str, remote_ip: Option<&str>) -> reqwest::Result<bool> {
        let mut form = vec![("secret", self.secret.as_str()), ("response", response)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let body: SiteVerifyResponse = self
            .client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.success)
    }
}

#[async_trait]
impl CaptchaVerifier for HttpCaptchaVerifier {
    #[instrument(skip(self, response))]
    async fn verify(&self, response: Option<&str>, remote_ip: Option<&str>) -> bool {
        let Some(response) = response.filter(|r| !r.is_empty()) else {
            return false;
        };

        match self.site_verify(response, remote_ip).await {
            Ok(success) => success,
            Err(e) => {
                warn!(error = %e, "CAPTCHA verification request failed");
                false
            }
        }
    }
}

pub fn build_captcha_verifier(config: &CaptchaConfig) -> Arc<dyn CaptchaVerifier> {
    if config.enabled {
        Arc::new(HttpCaptchaVerifier::new(config))
    } else {
        Arc::new(DisabledCaptcha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_accepts_missing_response() {
        assert!(DisabledCaptcha.verify(None, None).await);
    }

    #[tokio::test]
    async fn test_enabled_rejects_missing_response() {
        let config = CaptchaConfig {
            enabled: true,
            secret: "secret".to_string(),
            verify_url: "http://127.0.0.1:9/siteverify".to_string(),
        };
        let verifier = HttpCaptchaVerifier::new(&config);
        assert!(!verifier.verify(None, Some("10.0.0.1")).await);
        assert!(!verifier.verify(Some(""), None).await);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_closed() {
        let config = CaptchaConfig {
            enabled: true,
            secret: "secret".to_string(),
            verify_url: "http://127.0.0.1:9/siteverify".to_string(),
        };
        let verifier = HttpCaptchaVerifier::new(&config);
        assert!(!verifier.verify(Some("token"), None).await);
    }
}
