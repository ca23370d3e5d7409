use std::env;

use crate::{env_flag, env_parse};

#[derive(Clone, Debug)]
pub struct EmailConfig {
    /// When false, mail is written to the log instead of sent.
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    /// Base URL that links in emails point at.
    pub frontend_url: String,
    /// Capacity of the outgoing mail queue.
    pub queue_capacity: usize,
}

impl EmailConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_flag("SMTP_ENABLED", false),
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            smtp_port: env_parse("SMTP_PORT", 1025),
            smtp_username: env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@classmark.app".to_string()),
            from_name: env::var("FROM_NAME").unwrap_or_else(|_| "Classmark".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            queue_capacity: env_parse("EMAIL_QUEUE_CAPACITY", 256),
        }
    }
}
