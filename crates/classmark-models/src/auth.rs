//! Authentication DTOs for both principal kinds.
//!
//! Refresh tokens never appear in these bodies; they travel in HttpOnly
//! cookies set by the controllers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Teacher login with email and password.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TeacherLoginRequest {
    #[validate(email)]
    #[schema(example = "teacher@school.edu")]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    /// Persist the refresh cookie past the browser session.
    #[serde(default)]
    pub remember_me: bool,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PasswordResetRequest {
    #[validate(email)]
    #[schema(example = "teacher@school.edu")]
    pub email: String,
    pub captcha_token: Option<String>,
}

/// Completes a password reset with the token from the emailed link.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PasswordResetConfirmRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    #[schema(example = "newPassword123")]
    pub new_password: String,
}

/// Asks for a login link to be mailed to a student.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StudentAccessRequest {
    #[validate(length(min = 1, max = 32))]
    #[schema(example = "20240042")]
    pub student_number: String,
    pub captcha_token: Option<String>,
}

/// Exchanges a mailed login token for a session.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StudentVerifyRequest {
    #[validate(length(min = 1))]
    pub token: String,
    /// Session length in seconds; 0 keeps the session to the browser session.
    #[serde(default)]
    #[validate(range(max = 31_536_000))]
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

impl AccessTokenResponse {
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_defaults_remember_me_off() {
        let json = r#"{"email":"t@school.edu","password":"secret"}"#;
        let request: TeacherLoginRequest = serde_json::from_str(json).unwrap();
        assert!(!request.remember_me);
        assert!(request.captcha_token.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_login_request_invalid_email() {
        let request = TeacherLoginRequest {
            email: "not-an-email".to_string(),
            password: "secret".to_string(),
            remember_me: false,
            captcha_token: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_reset_confirm_password_too_short() {
        let request = PasswordResetConfirmRequest {
            token: "abc".to_string(),
            email: "t@school.edu".to_string(),
            new_password: "short".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_student_verify_defaults_to_session_only() {
        let request: StudentVerifyRequest = serde_json::from_str(r#"{"token":"xyz"}"#).unwrap();
        assert_eq!(request.duration_seconds, 0);
    }

    #[test]
    fn test_student_verify_duration_capped_at_a_year() {
        let request = StudentVerifyRequest {
            token: "xyz".to_string(),
            duration_seconds: 31_536_001,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_student_access_request_empty_number() {
        let request = StudentAccessRequest {
            student_number: String::new(),
            captcha_token: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_access_token_response_serialize() {
        let response = AccessTokenResponse::bearer("jwt".to_string(), 900);
        let serialized = serde_json::to_string(&response).unwrap();
        assert!(serialized.contains(r#""token_type":"Bearer""#));
        assert!(serialized.contains(r#""expires_in":900"#));
    }
}
