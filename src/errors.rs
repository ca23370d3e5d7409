//! Errors raised by the auth flows and the self-sign gate.
//!
//! Both enums carry their HTTP status through [`HttpError`]. Convert them with
//! [`AppError::from_http`]; a bare `?` would go through the blanket 500 mapping.

use axum::http::StatusCode;
use thiserror::Error;

use classmark_core::{AppError, HttpError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No usable refresh cookie, or one of each kind at once.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid email or password")]
    InvalidLogin,

    /// Every way a password reset confirmation can fail.
    #[error("Invalid password reset data")]
    InvalidPasswordResetData,

    #[error("CAPTCHA verification failed")]
    CaptchaFailed,
}

impl HttpError for AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::InvalidLogin => StatusCode::UNAUTHORIZED,
            AuthError::InvalidPasswordResetData | AuthError::CaptchaFailed => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelfSignError {
    #[error("Attendance day not found")]
    DayNotFound,

    #[error("Self-sign key does not match")]
    KeyMismatch,

    #[error("Self-sign record not found")]
    SelfSignNotFound,

    #[error("Attendance value not found")]
    UnknownAttendanceValue,
}

impl HttpError for SelfSignError {
    fn status(&self) -> StatusCode {
        match self {
            SelfSignError::DayNotFound | SelfSignError::SelfSignNotFound => StatusCode::NOT_FOUND,
            SelfSignError::KeyMismatch => StatusCode::BAD_REQUEST,
            SelfSignError::UnknownAttendanceValue => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}
