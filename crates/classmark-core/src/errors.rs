//! Application error type with HTTP response conversion.
//!
//! [`AppError`] pairs a [`StatusCode`] with an [`anyhow::Error`]. Anything that
//! converts into `anyhow::Error` converts into an `AppError` with status 500, so
//! `?` works on database and I/O errors. Domain errors that carry their own
//! status implement [`HttpError`] and go through [`AppError::from_http`].

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// A domain error that knows which HTTP status it maps to.
pub trait HttpError: std::error::Error + Send + Sync + 'static {
    fn status(&self) -> StatusCode;
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
        }
    }

    /// Converts a domain error, keeping the status it declares.
    pub fn from_http<E: HttpError>(err: E) -> Self {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed with server error");
        }
        Self::new(status, err)
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn internal_error(message: String) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!(message))
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::CONFLICT, err)
    }

    pub fn unauthorized(message: String) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, anyhow::anyhow!(message))
    }

    pub fn forbidden(message: String) -> Self {
        Self::new(StatusCode::FORBIDDEN, anyhow::anyhow!(message))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Internal details stay in the logs.
        let message = if self.status.is_server_error() {
            tracing::error!(error = ?self.error, status = %self.status, "internal error");
            "Internal server error".to_string()
        } else {
            self.error.to_string()
        };

        let body = Json(json!({ "error": message }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Gone;

    impl std::fmt::Display for Gone {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "gone")
        }
    }

    impl std::error::Error for Gone {}

    impl HttpError for Gone {
        fn status(&self) -> StatusCode {
            StatusCode::GONE
        }
    }

    #[test]
    fn test_from_http_keeps_status() {
        let err = AppError::from_http(Gone);
        assert_eq!(err.status, StatusCode::GONE);
        assert_eq!(err.error.to_string(), "gone");
    }

    #[test]
    fn test_question_mark_conversion_is_internal() {
        fn fails() -> Result<(), AppError> {
            Err(std::io::Error::other("disk on fire"))?;
            Ok(())
        }
        assert_eq!(fails().unwrap_err().status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unauthorized_status() {
        let err = AppError::unauthorized("nope".to_string());
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_server_error_hides_detail() {
        let response =
            AppError::internal_error("db password is hunter2".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
