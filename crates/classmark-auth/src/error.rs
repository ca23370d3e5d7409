use axum::http::StatusCode;
use classmark_core::HttpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token not found")]
    NotFound,

    #[error("Token expired")]
    Expired,

    #[error("Token does not belong to this subject")]
    OwnerMismatch,

    #[error("An active token already exists for this subject")]
    DuplicateActiveToken,

    #[error("Invalid token parameters: {0}")]
    InvalidTokenParameters(&'static str),

    /// The generated value is already taken; issuance regenerates.
    #[error("Token value collision")]
    ValueCollision,

    #[error("Unknown token type code: {0}")]
    UnknownType(String),

    #[error("Token storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl TokenError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::NotFound => "not_found",
            TokenError::Expired => "expired",
            TokenError::OwnerMismatch => "owner_mismatch",
            TokenError::DuplicateActiveToken => "duplicate",
            TokenError::InvalidTokenParameters(_) => "invalid_parameters",
            TokenError::ValueCollision => "collision",
            TokenError::UnknownType(_) => "unknown_type",
            TokenError::Storage(_) => "storage",
        }
    }
}

impl HttpError for TokenError {
    fn status(&self) -> StatusCode {
        match self {
            TokenError::NotFound | TokenError::Expired | TokenError::OwnerMismatch => {
                StatusCode::UNAUTHORIZED
            }
            TokenError::DuplicateActiveToken => StatusCode::CONFLICT,
            TokenError::InvalidTokenParameters(_)
            | TokenError::ValueCollision
            | TokenError::UnknownType(_)
            | TokenError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
