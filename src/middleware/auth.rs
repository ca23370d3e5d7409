use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use classmark_auth::{AccessClaims, PrincipalKind, verify_access_token};
use classmark_core::AppError;
use classmark_models::{StudentId, TeacherId};

use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("Invalid authorization header format".to_string()))
}

/// Extractor for requests carrying a teacher access token.
#[derive(Debug, Clone)]
pub struct AuthTeacher(pub AccessClaims);

impl AuthTeacher {
    pub fn teacher_id(&self) -> Result<TeacherId, AppError> {
        self.0
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid subject in token".to_string()))
    }
}

impl FromRequestParts<AppState> for AuthTeacher {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = verify_access_token(token, PrincipalKind::Teacher, &state.jwt_config)?;
        Ok(AuthTeacher(claims))
    }
}

/// Extractor for requests carrying a student access token.
#[derive(Debug, Clone)]
pub struct AuthStudent(pub AccessClaims);

impl AuthStudent {
    pub fn student_id(&self) -> Result<StudentId, AppError> {
        self.0
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid subject in token".to_string()))
    }
}

impl FromRequestParts<AppState> for AuthStudent {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = verify_access_token(token, PrincipalKind::Student, &state.jwt_config)?;
        Ok(AuthStudent(claims))
    }
}
