use axum::Json;
use axum::extract::State;
use axum_extra::TypedHeader;
use axum_extra::extract::CookieJar;
use axum_extra::headers::UserAgent;
use tracing::instrument;

use classmark_auth::STUDENT_REFRESH_COOKIE;
use classmark_core::{AppError, ErrorResponse};
use classmark_models::{
    AccessTokenResponse, MessageResponse, StudentAccessRequest, StudentVerifyRequest,
};

use super::service::StudentAuthService;
use crate::errors::AuthError;
use crate::middleware::client_ip::ClientIp;
use crate::state::AppState;
use crate::validator::ValidatedJson;

pub const ACCESS_REQUESTED: &str =
    "If the student number is registered, a sign-in link has been sent.";

/// Request a sign-in link by email
#[utoipa::path(
    post,
    path = "/api/student/auth/request-access",
    request_body = StudentAccessRequest,
    responses(
        (
            status = 200,
            description = "Sign-in link sent if the student exists",
            body = MessageResponse
        ),
        (status = 400, description = "Malformed body or CAPTCHA failed", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Student Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn request_access(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ValidatedJson(dto): ValidatedJson<StudentAccessRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    StudentAuthService::request_access(&state, dto, &client_ip).await?;
    Ok(Json(MessageResponse::new(ACCESS_REQUESTED)))
}

/// Exchange a sign-in link token for a session
///
/// `duration_seconds` of 0 keeps the session for the browser session only.
#[utoipa::path(
    post,
    path = "/api/student/auth/verify",
    request_body = StudentVerifyRequest,
    responses(
        (status = 200, description = "Signed in, refresh cookie set", body = AccessTokenResponse),
        (status = 401, description = "Token unknown, used or expired", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Student Authentication"
)]
#[instrument(skip(state, jar, user_agent, dto))]
pub async fn verify(
    State(state): State<AppState>,
    user_agent: Option<TypedHeader<UserAgent>>,
    jar: CookieJar,
    ValidatedJson(dto): ValidatedJson<StudentVerifyRequest>,
) -> Result<(CookieJar, Json<AccessTokenResponse>), AppError> {
    let user_agent = user_agent.map(|TypedHeader(ua)| ua.as_str().to_string());
    let session = StudentAuthService::verify(&state, dto, user_agent.as_deref()).await?;
    Ok((jar.add(session.refresh_cookie), Json(session.access)))
}

/// Sign out of every device
///
/// Revokes all sessions of the student owning the presented refresh cookie.
#[utoipa::path(
    post,
    path = "/api/student/auth/forget-sessions",
    responses(
        (status = 200, description = "All sessions revoked", body = MessageResponse),
        (status = 401, description = "No valid student session", body = ErrorResponse)
    ),
    tag = "Student Authentication"
)]
#[instrument(skip(state, jar))]
pub async fn forget_sessions(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), (CookieJar, AppError)> {
    let removal = state.cookie_policy().removal_cookie(STUDENT_REFRESH_COOKIE);

    let Some(transported) = jar.get(STUDENT_REFRESH_COOKIE).map(|c| c.value().to_string()) else {
        return Err((
            jar.add(removal),
            AppError::from_http(AuthError::InvalidCredentials),
        ));
    };

    match StudentAuthService::forget_all_sessions(&state, &transported).await {
        Ok(revoked) => Ok((
            jar.add(removal),
            Json(MessageResponse::new(format!("Signed out of {} session(s)", revoked))),
        )),
        Err(e) => Err((jar.add(removal), e)),
    }
}
