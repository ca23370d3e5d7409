use axum::Json;
use axum::extract::State;
use axum_extra::TypedHeader;
use axum_extra::extract::CookieJar;
use axum_extra::headers::UserAgent;
use tracing::instrument;

use classmark_core::{AppError, ErrorResponse};
use classmark_models::{AccessTokenResponse, MessageResponse};

use super::service::SessionService;
use crate::state::AppState;

/// Get a new access token from the refresh cookie
///
/// Accepts either `teacher_refresh_token` or `student_refresh_token`, not
/// both. Teacher refresh tokens are rotated on every call.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (
            status = 401,
            description = "Missing, ambiguous, unknown or expired refresh cookie",
            body = ErrorResponse
        ),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Sessions"
)]
#[instrument(skip(state, jar, user_agent))]
pub async fn refresh(
    State(state): State<AppState>,
    user_agent: Option<TypedHeader<UserAgent>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AccessTokenResponse>), (CookieJar, AppError)> {
    let user_agent = user_agent.map(|TypedHeader(ua)| ua.as_str().to_string());
    let (jar, access) = SessionService::refresh(&state, jar, user_agent.as_deref()).await?;
    Ok((jar, Json(access)))
}

/// Log out
///
/// Revokes the presented refresh token and clears both refresh cookies.
/// Always succeeds.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    ),
    tag = "Sessions"
)]
#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let jar = SessionService::logout(&state, jar).await;
    (jar, Json(MessageResponse::new("Logged out")))
}
