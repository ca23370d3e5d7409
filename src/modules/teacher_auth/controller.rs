use axum::Json;
use axum::extract::State;
use axum_extra::TypedHeader;
use axum_extra::extract::CookieJar;
use axum_extra::headers::UserAgent;
use tracing::instrument;

use classmark_core::{AppError, ErrorResponse};
use classmark_models::{
    AccessTokenResponse, MessageResponse, PasswordResetConfirmRequest, PasswordResetRequest,
    TeacherLoginRequest,
};

use super::service::TeacherAuthService;
use crate::middleware::client_ip::ClientIp;
use crate::state::AppState;
use crate::validator::ValidatedJson;

pub const PASSWORD_RESET_REQUESTED: &str =
    "If an account exists with that email, a password reset link has been sent.";

/// Log in as a teacher
///
/// Sets the `teacher_refresh_token` cookie. Without `remember_me` the cookie
/// only lives for the browser session.
#[utoipa::path(
    post,
    path = "/api/teacher/auth/login",
    request_body = TeacherLoginRequest,
    responses(
        (
            status = 200,
            description = "Login successful, refresh cookie set",
            body = AccessTokenResponse
        ),
        (status = 400, description = "Malformed body or CAPTCHA failed", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Teacher Authentication"
)]
#[instrument(skip(state, jar, user_agent, dto))]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    user_agent: Option<TypedHeader<UserAgent>>,
    jar: CookieJar,
    ValidatedJson(dto): ValidatedJson<TeacherLoginRequest>,
) -> Result<(CookieJar, Json<AccessTokenResponse>), AppError> {
    let user_agent = user_agent.map(|TypedHeader(ua)| ua.as_str().to_string());
    let session =
        TeacherAuthService::login(&state, dto, &client_ip, user_agent.as_deref()).await?;
    Ok((jar.add(session.refresh_cookie), Json(session.access)))
}

/// Request a password reset email
#[utoipa::path(
    post,
    path = "/api/teacher/auth/password-reset/request",
    request_body = PasswordResetRequest,
    responses(
        (
            status = 200,
            description = "Reset link sent if the account exists",
            body = MessageResponse
        ),
        (status = 400, description = "Malformed body or CAPTCHA failed", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Teacher Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ValidatedJson(dto): ValidatedJson<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    TeacherAuthService::request_password_reset(&state, dto, &client_ip).await?;
    Ok(Json(MessageResponse::new(PASSWORD_RESET_REQUESTED)))
}

/// Set a new password with a reset token
///
/// Signs the teacher out everywhere on success.
#[utoipa::path(
    post,
    path = "/api/teacher/auth/password-reset/confirm",
    request_body = PasswordResetConfirmRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid password reset data", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Teacher Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<PasswordResetConfirmRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    TeacherAuthService::set_new_password(&state, dto).await?;
    Ok(Json(MessageResponse::new(
        "Password has been reset. Please log in again.",
    )))
}
