use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::instrument;

use classmark_core::{AppError, ErrorResponse};
use classmark_models::{
    AttendanceDayId, AttendanceRecord, DayKeyResponse, ResolveSelfSignRequest, SelfSignId,
    SelfSignRecord, SelfSignRequest, SetDayKeyRequest,
};

use super::service::SelfSignService;
use crate::middleware::auth::{AuthStudent, AuthTeacher};
use crate::middleware::client_ip::ClientIp;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Set the day's self-sign key
#[utoipa::path(
    put,
    path = "/api/attendance/days/{day_id}/self-sign-key",
    params(("day_id" = AttendanceDayId, Path, description = "Attendance day ID")),
    request_body = SetDayKeyRequest,
    responses(
        (status = 204, description = "Key set"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Attendance day not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance Self-Sign"
)]
#[instrument(skip(state, auth, dto))]
pub async fn set_day_key(
    State(state): State<AppState>,
    auth: AuthTeacher,
    Path(day_id): Path<AttendanceDayId>,
    ValidatedJson(dto): ValidatedJson<SetDayKeyRequest>,
) -> Result<StatusCode, AppError> {
    auth.teacher_id()?;
    SelfSignService::set_day_key(&state, day_id, &dto.key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove the day's self-sign key
#[utoipa::path(
    delete,
    path = "/api/attendance/days/{day_id}/self-sign-key",
    params(("day_id" = AttendanceDayId, Path, description = "Attendance day ID")),
    responses(
        (status = 204, description = "Key removed"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Attendance day not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance Self-Sign"
)]
#[instrument(skip(state, auth))]
pub async fn delete_day_key(
    State(state): State<AppState>,
    auth: AuthTeacher,
    Path(day_id): Path<AttendanceDayId>,
) -> Result<StatusCode, AppError> {
    auth.teacher_id()?;
    SelfSignService::delete_day_key(&state, day_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Generate a random self-sign key for the day
#[utoipa::path(
    post,
    path = "/api/attendance/days/{day_id}/self-sign-key/generate",
    params(("day_id" = AttendanceDayId, Path, description = "Attendance day ID")),
    responses(
        (status = 200, description = "Generated key", body = DayKeyResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Attendance day not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance Self-Sign"
)]
#[instrument(skip(state, auth))]
pub async fn generate_day_key(
    State(state): State<AppState>,
    auth: AuthTeacher,
    Path(day_id): Path<AttendanceDayId>,
) -> Result<Json<DayKeyResponse>, AppError> {
    auth.teacher_id()?;
    let response = SelfSignService::generate_day_key(&state, day_id).await?;
    Ok(Json(response))
}

/// List pending self-signs for a day
#[utoipa::path(
    get,
    path = "/api/attendance/days/{day_id}/self-signs",
    params(("day_id" = AttendanceDayId, Path, description = "Attendance day ID")),
    responses(
        (
            status = 200,
            description = "Pending self-signs, oldest first",
            body = Vec<SelfSignRecord>
        ),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Attendance day not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance Self-Sign"
)]
#[instrument(skip(state, auth))]
pub async fn list_pending(
    State(state): State<AppState>,
    auth: AuthTeacher,
    Path(day_id): Path<AttendanceDayId>,
) -> Result<Json<Vec<SelfSignRecord>>, AppError> {
    auth.teacher_id()?;
    let pending = SelfSignService::list_pending(&state, day_id).await?;
    Ok(Json(pending))
}

/// Sign in to a day as present
#[utoipa::path(
    post,
    path = "/api/attendance/days/{day_id}/self-sign",
    params(("day_id" = AttendanceDayId, Path, description = "Attendance day ID")),
    request_body = SelfSignRequest,
    responses(
        (
            status = 200,
            description = "Self-sign recorded (or already recorded)",
            body = SelfSignRecord
        ),
        (status = 400, description = "Key does not match", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Attendance day not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance Self-Sign"
)]
#[instrument(skip(state, auth, dto))]
pub async fn submit_self_sign(
    State(state): State<AppState>,
    auth: AuthStudent,
    ClientIp(client_ip): ClientIp,
    Path(day_id): Path<AttendanceDayId>,
    ValidatedJson(dto): ValidatedJson<SelfSignRequest>,
) -> Result<Json<SelfSignRecord>, AppError> {
    let student_id = auth.student_id()?;
    let record =
        SelfSignService::submit_self_sign(&state, day_id, &dto.key, student_id, &client_ip)
            .await?;
    Ok(Json(record))
}

/// Accept a pending self-sign as an attendance record
#[utoipa::path(
    post,
    path = "/api/attendance/self-signs/{id}/resolve",
    params(("id" = SelfSignId, Path, description = "Self-sign ID")),
    request_body = ResolveSelfSignRequest,
    responses(
        (status = 200, description = "Attendance record created", body = AttendanceRecord),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Self-sign not found", body = ErrorResponse),
        (status = 422, description = "Attendance value not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance Self-Sign"
)]
#[instrument(skip(state, auth, dto))]
pub async fn resolve(
    State(state): State<AppState>,
    auth: AuthTeacher,
    ClientIp(client_ip): ClientIp,
    Path(id): Path<SelfSignId>,
    ValidatedJson(dto): ValidatedJson<ResolveSelfSignRequest>,
) -> Result<Json<AttendanceRecord>, AppError> {
    let teacher_id = auth.teacher_id()?;
    let record =
        SelfSignService::resolve(&state, id, dto.attendance_value_id, &client_ip).await?;
    tracing::debug!(teacher_id = %teacher_id, "Self-sign resolved by teacher");
    Ok(Json(record))
}
