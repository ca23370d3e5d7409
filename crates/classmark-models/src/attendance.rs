//! Attendance day, self-sign and attendance record models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{AttendanceDayId, AttendanceRecordId, AttendanceValueId, SelfSignId, StudentId};

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AttendanceDay {
    pub id: AttendanceDayId,
    pub date: NaiveDate,
    /// Shared key students present to self-sign; `None` closes self-signing.
    pub self_sign_key: Option<String>,
}

/// A student's check-in waiting for a teacher to verify it.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct SelfSignRecord {
    pub id: SelfSignId,
    pub day_id: AttendanceDayId,
    pub student_id: StudentId,
    pub created_at: DateTime<Utc>,
    pub ip: String,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: AttendanceRecordId,
    pub day_id: AttendanceDayId,
    pub student_id: StudentId,
    pub value_id: AttendanceValueId,
    pub self_signed_at: Option<DateTime<Utc>>,
    pub self_sign_ip: Option<String>,
    pub verification_time: DateTime<Utc>,
    pub verification_ip: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetDayKeyRequest {
    #[validate(length(min = 4, max = 64))]
    #[schema(example = "ABC123")]
    pub key: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SelfSignRequest {
    #[validate(length(min = 1, max = 64))]
    pub key: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ResolveSelfSignRequest {
    pub attendance_value_id: AttendanceValueId,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DayKeyResponse {
    pub day_id: AttendanceDayId,
    pub key: String,
}
