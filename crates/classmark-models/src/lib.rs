//! # Classmark Models
//!
//! Rows and request/response DTOs shared between the HTTP layer, the
//! repositories and the CLI.
//!
//! - [`ids`]: typed UUID wrappers
//! - [`auth`]: login, refresh and password reset DTOs
//! - [`teachers`] / [`students`]: principal rows
//! - [`attendance`]: attendance days, self-sign submissions and records

pub mod attendance;
pub mod auth;
pub mod ids;
pub mod students;
pub mod teachers;

pub use attendance::{
    AttendanceDay, AttendanceRecord, DayKeyResponse, ResolveSelfSignRequest, SelfSignRecord,
    SelfSignRequest, SetDayKeyRequest,
};
pub use auth::{
    AccessTokenResponse, MessageResponse, PasswordResetConfirmRequest, PasswordResetRequest,
    StudentAccessRequest, StudentVerifyRequest, TeacherLoginRequest,
};
pub use ids::{
    AttendanceDayId, AttendanceRecordId, AttendanceValueId, SelfSignId, StudentId, TeacherId,
};
pub use students::Student;
pub use teachers::{Teacher, TeacherCredentials};
