//! Persistence for the rows the auth flows read and write.
//!
//! Principals and attendance data belong to the wider application; this
//! service only needs the narrow slice below. Each repository is a trait so
//! [`crate::state::AppState`] can be built from Postgres in production and from
//! in-memory maps in tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use classmark_models::{
    AttendanceDay, AttendanceDayId, AttendanceRecord, AttendanceValueId, SelfSignId,
    SelfSignRecord, Student, StudentId, Teacher, TeacherCredentials, TeacherId,
};

mod attendance;
#[cfg(any(test, feature = "test-utils"))]
mod memory;
mod students;
mod teachers;

pub use attendance::PgAttendanceRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{
    InMemoryAttendanceRepository, InMemoryStudentRepository, InMemoryTeacherRepository,
};
pub use students::PgStudentRepository;
pub use teachers::PgTeacherRepository;

pub type RepoResult<T> = Result<T, sqlx::Error>;

#[async_trait]
pub trait TeacherRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<TeacherCredentials>>;

    async fn find_by_id(&self, id: TeacherId) -> RepoResult<Option<Teacher>>;

    async fn update_password(&self, id: TeacherId, password_hash: &str) -> RepoResult<()>;

    async fn create(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: &str,
    ) -> RepoResult<Teacher>;
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn find_by_number(&self, student_number: &str) -> RepoResult<Option<Student>>;

    async fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>>;

    async fn create(
        &self,
        student_number: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> RepoResult<Student>;
}

/// A pending self-sign about to be written.
#[derive(Debug, Clone)]
pub struct NewSelfSign {
    pub day_id: AttendanceDayId,
    pub student_id: StudentId,
    pub created_at: DateTime<Utc>,
    pub ip: String,
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn find_day(&self, id: AttendanceDayId) -> RepoResult<Option<AttendanceDay>>;

    async fn create_day(&self, date: NaiveDate) -> RepoResult<AttendanceDay>;

    /// Returns `false` when the day does not exist.
    async fn set_day_key(&self, id: AttendanceDayId, key: Option<&str>) -> RepoResult<bool>;

    /// Inserts the self-sign unless one exists for `(day, student)`, and
    /// returns whichever row is stored.
    async fn insert_self_sign(&self, record: NewSelfSign) -> RepoResult<SelfSignRecord>;

    async fn list_self_signs(&self, day_id: AttendanceDayId) -> RepoResult<Vec<SelfSignRecord>>;

    /// Turns a pending self-sign into an attendance record and removes it, as
    /// one unit. Nothing changes unless the outcome is `Resolved`.
    async fn resolve_self_sign(
        &self,
        id: SelfSignId,
        value_id: AttendanceValueId,
        verification_time: DateTime<Utc>,
        verification_ip: &str,
    ) -> RepoResult<ResolveOutcome>;
}

#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    Resolved(AttendanceRecord),
    SelfSignMissing,
    /// `value_id` names no attendance value.
    UnknownValue,
}
