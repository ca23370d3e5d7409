//! In-memory repositories for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use classmark_models::{
    AttendanceDay, AttendanceDayId, AttendanceRecord, AttendanceRecordId, AttendanceValueId,
    SelfSignId, SelfSignRecord, Student, StudentId, Teacher, TeacherCredentials, TeacherId,
};

use super::{
    AttendanceRepository, NewSelfSign, RepoResult, ResolveOutcome, StudentRepository,
    TeacherRepository,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct InMemoryTeacherRepository {
    teachers: Mutex<HashMap<TeacherId, TeacherCredentials>>,
}

impl InMemoryTeacherRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current bcrypt hash for `id`.
    pub fn password_hash(&self, id: TeacherId) -> Option<String> {
        lock(&self.teachers).get(&id).map(|t| t.password.clone())
    }
}

#[async_trait]
impl TeacherRepository for InMemoryTeacherRepository {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<TeacherCredentials>> {
        Ok(lock(&self.teachers)
            .values()
            .find(|t| t.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: TeacherId) -> RepoResult<Option<Teacher>> {
        Ok(lock(&self.teachers).get(&id).cloned().map(Teacher::from))
    }

    async fn update_password(&self, id: TeacherId, password_hash: &str) -> RepoResult<()> {
        if let Some(teacher) = lock(&self.teachers).get_mut(&id) {
            teacher.password = password_hash.to_string();
        }
        Ok(())
    }

    async fn create(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: &str,
    ) -> RepoResult<Teacher> {
        let credentials = TeacherCredentials {
            id: TeacherId::new(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            password: password_hash.to_string(),
        };
        lock(&self.teachers).insert(credentials.id, credentials.clone());
        Ok(credentials.into())
    }
}

#[derive(Default)]
pub struct InMemoryStudentRepository {
    students: Mutex<HashMap<StudentId, Student>>,
}

impl InMemoryStudentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudentRepository {
    async fn find_by_number(&self, student_number: &str) -> RepoResult<Option<Student>> {
        Ok(lock(&self.students)
            .values()
            .find(|s| s.student_number == student_number)
            .cloned())
    }

    async fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        Ok(lock(&self.students).get(&id).cloned())
    }

    async fn create(
        &self,
        student_number: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> RepoResult<Student> {
        let student = Student {
            id: StudentId::new(),
            student_number: student_number.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
        };
        lock(&self.students).insert(student.id, student.clone());
        Ok(student)
    }
}

#[derive(Default)]
struct AttendanceTables {
    days: HashMap<AttendanceDayId, AttendanceDay>,
    values: HashSet<AttendanceValueId>,
    self_signs: Vec<SelfSignRecord>,
    records: Vec<AttendanceRecord>,
}

/// Attendance tables behind one lock, so resolving is atomic.
#[derive(Default)]
pub struct InMemoryAttendanceRepository {
    tables: Mutex<AttendanceTables>,
}

impl InMemoryAttendanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        lock(&self.tables).records.clone()
    }

    /// Registers a new attendance value that records may refer to.
    pub fn add_value(&self) -> AttendanceValueId {
        let id = AttendanceValueId::new();
        lock(&self.tables).values.insert(id);
        id
    }
}

#[async_trait]
impl AttendanceRepository for InMemoryAttendanceRepository {
    async fn find_day(&self, id: AttendanceDayId) -> RepoResult<Option<AttendanceDay>> {
        Ok(lock(&self.tables).days.get(&id).cloned())
    }

    async fn create_day(&self, date: NaiveDate) -> RepoResult<AttendanceDay> {
        let day = AttendanceDay {
            id: AttendanceDayId::new(),
            date,
            self_sign_key: None,
        };
        lock(&self.tables).days.insert(day.id, day.clone());
        Ok(day)
    }

    async fn set_day_key(&self, id: AttendanceDayId, key: Option<&str>) -> RepoResult<bool> {
        match lock(&self.tables).days.get_mut(&id) {
            Some(day) => {
                day.self_sign_key = key.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_self_sign(&self, record: NewSelfSign) -> RepoResult<SelfSignRecord> {
        let mut tables = lock(&self.tables);
        if let Some(existing) = tables
            .self_signs
            .iter()
            .find(|s| s.day_id == record.day_id && s.student_id == record.student_id)
        {
            return Ok(existing.clone());
        }

        let row = SelfSignRecord {
            id: SelfSignId::new(),
            day_id: record.day_id,
            student_id: record.student_id,
            created_at: record.created_at,
            ip: record.ip,
        };
        tables.self_signs.push(row.clone());
        Ok(row)
    }

    async fn list_self_signs(&self, day_id: AttendanceDayId) -> RepoResult<Vec<SelfSignRecord>> {
        let mut rows: Vec<_> = lock(&self.tables)
            .self_signs
            .iter()
            .filter(|s| s.day_id == day_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.created_at);
        Ok(rows)
    }

    async fn resolve_self_sign(
        &self,
        id: SelfSignId,
        value_id: AttendanceValueId,
        verification_time: DateTime<Utc>,
        verification_ip: &str,
    ) -> RepoResult<ResolveOutcome> {
        let mut tables = lock(&self.tables);
        let Some(index) = tables.self_signs.iter().position(|s| s.id == id) else {
            return Ok(ResolveOutcome::SelfSignMissing);
        };
        if !tables.values.contains(&value_id) {
            return Ok(ResolveOutcome::UnknownValue);
        }
        let pending = tables.self_signs.remove(index);

        tables
            .records
            .retain(|r| !(r.day_id == pending.day_id && r.student_id == pending.student_id));
        let record = AttendanceRecord {
            id: AttendanceRecordId::new(),
            day_id: pending.day_id,
            student_id: pending.student_id,
            value_id,
            self_signed_at: Some(pending.created_at),
            self_sign_ip: Some(pending.ip),
            verification_time,
            verification_ip: verification_ip.to_string(),
        };
        tables.records.push(record.clone());
        Ok(ResolveOutcome::Resolved(record))
    }
}
