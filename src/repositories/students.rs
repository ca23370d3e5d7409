use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use classmark_models::{Student, StudentId};

use super::{RepoResult, StudentRepository};

const STUDENT_COLUMNS: &str = "id, student_number, first_name, last_name, email";

#[derive(Clone)]
pub struct PgStudentRepository {
    db: PgPool,
}

impl PgStudentRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StudentRepository for PgStudentRepository {
    #[instrument(skip(self))]
    async fn find_by_number(&self, student_number: &str) -> RepoResult<Option<Student>> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE student_number = $1"
        ))
        .bind(student_number)
        .fetch_optional(&self.db)
        .await
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
    }

    #[instrument(skip(self))]
    async fn create(
        &self,
        student_number: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> RepoResult<Student> {
        sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students (student_number, first_name, last_name, email)
             VALUES ($1, $2, $3, $4)
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(student_number)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_one(&self.db)
        .await
    }
}
