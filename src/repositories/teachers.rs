use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use classmark_models::{Teacher, TeacherCredentials, TeacherId};

use super::{RepoResult, TeacherRepository};

#[derive(Clone)]
pub struct PgTeacherRepository {
    db: PgPool,
}

impl PgTeacherRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TeacherRepository for PgTeacherRepository {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<TeacherCredentials>> {
        sqlx::query_as::<_, TeacherCredentials>(
            "SELECT id, first_name, last_name, email, password FROM teachers WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: TeacherId) -> RepoResult<Option<Teacher>> {
        sqlx::query_as::<_, Teacher>(
            "SELECT id, first_name, last_name, email FROM teachers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
    }

    #[instrument(skip(self, password_hash))]
    async fn update_password(&self, id: TeacherId, password_hash: &str) -> RepoResult<()> {
        sqlx::query("UPDATE teachers SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, password_hash))]
    async fn create(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: &str,
    ) -> RepoResult<Teacher> {
        sqlx::query_as::<_, Teacher>(
            "INSERT INTO teachers (first_name, last_name, email, password)
             VALUES ($1, $2, $3, $4)
             RETURNING id, first_name, last_name, email",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
    }
}
