use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::instrument;

use classmark_models::{
    AttendanceDay, AttendanceDayId, AttendanceRecord, AttendanceValueId, SelfSignId,
    SelfSignRecord,
};

use super::{AttendanceRepository, NewSelfSign, RepoResult, ResolveOutcome};

const SELF_SIGN_COLUMNS: &str = "id, day_id, student_id, created_at, ip";

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

#[derive(Clone)]
pub struct PgAttendanceRepository {
    db: PgPool,
}

impl PgAttendanceRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AttendanceRepository for PgAttendanceRepository {
    #[instrument(skip(self))]
    async fn find_day(&self, id: AttendanceDayId) -> RepoResult<Option<AttendanceDay>> {
        sqlx::query_as::<_, AttendanceDay>(
            "SELECT id, date, self_sign_key FROM attendance_days WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
    }

    #[instrument(skip(self))]
    async fn create_day(&self, date: NaiveDate) -> RepoResult<AttendanceDay> {
        sqlx::query_as::<_, AttendanceDay>(
            "INSERT INTO attendance_days (date) VALUES ($1) RETURNING id, date, self_sign_key",
        )
        .bind(date)
        .fetch_one(&self.db)
        .await
    }

    #[instrument(skip(self, key))]
    async fn set_day_key(&self, id: AttendanceDayId, key: Option<&str>) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE attendance_days SET self_sign_key = $1 WHERE id = $2")
            .bind(key)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn insert_self_sign(&self, record: NewSelfSign) -> RepoResult<SelfSignRecord> {
        let inserted = sqlx::query_as::<_, SelfSignRecord>(&format!(
            "INSERT INTO attendance_self_signs (day_id, student_id, created_at, ip)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (day_id, student_id) DO NOTHING
             RETURNING {SELF_SIGN_COLUMNS}"
        ))
        .bind(record.day_id)
        .bind(record.student_id)
        .bind(record.created_at)
        .bind(&record.ip)
        .fetch_optional(&self.db)
        .await?;

        match inserted {
            Some(row) => Ok(row),
            None => {
                sqlx::query_as::<_, SelfSignRecord>(&format!(
                    "SELECT {SELF_SIGN_COLUMNS} FROM attendance_self_signs
                     WHERE day_id = $1 AND student_id = $2"
                ))
                .bind(record.day_id)
                .bind(record.student_id)
                .fetch_one(&self.db)
                .await
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_self_signs(&self, day_id: AttendanceDayId) -> RepoResult<Vec<SelfSignRecord>> {
        sqlx::query_as::<_, SelfSignRecord>(&format!(
            "SELECT {SELF_SIGN_COLUMNS} FROM attendance_self_signs
             WHERE day_id = $1 ORDER BY created_at"
        ))
        .bind(day_id)
        .fetch_all(&self.db)
        .await
    }

    #[instrument(skip(self))]
    async fn resolve_self_sign(
        &self,
        id: SelfSignId,
        value_id: AttendanceValueId,
        verification_time: DateTime<Utc>,
        verification_ip: &str,
    ) -> RepoResult<ResolveOutcome> {
        let mut tx = self.db.begin().await?;

        let pending = sqlx::query_as::<_, SelfSignRecord>(&format!(
            "DELETE FROM attendance_self_signs WHERE id = $1 RETURNING {SELF_SIGN_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(pending) = pending else {
            return Ok(ResolveOutcome::SelfSignMissing);
        };

        // Dropping `tx` on these early returns rolls the delete back.
        let value_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM attendance_values WHERE id = $1)")
                .bind(value_id)
                .fetch_one(&mut *tx)
                .await?;
        if !value_exists {
            return Ok(ResolveOutcome::UnknownValue);
        }

        let inserted = sqlx::query_as::<_, AttendanceRecord>(
            "INSERT INTO attendance_records
                (day_id, student_id, value_id, self_signed_at, self_sign_ip,
                 verification_time, verification_ip)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (day_id, student_id) DO UPDATE SET
                value_id = EXCLUDED.value_id,
                self_signed_at = EXCLUDED.self_signed_at,
                self_sign_ip = EXCLUDED.self_sign_ip,
                verification_time = EXCLUDED.verification_time,
                verification_ip = EXCLUDED.verification_ip
             RETURNING id, day_id, student_id, value_id, self_signed_at, self_sign_ip,
                       verification_time, verification_ip",
        )
        .bind(pending.day_id)
        .bind(pending.student_id)
        .bind(value_id)
        .bind(pending.created_at)
        .bind(&pending.ip)
        .bind(verification_time)
        .bind(verification_ip)
        .fetch_one(&mut *tx)
        .await;

        let record = match inserted {
            Ok(record) => record,
            // The value was removed between the check and the insert.
            Err(e) if is_foreign_key_violation(&e) => return Ok(ResolveOutcome::UnknownValue),
            Err(e) => return Err(e),
        };

        tx.commit().await?;
        Ok(ResolveOutcome::Resolved(record))
    }
}
