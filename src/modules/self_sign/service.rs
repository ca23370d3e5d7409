use chrono::Utc;
use tracing::{info, instrument, warn};

use classmark_auth::{IssueOptions, ScopedTokens, SelfSignTokenKind, UniquenessPolicy};
use classmark_core::AppError;
use classmark_models::{
    AttendanceDay, AttendanceDayId, AttendanceRecord, AttendanceValueId, DayKeyResponse,
    SelfSignId, SelfSignRecord, StudentId,
};

use crate::errors::SelfSignError;
use crate::metrics::track_self_sign_submitted;
use crate::repositories::{NewSelfSign, ResolveOutcome};
use crate::state::AppState;

/// Byte-wise comparison whose running time does not depend on where the
/// inputs first differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub struct SelfSignService;

impl SelfSignService {
    fn tokens(state: &AppState) -> ScopedTokens<SelfSignTokenKind> {
        state.tokens.scoped()
    }

    async fn day(state: &AppState, day_id: AttendanceDayId) -> Result<AttendanceDay, AppError> {
        state
            .attendance
            .find_day(day_id)
            .await?
            .ok_or_else(|| AppError::from_http(SelfSignError::DayNotFound))
    }

    async fn revoke_generated_keys(state: &AppState, day_id: AttendanceDayId) {
        if let Err(e) = Self::tokens(state)
            .revoke_all_by_key(SelfSignTokenKind::AttendanceSelfSign, &day_id.to_string())
            .await
        {
            warn!(day_id = %day_id, error = %e, "Failed to revoke generated self-sign keys");
        }
    }

    async fn store_key(
        state: &AppState,
        day_id: AttendanceDayId,
        key: Option<&str>,
    ) -> Result<(), AppError> {
        if state.attendance.set_day_key(day_id, key).await? {
            Ok(())
        } else {
            Err(AppError::from_http(SelfSignError::DayNotFound))
        }
    }

    /// Sets a key chosen by the teacher, replacing any generated one.
    #[instrument(skip(state, key))]
    pub async fn set_day_key(
        state: &AppState,
        day_id: AttendanceDayId,
        key: &str,
    ) -> Result<(), AppError> {
        Self::store_key(state, day_id, Some(key)).await?;
        Self::revoke_generated_keys(state, day_id).await;
        info!(day_id = %day_id, "Self-sign key set");
        Ok(())
    }

    /// Closes self-signing for the day.
    #[instrument(skip(state))]
    pub async fn delete_day_key(state: &AppState, day_id: AttendanceDayId) -> Result<(), AppError> {
        Self::store_key(state, day_id, None).await?;
        Self::revoke_generated_keys(state, day_id).await;
        info!(day_id = %day_id, "Self-sign key removed");
        Ok(())
    }

    /// Mints a short random key for the day and stores it as the day's key.
    #[instrument(skip(state))]
    pub async fn generate_day_key(
        state: &AppState,
        day_id: AttendanceDayId,
    ) -> Result<DayKeyResponse, AppError> {
        Self::day(state, day_id).await?;

        let options = IssueOptions::new(
            UniquenessPolicy::DeleteExisting,
            state.session_config.self_sign_key_length_bytes,
            state.session_config.self_sign_key_ttl_minutes,
        );
        let key = Self::tokens(state)
            .issue(
                SelfSignTokenKind::AttendanceSelfSign,
                &day_id.to_string(),
                &options,
            )
            .await
            .map_err(AppError::from_http)?;

        Self::store_key(state, day_id, Some(&key)).await?;
        info!(day_id = %day_id, "Self-sign key generated");

        Ok(DayKeyResponse { day_id, key })
    }

    /// Records that `student_id` says they are present. Submitting twice
    /// returns the first record.
    #[instrument(skip(state, key))]
    pub async fn submit_self_sign(
        state: &AppState,
        day_id: AttendanceDayId,
        key: &str,
        student_id: StudentId,
        source_ip: &str,
    ) -> Result<SelfSignRecord, AppError> {
        let day = Self::day(state, day_id).await?;

        let matches = day
            .self_sign_key
            .as_deref()
            .is_some_and(|expected| constant_time_eq(expected.as_bytes(), key.as_bytes()));
        if !matches {
            return Err(AppError::from_http(SelfSignError::KeyMismatch));
        }

        let record = state
            .attendance
            .insert_self_sign(NewSelfSign {
                day_id,
                student_id,
                created_at: Utc::now(),
                ip: source_ip.to_string(),
            })
            .await?;

        track_self_sign_submitted();
        info!(self_sign_id = %record.id, "Self-sign recorded");
        Ok(record)
    }

    #[instrument(skip(state))]
    pub async fn list_pending(
        state: &AppState,
        day_id: AttendanceDayId,
    ) -> Result<Vec<SelfSignRecord>, AppError> {
        Self::day(state, day_id).await?;
        Ok(state.attendance.list_self_signs(day_id).await?)
    }

    /// Turns a pending self-sign into an attendance record.
    #[instrument(skip(state))]
    pub async fn resolve(
        state: &AppState,
        self_sign_id: SelfSignId,
        value_id: AttendanceValueId,
        verifier_ip: &str,
    ) -> Result<AttendanceRecord, AppError> {
        let outcome = state
            .attendance
            .resolve_self_sign(self_sign_id, value_id, Utc::now(), verifier_ip)
            .await?;
        let record = match outcome {
            ResolveOutcome::Resolved(record) => record,
            ResolveOutcome::SelfSignMissing => {
                return Err(AppError::from_http(SelfSignError::SelfSignNotFound));
            }
            ResolveOutcome::UnknownValue => {
                warn!(%self_sign_id, %value_id, "Unknown attendance value");
                return Err(AppError::from_http(SelfSignError::UnknownAttendanceValue));
            }
        };

        info!(self_sign_id = %self_sign_id, record_id = %record.id, "Self-sign resolved");
        Ok(record)
    }
}
