use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use classmark_auth::{
    IssueOptions, PrincipalKind, STUDENT_REFRESH_COOKIE, ScopedTokens, StudentTokenKind, Token,
    UniquenessPolicy, create_access_token, unwrap_from_transport,
};
use classmark_core::AppError;
use classmark_models::{
    AccessTokenResponse, Student, StudentAccessRequest, StudentId, StudentVerifyRequest,
};

use crate::errors::AuthError;
use crate::metrics::{track_login_failure, track_login_success, track_session_refreshed};
use crate::modules::session::model::{IssuedSession, expires_after};
use crate::state::AppState;
use crate::utils::email::templates;

const KIND: &str = "student";

pub struct StudentAuthService;

impl StudentAuthService {
    fn tokens(state: &AppState) -> ScopedTokens<StudentTokenKind> {
        state.tokens.scoped()
    }

    fn access_token(
        state: &AppState,
        student_id: StudentId,
    ) -> Result<AccessTokenResponse, AppError> {
        let token = create_access_token(
            student_id.into_inner(),
            PrincipalKind::Student,
            &state.jwt_config,
        )?;
        Ok(AccessTokenResponse::bearer(token, state.jwt_config.access_token_expiry))
    }

    /// The student a token is keyed to, if they still exist.
    async fn owner(state: &AppState, token: &Token) -> Result<Student, AppError> {
        let student_id: StudentId = token
            .key
            .parse()
            .map_err(|_| AppError::from_http(AuthError::InvalidCredentials))?;

        state
            .students
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| AppError::from_http(AuthError::InvalidCredentials))
    }

    async fn current_session(state: &AppState, transported: &str) -> Result<Token, AppError> {
        let (value, _) = unwrap_from_transport(transported);
        Self::tokens(state)
            .validate(value, StudentTokenKind::Access, None, false)
            .await
            .map_err(AppError::from_http)
    }

    /// Emails a single-use login link. Answers the same way for unknown
    /// student numbers.
    #[instrument(skip(state, dto), fields(student_number = %dto.student_number))]
    pub async fn request_access(
        state: &AppState,
        dto: StudentAccessRequest,
        client_ip: &str,
    ) -> Result<(), AppError> {
        if !state
            .captcha
            .verify(dto.captcha_token.as_deref(), Some(client_ip))
            .await
        {
            track_login_failure(KIND, "captcha");
            return Err(AppError::from_http(AuthError::CaptchaFailed));
        }

        if let Err(e) = Self::send_login_link(state, &dto.student_number).await {
            warn!(error = ?e.error, "Student access request could not be completed");
        }

        Ok(())
    }

    async fn send_login_link(state: &AppState, student_number: &str) -> Result<(), AppError> {
        let Some(student) = state.students.find_by_number(student_number).await? else {
            debug!("Access requested for an unknown student number");
            return Ok(());
        };

        let ttl_minutes = state.session_config.student_login_ttl_minutes;
        let options = IssueOptions::new(
            UniquenessPolicy::DeleteExisting,
            state.session_config.token_length_bytes,
            ttl_minutes,
        );
        let value = Self::tokens(state)
            .issue(StudentTokenKind::Login, &student.id.to_string(), &options)
            .await
            .map_err(AppError::from_http)?;

        let link = reqwest::Url::parse_with_params(
            &format!(
                "{}/student/verify",
                state.email_config.frontend_url.trim_end_matches('/')
            ),
            &[("token", value.as_str())],
        )
        .map_err(|e| AppError::internal_error(format!("Invalid frontend URL: {}", e)))?;

        state.email_queue.enqueue(templates::student_login(
            &student.email,
            &student.display_name(),
            link.as_str(),
            ttl_minutes,
        ))?;

        info!(student_id = %student.id, "Student login link queued");
        Ok(())
    }

    /// Trades a login link token for a session. `duration_seconds == 0` asks
    /// for a session that ends with the browser.
    #[instrument(skip(state, dto, user_agent), fields(duration_seconds = dto.duration_seconds))]
    pub async fn verify(
        state: &AppState,
        dto: StudentVerifyRequest,
        user_agent: Option<&str>,
    ) -> Result<IssuedSession, AppError> {
        let login = match Self::tokens(state)
            .validate(&dto.token, StudentTokenKind::Login, None, true)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                track_login_failure(KIND, e.reason());
                return Err(AppError::from_http(e));
            }
        };
        let student = Self::owner(state, &login).await?;

        let session_only = dto.duration_seconds == 0;
        let ttl_minutes = if session_only {
            state.session_config.student_session_ttl_minutes
        } else {
            i64::try_from(dto.duration_seconds.div_ceil(60)).map_err(|_| {
                AppError::bad_request(anyhow::anyhow!("duration_seconds is too large"))
            })?
        };

        // Several devices may each hold a session.
        let mut options = IssueOptions::new(
            UniquenessPolicy::NoCheck,
            state.session_config.token_length_bytes,
            ttl_minutes,
        );
        if let Some(user_agent) = user_agent {
            options = options.with_tag(user_agent);
        }
        let value = Self::tokens(state)
            .issue(StudentTokenKind::Access, &student.id.to_string(), &options)
            .await
            .map_err(AppError::from_http)?;

        let refresh_cookie = state.cookie_policy().refresh_cookie(
            STUDENT_REFRESH_COOKIE,
            &value,
            session_only,
            expires_after(Utc::now(), ttl_minutes),
        );

        track_login_success(KIND);
        info!(student_id = %student.id, session_only, "Student signed in");

        Ok(IssuedSession {
            access: Self::access_token(state, student.id)?,
            refresh_cookie,
        })
    }

    /// Mints a fresh access token. The refresh token itself is left alone.
    #[instrument(skip(state, transported))]
    pub async fn refresh(
        state: &AppState,
        transported: &str,
    ) -> Result<AccessTokenResponse, AppError> {
        let token = Self::current_session(state, transported).await?;
        let student = Self::owner(state, &token).await?;

        track_session_refreshed(KIND);
        debug!(student_id = %student.id, "Student session refreshed");

        Self::access_token(state, student.id)
    }

    /// Revokes every session of the student holding `transported`.
    #[instrument(skip(state, transported))]
    pub async fn forget_all_sessions(state: &AppState, transported: &str) -> Result<u64, AppError> {
        let token = Self::current_session(state, transported).await?;

        let revoked = Self::tokens(state)
            .revoke_all_by_key(StudentTokenKind::Access, &token.key)
            .await
            .map_err(AppError::from_http)?;

        info!(student_id = %token.key, revoked, "Student sessions forgotten");
        Ok(revoked)
    }

    /// Revokes the presented session if it is still around. Never fails.
    #[instrument(skip(state, transported))]
    pub async fn logout(state: &AppState, transported: &str) {
        let (value, _) = unwrap_from_transport(transported);

        match Self::tokens(state)
            .revoke(value, StudentTokenKind::Access)
            .await
        {
            Ok(true) => info!("Student logged out"),
            Ok(false) => debug!("Student logout with an unknown session token"),
            Err(e) => warn!(error = %e, "Failed to revoke student session token"),
        }
    }
}
