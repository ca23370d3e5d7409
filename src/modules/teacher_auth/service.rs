use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use classmark_auth::{
    IssueOptions, PrincipalKind, ScopedTokens, TEACHER_REFRESH_COOKIE, TeacherTokenKind,
    TokenError, UniquenessPolicy, create_access_token, unwrap_from_transport,
};
use classmark_core::{AppError, dummy_password_hash, hash_password, verify_password};
use classmark_models::{
    AccessTokenResponse, PasswordResetConfirmRequest, PasswordResetRequest, TeacherId,
    TeacherLoginRequest,
};

use crate::errors::AuthError;
use crate::metrics::{track_login_failure, track_login_success, track_session_refreshed};
use crate::modules::session::model::{IssuedSession, expires_after};
use crate::state::AppState;
use crate::utils::email::templates;

const KIND: &str = "teacher";

pub struct TeacherAuthService;

impl TeacherAuthService {
    fn tokens(state: &AppState) -> ScopedTokens<TeacherTokenKind> {
        state.tokens.scoped()
    }

    async fn check_captcha(
        state: &AppState,
        captcha_token: Option<&str>,
        client_ip: &str,
    ) -> Result<(), AppError> {
        if state.captcha.verify(captcha_token, Some(client_ip)).await {
            Ok(())
        } else {
            Err(AppError::from_http(AuthError::CaptchaFailed))
        }
    }

    /// Issues a refresh token (replacing any the teacher already holds) and
    /// the access token that goes with it.
    async fn start_session(
        state: &AppState,
        teacher_id: TeacherId,
        session_only: bool,
        user_agent: Option<&str>,
    ) -> Result<IssuedSession, AppError> {
        let config = &state.session_config;
        let mut options = IssueOptions::new(
            UniquenessPolicy::DeleteExisting,
            config.token_length_bytes,
            config.teacher_refresh_ttl_minutes,
        );
        if let Some(user_agent) = user_agent {
            options = options.with_tag(user_agent);
        }

        let value = Self::tokens(state)
            .issue(TeacherTokenKind::Refresh, &teacher_id.to_string(), &options)
            .await
            .map_err(AppError::from_http)?;

        let refresh_cookie = state.cookie_policy().refresh_cookie(
            TEACHER_REFRESH_COOKIE,
            &value,
            session_only,
            expires_after(Utc::now(), config.teacher_refresh_ttl_minutes),
        );

        let access_token = create_access_token(
            teacher_id.into_inner(),
            PrincipalKind::Teacher,
            &state.jwt_config,
        )?;

        Ok(IssuedSession {
            access: AccessTokenResponse::bearer(access_token, state.jwt_config.access_token_expiry),
            refresh_cookie,
        })
    }

    #[instrument(skip(state, dto, user_agent), fields(email = %dto.email))]
    pub async fn login(
        state: &AppState,
        dto: TeacherLoginRequest,
        client_ip: &str,
        user_agent: Option<&str>,
    ) -> Result<IssuedSession, AppError> {
        if let Err(e) = Self::check_captcha(state, dto.captcha_token.as_deref(), client_ip).await {
            track_login_failure(KIND, "captcha");
            return Err(e);
        }

        let teacher = state.teachers.find_by_email(&dto.email).await?;

        // Unknown emails still pay for one bcrypt verification.
        let hash = teacher
            .as_ref()
            .map(|t| t.password.as_str())
            .unwrap_or_else(|| dummy_password_hash());
        let password_ok = verify_password(&dto.password, hash)?;

        let teacher = match teacher {
            Some(teacher) if password_ok => teacher,
            _ => {
                track_login_failure(KIND, "invalid_credentials");
                return Err(AppError::from_http(AuthError::InvalidLogin));
            }
        };

        let session = Self::start_session(state, teacher.id, !dto.remember_me, user_agent).await?;

        track_login_success(KIND);
        info!(teacher_id = %teacher.id, remember_me = dto.remember_me, "Teacher logged in");

        Ok(session)
    }

    /// Consumes the presented refresh token and rotates it, keeping its
    /// session-only marker.
    #[instrument(skip(state, transported, user_agent))]
    pub async fn refresh(
        state: &AppState,
        transported: &str,
        user_agent: Option<&str>,
    ) -> Result<IssuedSession, AppError> {
        let (value, session_only) = unwrap_from_transport(transported);

        let token = Self::tokens(state)
            .validate(value, TeacherTokenKind::Refresh, None, true)
            .await
            .map_err(AppError::from_http)?;

        let teacher_id: TeacherId = token
            .key
            .parse()
            .map_err(|_| AppError::from_http(AuthError::InvalidCredentials))?;

        if state.teachers.find_by_id(teacher_id).await?.is_none() {
            warn!(teacher_id = %teacher_id, "Refresh token for a teacher that no longer exists");
            return Err(AppError::from_http(AuthError::InvalidCredentials));
        }

        let session = Self::start_session(state, teacher_id, session_only, user_agent).await?;

        track_session_refreshed(KIND);
        debug!(teacher_id = %teacher_id, session_only, "Teacher session refreshed");

        Ok(session)
    }

    /// Revokes the presented refresh token if it is still around. Never fails.
    #[instrument(skip(state, transported))]
    pub async fn logout(state: &AppState, transported: &str) {
        let (value, _) = unwrap_from_transport(transported);

        match Self::tokens(state)
            .revoke(value, TeacherTokenKind::Refresh)
            .await
        {
            Ok(true) => info!("Teacher logged out"),
            Ok(false) => debug!("Teacher logout with an unknown refresh token"),
            Err(e) => warn!(error = %e, "Failed to revoke teacher refresh token"),
        }
    }

    /// Answers the same way whether or not the email belongs to a teacher.
    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn request_password_reset(
        state: &AppState,
        dto: PasswordResetRequest,
        client_ip: &str,
    ) -> Result<(), AppError> {
        Self::check_captcha(state, dto.captcha_token.as_deref(), client_ip).await?;

        if let Err(e) = Self::send_password_reset(state, &dto.email).await {
            warn!(error = ?e.error, "Password reset request could not be completed");
        }

        Ok(())
    }

    async fn send_password_reset(state: &AppState, email: &str) -> Result<(), AppError> {
        let Some(teacher) = state.teachers.find_by_email(email).await? else {
            debug!("Password reset requested for an unknown email");
            return Ok(());
        };

        let ttl_minutes = state.session_config.teacher_reset_ttl_minutes;
        let options = IssueOptions::new(
            UniquenessPolicy::DeleteExisting,
            state.session_config.token_length_bytes,
            ttl_minutes,
        );
        let value = Self::tokens(state)
            .issue(TeacherTokenKind::PasswordReset, &teacher.id.to_string(), &options)
            .await
            .map_err(AppError::from_http)?;

        let link = reqwest::Url::parse_with_params(
            &format!(
                "{}/teacher/reset-password",
                state.email_config.frontend_url.trim_end_matches('/')
            ),
            &[("token", value.as_str()), ("email", teacher.email.as_str())],
        )
        .map_err(|e| AppError::internal_error(format!("Invalid frontend URL: {}", e)))?;

        state.email_queue.enqueue(templates::password_reset(
            &teacher.email,
            &teacher.display_name(),
            link.as_str(),
            ttl_minutes,
        ))?;

        info!(teacher_id = %teacher.id, "Password reset email queued");
        Ok(())
    }

    /// Every client-side failure comes back as
    /// [`AuthError::InvalidPasswordResetData`]; the token is consumed either way.
    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn set_new_password(
        state: &AppState,
        dto: PasswordResetConfirmRequest,
    ) -> Result<(), AppError> {
        let teacher = state.teachers.find_by_email(&dto.email).await?;

        // No teacher id is empty, so an unknown email can never own the token.
        let expected_key = teacher
            .as_ref()
            .map(|t| t.id.to_string())
            .unwrap_or_default();

        let validated = Self::tokens(state)
            .validate(
                &dto.token,
                TeacherTokenKind::PasswordReset,
                Some(&expected_key),
                true,
            )
            .await;

        let teacher = match (validated, teacher) {
            (Ok(_), Some(teacher)) => teacher,
            (Err(e @ TokenError::Storage(_)), _) => return Err(AppError::from_http(e)),
            (Err(e), _) => {
                debug!(reason = e.reason(), "Password reset token rejected");
                return Err(AppError::from_http(AuthError::InvalidPasswordResetData));
            }
            (Ok(_), None) => return Err(AppError::from_http(AuthError::InvalidPasswordResetData)),
        };

        let password_hash = hash_password(&dto.new_password)?;
        state
            .teachers
            .update_password(teacher.id, &password_hash)
            .await?;

        let revoked = Self::tokens(state)
            .revoke_all_by_key(TeacherTokenKind::Refresh, &teacher.id.to_string())
            .await
            .map_err(AppError::from_http)?;

        if let Err(e) = state
            .email_queue
            .enqueue(templates::password_changed(&teacher.email, &teacher.display_name()))
        {
            warn!(error = %e, "Password change confirmation not queued");
        }

        info!(teacher_id = %teacher.id, revoked_sessions = revoked, "Teacher password reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use classmark_auth::{SESSION_ONLY_PREFIX, TokenType};

    use crate::state::testing::TestContext;

    const PASSWORD: &str = "correct-horse";

    async fn seed_teacher(ctx: &TestContext) -> TeacherId {
        use crate::repositories::TeacherRepository;

        let hash = hash_password(PASSWORD).unwrap();
        ctx.teachers
            .create("Ada", "Lovelace", "ada@school.edu", &hash)
            .await
            .unwrap()
            .id
    }

    fn login_request(password: &str, remember_me: bool) -> TeacherLoginRequest {
        TeacherLoginRequest {
            email: "ada@school.edu".to_string(),
            password: password.to_string(),
            remember_me,
            captcha_token: None,
        }
    }

    async fn sign_in(
        ctx: &TestContext,
        remember_me: bool,
        user_agent: Option<&str>,
    ) -> IssuedSession {
        TeacherAuthService::login(
            &ctx.state,
            login_request(PASSWORD, remember_me),
            "10.0.0.1",
            user_agent,
        )
        .await
        .unwrap()
    }

    fn refresh_values(ctx: &TestContext) -> Vec<String> {
        ctx.token_store
            .all()
            .into_iter()
            .filter(|t| t.token_type == TokenType::from(TeacherTokenKind::Refresh))
            .map(|t| t.value)
            .collect()
    }

    #[tokio::test]
    async fn test_login_issues_single_refresh_token() {
        let ctx = TestContext::new();
        seed_teacher(&ctx).await;

        let first = sign_in(&ctx, true, None).await;
        let second = sign_in(&ctx, true, None).await;

        let values = refresh_values(&ctx);
        assert_eq!(values.len(), 1);
        assert_eq!(second.refresh_cookie.value(), values[0]);
        assert_ne!(first.refresh_cookie.value(), second.refresh_cookie.value());
        assert_eq!(second.access.token_type, "Bearer");
    }

    #[tokio::test]
    async fn test_login_without_remember_me_is_session_only() {
        let ctx = TestContext::new();
        seed_teacher(&ctx).await;

        let session = sign_in(&ctx, false, Some("Firefox")).await;

        assert!(session.refresh_cookie.value().starts_with(SESSION_ONLY_PREFIX));
        assert!(session.refresh_cookie.expires().is_none());
        assert_eq!(ctx.token_store.all()[0].tag.as_deref(), Some("Firefox"));
    }

    #[tokio::test]
    async fn test_login_wrong_password_and_unknown_email_look_alike() {
        let ctx = TestContext::new();
        seed_teacher(&ctx).await;

        let wrong =
            TeacherAuthService::login(&ctx.state, login_request("nope", true), "10.0.0.1", None)
                .await
                .unwrap_err();

        let mut unknown = login_request(PASSWORD, true);
        unknown.email = "ghost@school.edu".to_string();
        let missing = TeacherAuthService::login(&ctx.state, unknown, "10.0.0.1", None)
            .await
            .unwrap_err();

        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
        assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.error.to_string(), missing.error.to_string());
        assert!(ctx.token_store.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_keeps_scope() {
        let ctx = TestContext::new();
        seed_teacher(&ctx).await;
        let session = sign_in(&ctx, false, None).await;
        let old = session.refresh_cookie.value().to_string();

        let rotated = TeacherAuthService::refresh(&ctx.state, &old, None).await.unwrap();
        assert!(rotated.refresh_cookie.value().starts_with(SESSION_ONLY_PREFIX));
        assert_ne!(rotated.refresh_cookie.value(), old);

        let err = TeacherAuthService::refresh(&ctx.state, &old, None).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(refresh_values(&ctx).len(), 1);
    }

    #[tokio::test]
    async fn test_logout_is_best_effort() {
        let ctx = TestContext::new();
        seed_teacher(&ctx).await;
        let session = sign_in(&ctx, true, None).await;

        TeacherAuthService::logout(&ctx.state, session.refresh_cookie.value()).await;
        TeacherAuthService::logout(&ctx.state, "never-issued").await;

        assert!(ctx.token_store.is_empty());
    }

    #[tokio::test]
    async fn test_password_reset_round_trip() {
        let mut ctx = TestContext::new();
        let teacher_id = seed_teacher(&ctx).await;
        sign_in(&ctx, true, None).await;

        TeacherAuthService::request_password_reset(
            &ctx.state,
            PasswordResetRequest {
                email: "ada@school.edu".to_string(),
                captcha_token: None,
            },
            "10.0.0.1",
        )
        .await
        .unwrap();

        let reset = ctx
            .token_store
            .all()
            .into_iter()
            .find(|t| t.token_type == TokenType::from(TeacherTokenKind::PasswordReset))
            .unwrap();
        let emails = ctx.take_emails();
        assert_eq!(emails.len(), 1);
        assert!(emails[0].html_body.contains(&reset.value));

        TeacherAuthService::set_new_password(
            &ctx.state,
            PasswordResetConfirmRequest {
                token: reset.value.clone(),
                email: "ada@school.edu".to_string(),
                new_password: "a-brand-new-password".to_string(),
            },
        )
        .await
        .unwrap();

        let stored = ctx.teachers.password_hash(teacher_id).unwrap();
        assert!(verify_password("a-brand-new-password", &stored).unwrap());
        assert!(ctx.token_store.is_empty());
        assert_eq!(ctx.take_emails()[0].subject, "Password Changed");
    }

    #[tokio::test]
    async fn test_reset_for_unknown_email_creates_nothing() {
        let mut ctx = TestContext::new();
        seed_teacher(&ctx).await;

        TeacherAuthService::request_password_reset(
            &ctx.state,
            PasswordResetRequest {
                email: "ghost@school.edu".to_string(),
                captcha_token: None,
            },
            "10.0.0.1",
        )
        .await
        .unwrap();

        assert!(ctx.token_store.is_empty());
        assert!(ctx.take_emails().is_empty());
    }

    #[tokio::test]
    async fn test_reset_with_wrong_email_consumes_token() {
        let ctx = TestContext::new();
        let teacher_id = seed_teacher(&ctx).await;
        let options = IssueOptions::new(UniquenessPolicy::DeleteExisting, 32, 60);
        let value = ctx
            .state
            .tokens
            .issue(TeacherTokenKind::PasswordReset.into(), &teacher_id.to_string(), &options)
            .await
            .unwrap();

        let err = TeacherAuthService::set_new_password(
            &ctx.state,
            PasswordResetConfirmRequest {
                token: value,
                email: "ghost@school.edu".to_string(),
                new_password: "a-brand-new-password".to_string(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.error.to_string(), "Invalid password reset data");
        assert!(ctx.token_store.is_empty());
    }
}
