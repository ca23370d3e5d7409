use axum_extra::extract::CookieJar;
use tracing::{debug, instrument};

use classmark_auth::{STUDENT_REFRESH_COOKIE, TEACHER_REFRESH_COOKIE};
use classmark_core::AppError;
use classmark_models::AccessTokenResponse;

use super::model::PresentedSession;
use crate::errors::AuthError;
use crate::modules::student_auth::service::StudentAuthService;
use crate::modules::teacher_auth::service::TeacherAuthService;
use crate::state::AppState;

/// Routes refresh and logout to whichever principal's cookie came in.
pub struct SessionService;

impl SessionService {
    /// The one refresh cookie on the request. None, or one of each, is
    /// [`AuthError::InvalidCredentials`].
    pub fn presented(jar: &CookieJar) -> Result<PresentedSession, AuthError> {
        let teacher = jar.get(TEACHER_REFRESH_COOKIE).map(|c| c.value().to_string());
        let student = jar.get(STUDENT_REFRESH_COOKIE).map(|c| c.value().to_string());

        match (teacher, student) {
            (Some(value), None) => Ok(PresentedSession::Teacher(value)),
            (None, Some(value)) => Ok(PresentedSession::Student(value)),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    /// Refreshes the presented session. A rotated teacher token comes back
    /// in the returned jar.
    #[instrument(skip(state, jar, user_agent))]
    pub async fn refresh(
        state: &AppState,
        jar: CookieJar,
        user_agent: Option<&str>,
    ) -> Result<(CookieJar, AccessTokenResponse), (CookieJar, AppError)> {
        let policy = state.cookie_policy();

        match Self::presented(&jar) {
            Ok(PresentedSession::Teacher(value)) => {
                match TeacherAuthService::refresh(state, &value, user_agent).await {
                    Ok(session) => Ok((jar.add(session.refresh_cookie), session.access)),
                    Err(e) => Err((clear_if_rejected(jar, TEACHER_REFRESH_COOKIE, &e, state), e)),
                }
            }
            Ok(PresentedSession::Student(value)) => {
                match StudentAuthService::refresh(state, &value).await {
                    Ok(access) => Ok((jar, access)),
                    Err(e) => Err((clear_if_rejected(jar, STUDENT_REFRESH_COOKIE, &e, state), e)),
                }
            }
            Err(e) => {
                debug!("Refresh without exactly one refresh cookie");
                let jar = jar
                    .add(policy.removal_cookie(TEACHER_REFRESH_COOKIE))
                    .add(policy.removal_cookie(STUDENT_REFRESH_COOKIE));
                Err((jar, AppError::from_http(e)))
            }
        }
    }

    /// Revokes whatever refresh tokens came in and clears both cookies.
    #[instrument(skip(state, jar))]
    pub async fn logout(state: &AppState, jar: CookieJar) -> CookieJar {
        if let Some(cookie) = jar.get(TEACHER_REFRESH_COOKIE) {
            TeacherAuthService::logout(state, cookie.value()).await;
        }
        if let Some(cookie) = jar.get(STUDENT_REFRESH_COOKIE) {
            StudentAuthService::logout(state, cookie.value()).await;
        }

        let policy = state.cookie_policy();
        jar.add(policy.removal_cookie(TEACHER_REFRESH_COOKIE))
            .add(policy.removal_cookie(STUDENT_REFRESH_COOKIE))
    }
}

/// A cookie the server refused is useless to keep; anything else (a
/// database outage, say) leaves it in place for a retry.
fn clear_if_rejected(
    jar: CookieJar,
    name: &'static str,
    error: &AppError,
    state: &AppState,
) -> CookieJar {
    if error.status == axum::http::StatusCode::UNAUTHORIZED {
        jar.add(state.cookie_policy().removal_cookie(name))
    } else {
        jar
    }
}
