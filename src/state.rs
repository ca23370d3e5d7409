use std::sync::Arc;

use sqlx::PgPool;

use classmark_auth::{CookiePolicy, PgTokenStore, TokenService};
use classmark_config::{CaptchaConfig, CorsConfig, EmailConfig, JwtConfig, SessionConfig};

use crate::repositories::{
    AttendanceRepository, PgAttendanceRepository, PgStudentRepository, PgTeacherRepository,
    StudentRepository, TeacherRepository,
};
use crate::utils::captcha::{CaptchaVerifier, build_captcha_verifier};
use crate::utils::email::{EmailQueue, build_notifier};

#[derive(Clone)]
pub struct AppState {
    pub jwt_config: JwtConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
    pub session_config: SessionConfig,
    pub tokens: TokenService,
    pub teachers: Arc<dyn TeacherRepository>,
    pub students: Arc<dyn StudentRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
    pub email_queue: EmailQueue,
    pub captcha: Arc<dyn CaptchaVerifier>,
}

impl AppState {
    pub fn cookie_policy(&self) -> CookiePolicy {
        CookiePolicy::new(self.session_config.cookie_secure)
    }
}

/// Builds the production state on top of `db` and starts the email worker.
pub fn init_app_state(db: PgPool) -> AppState {
    let email_config = EmailConfig::from_env();
    let (email_queue, _worker) =
        EmailQueue::start(email_config.queue_capacity, build_notifier(&email_config));

    AppState {
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        session_config: SessionConfig::from_env(),
        tokens: TokenService::new(Arc::new(PgTokenStore::new(db.clone()))),
        teachers: Arc::new(PgTeacherRepository::new(db.clone())),
        students: Arc::new(PgStudentRepository::new(db.clone())),
        attendance: Arc::new(PgAttendanceRepository::new(db)),
        email_queue,
        captcha: build_captcha_verifier(&CaptchaConfig::from_env()),
        email_config,
    }
}

/// State wired to in-memory stores, for tests that should not need Postgres.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use classmark_auth::{InMemoryTokenStore, TokenService};
    use classmark_config::{CorsConfig, EmailConfig, JwtConfig, SessionConfig};

    use super::AppState;
    use crate::repositories::{
        InMemoryAttendanceRepository, InMemoryStudentRepository, InMemoryTeacherRepository,
    };
    use crate::utils::captcha::{CaptchaVerifier, DisabledCaptcha};
    use crate::utils::email::{EmailQueue, OutgoingEmail};

    pub const TEST_FRONTEND_URL: &str = "http://frontend.test";

    pub struct TestContext {
        pub state: AppState,
        pub token_store: Arc<InMemoryTokenStore>,
        pub teachers: Arc<InMemoryTeacherRepository>,
        pub students: Arc<InMemoryStudentRepository>,
        pub attendance: Arc<InMemoryAttendanceRepository>,
        /// Everything the flows queued; no worker drains it.
        pub outbox: mpsc::Receiver<OutgoingEmail>,
    }

    impl TestContext {
        pub fn new() -> Self {
            Self::with_captcha(Arc::new(DisabledCaptcha))
        }

        pub fn with_captcha(captcha: Arc<dyn CaptchaVerifier>) -> Self {
            let token_store = Arc::new(InMemoryTokenStore::new());
            let teachers = Arc::new(InMemoryTeacherRepository::new());
            let students = Arc::new(InMemoryStudentRepository::new());
            let attendance = Arc::new(InMemoryAttendanceRepository::new());
            let (email_queue, outbox) = EmailQueue::channel(16);

            let state = AppState {
                jwt_config: JwtConfig {
                    secret: "test-secret-key-at-least-32-characters-long".to_string(),
                    access_token_expiry: 900,
                },
                email_config: EmailConfig {
                    enabled: false,
                    smtp_host: "localhost".to_string(),
                    smtp_port: 1025,
                    smtp_username: String::new(),
                    smtp_password: String::new(),
                    from_email: "noreply@classmark.test".to_string(),
                    from_name: "Classmark".to_string(),
                    frontend_url: TEST_FRONTEND_URL.to_string(),
                    queue_capacity: 16,
                },
                cors_config: CorsConfig {
                    allowed_origins: vec![TEST_FRONTEND_URL.to_string()],
                },
                session_config: SessionConfig::default(),
                tokens: TokenService::new(token_store.clone()),
                teachers: teachers.clone(),
                students: students.clone(),
                attendance: attendance.clone(),
                email_queue,
                captcha,
            };

            Self {
                state,
                token_store,
                teachers,
                students,
                attendance,
                outbox,
            }
        }

        /// Removes and returns every queued email.
        pub fn take_emails(&mut self) -> Vec<OutgoingEmail> {
            let mut emails = Vec::new();
            while let Ok(email) = self.outbox.try_recv() {
                emails.push(email);
            }
            emails
        }
    }

    impl Default for TestContext {
        fn default() -> Self {
            Self::new()
        }
    }
}
