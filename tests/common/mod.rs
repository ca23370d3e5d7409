#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use classmark::classmark_auth::{PrincipalKind, create_access_token};
use classmark::classmark_core::hash_password;
use classmark::classmark_models::{Student, Teacher};
use classmark::repositories::{StudentRepository, TeacherRepository};
use classmark::router::init_router;
use classmark::state::testing::TestContext;

pub const TEACHER_EMAIL: &str = "ada@school.edu";
pub const TEACHER_PASSWORD: &str = "correct-horse-battery";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Every `Set-Cookie` header, verbatim.
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// The full `Set-Cookie` header for `name`.
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.set_cookies().into_iter().find(|c| c.starts_with(&prefix))
    }

    /// The `name=value` pair of the `Set-Cookie` for `name`, ready to send back.
    pub fn cookie_pair(&self, name: &str) -> Option<String> {
        self.set_cookie(name)
            .and_then(|c| c.split(';').next().map(str::to_string))
    }

    pub fn clears_cookie(&self, name: &str) -> bool {
        self.set_cookie(name)
            .is_some_and(|c| c.starts_with(&format!("{name}=deleted")))
    }
}

pub fn app(ctx: &TestContext) -> Router {
    init_router(ctx.state.clone())
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

pub struct ApiRequest {
    builder: axum::http::request::Builder,
}

impl ApiRequest {
    pub fn new(method: &str, uri: &str) -> Self {
        Self {
            builder: Request::builder().method(method).uri(uri),
        }
    }

    pub fn cookie(mut self, pair: &str) -> Self {
        self.builder = self.builder.header(header::COOKIE, pair);
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.builder = self
            .builder
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn json(self, body: Value) -> Request<Body> {
        self.builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    pub fn empty(self) -> Request<Body> {
        self.builder.body(Body::empty()).unwrap()
    }
}

pub async fn seed_teacher(ctx: &TestContext) -> Teacher {
    let hash = hash_password(TEACHER_PASSWORD).unwrap();
    ctx.teachers
        .create("Ada", "Lovelace", TEACHER_EMAIL, &hash)
        .await
        .unwrap()
}

pub async fn seed_student(ctx: &TestContext, number: &str) -> Student {
    ctx.students
        .create(number, "Grace", "Hopper", &format!("{}@school.edu", number.to_lowercase()))
        .await
        .unwrap()
}

pub fn teacher_access_token(ctx: &TestContext, teacher: &Teacher) -> String {
    create_access_token(teacher.id.into_inner(), PrincipalKind::Teacher, &ctx.state.jwt_config)
        .unwrap()
}

pub fn student_access_token(ctx: &TestContext, student: &Student) -> String {
    create_access_token(student.id.into_inner(), PrincipalKind::Student, &ctx.state.jwt_config)
        .unwrap()
}

/// Logs the seeded teacher in and returns the login response.
pub async fn login_teacher(app: &Router, remember_me: bool) -> TestResponse {
    send(
        app,
        ApiRequest::new("POST", "/api/teacher/auth/login").json(serde_json::json!({
            "email": TEACHER_EMAIL,
            "password": TEACHER_PASSWORD,
            "remember_me": remember_me,
        })),
    )
    .await
}
