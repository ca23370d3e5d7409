mod common;

use axum::http::StatusCode;
use serde_json::json;

use classmark::classmark_auth::{StudentTokenKind, TokenType};
use classmark::classmark_models::Student;
use classmark::state::testing::TestContext;
use common::{ApiRequest, TestResponse, app, seed_student, send};

fn login_token(ctx: &TestContext, student: &Student) -> Option<String> {
    ctx.token_store
        .all()
        .into_iter()
        .find(|t| {
            t.token_type == TokenType::from(StudentTokenKind::Login)
                && t.key == student.id.to_string()
        })
        .map(|t| t.value)
}

fn session_count(ctx: &TestContext) -> usize {
    ctx.token_store
        .all()
        .iter()
        .filter(|t| t.token_type == TokenType::from(StudentTokenKind::Access))
        .count()
}

async fn request_access(app: &axum::Router, student_number: &str) -> TestResponse {
    send(
        app,
        ApiRequest::new("POST", "/api/student/auth/request-access")
            .json(json!({ "student_number": student_number })),
    )
    .await
}

async fn sign_in(
    ctx: &TestContext,
    app: &axum::Router,
    student: &Student,
    duration_seconds: u64,
) -> TestResponse {
    request_access(app, &student.student_number).await;
    let token = login_token(ctx, student).unwrap();
    send(
        app,
        ApiRequest::new("POST", "/api/student/auth/verify")
            .json(json!({ "token": token, "duration_seconds": duration_seconds })),
    )
    .await
}

#[tokio::test]
async fn test_request_access_emails_link() {
    let mut ctx = TestContext::new();
    let student = seed_student(&ctx, "S-100").await;
    let app = app(&ctx);

    let response = request_access(&app, "S-100").await;

    assert_eq!(response.status, StatusCode::OK);
    let token = login_token(&ctx, &student).unwrap();
    let emails = ctx.take_emails();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].recipient, student.email);
    assert!(
        emails[0]
            .html_body
            .contains(&format!("http://frontend.test/student/verify?token={token}"))
    );
}

#[tokio::test]
async fn test_request_access_unknown_number_looks_the_same() {
    let mut ctx = TestContext::new();
    seed_student(&ctx, "S-100").await;
    let app = app(&ctx);

    let known = request_access(&app, "S-100").await;
    let unknown = request_access(&app, "S-999").await;

    assert_eq!(known.status, unknown.status);
    assert_eq!(known.body, unknown.body);
    assert_eq!(ctx.take_emails().len(), 1);
}

#[tokio::test]
async fn test_second_request_replaces_link() {
    let ctx = TestContext::new();
    let student = seed_student(&ctx, "S-100").await;
    let app = app(&ctx);

    request_access(&app, "S-100").await;
    let first = login_token(&ctx, &student).unwrap();
    request_access(&app, "S-100").await;
    let second = login_token(&ctx, &student).unwrap();

    assert_ne!(first, second);
    assert_eq!(ctx.token_store.len(), 1);
}

#[tokio::test]
async fn test_verify_creates_session_once() {
    let ctx = TestContext::new();
    let student = seed_student(&ctx, "S-100").await;
    let app = app(&ctx);

    request_access(&app, "S-100").await;
    let token = login_token(&ctx, &student).unwrap();

    let verify = || {
        ApiRequest::new("POST", "/api/student/auth/verify")
            .json(json!({ "token": token, "duration_seconds": 86400 }))
    };
    let first = send(&app, verify()).await;
    let second = send(&app, verify()).await;

    assert_eq!(first.status, StatusCode::OK);
    assert!(first.body["access_token"].is_string());
    let cookie = first.set_cookie("student_refresh_token").unwrap();
    assert!(cookie.contains("Expires="));
    assert!(cookie.contains("HttpOnly"));

    assert_eq!(second.status, StatusCode::UNAUTHORIZED);
    assert_eq!(session_count(&ctx), 1);
}

#[tokio::test]
async fn test_verify_zero_duration_is_session_only() {
    let ctx = TestContext::new();
    let student = seed_student(&ctx, "S-100").await;
    let app = app(&ctx);

    let response = sign_in(&ctx, &app, &student, 0).await;

    assert_eq!(response.status, StatusCode::OK);
    let cookie = response.set_cookie("student_refresh_token").unwrap();
    assert!(!cookie.contains("Expires="));
}

#[tokio::test]
async fn test_verify_rejects_absurd_duration() {
    let ctx = TestContext::new();
    let app = app(&ctx);

    let response = send(
        &app,
        ApiRequest::new("POST", "/api/student/auth/verify")
            .json(json!({ "token": "anything", "duration_seconds": 999_999_999u64 })),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_several_devices_hold_sessions() {
    let ctx = TestContext::new();
    let student = seed_student(&ctx, "S-100").await;
    let app = app(&ctx);

    sign_in(&ctx, &app, &student, 3600).await;
    sign_in(&ctx, &app, &student, 3600).await;

    assert_eq!(session_count(&ctx), 2);
}

#[tokio::test]
async fn test_forget_sessions_signs_out_everywhere() {
    let ctx = TestContext::new();
    let student = seed_student(&ctx, "S-100").await;
    let other = seed_student(&ctx, "S-200").await;
    let app = app(&ctx);

    let phone = sign_in(&ctx, &app, &student, 3600).await;
    let laptop = sign_in(&ctx, &app, &student, 3600).await;
    sign_in(&ctx, &app, &other, 3600).await;

    let response = send(
        &app,
        ApiRequest::new("POST", "/api/student/auth/forget-sessions")
            .cookie(&phone.cookie_pair("student_refresh_token").unwrap())
            .empty(),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.clears_cookie("student_refresh_token"));
    assert_eq!(session_count(&ctx), 1);

    let refresh = send(
        &app,
        ApiRequest::new("POST", "/api/auth/refresh")
            .cookie(&laptop.cookie_pair("student_refresh_token").unwrap())
            .empty(),
    )
    .await;
    assert_eq!(refresh.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forget_sessions_without_cookie() {
    let ctx = TestContext::new();
    let app = app(&ctx);

    let response = send(
        &app,
        ApiRequest::new("POST", "/api/student/auth/forget-sessions").empty(),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Invalid credentials");
    assert!(response.clears_cookie("student_refresh_token"));
}
