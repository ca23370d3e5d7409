mod common;

use axum::http::StatusCode;
use serde_json::json;

use classmark::classmark_auth::{StudentTokenKind, TokenType};
use classmark::state::testing::TestContext;
use common::{ApiRequest, app, login_teacher, seed_student, seed_teacher, send};

async fn student_cookie(ctx: &TestContext, app: &axum::Router) -> String {
    let student = seed_student(ctx, "S-100").await;
    send(
        app,
        ApiRequest::new("POST", "/api/student/auth/request-access")
            .json(json!({ "student_number": student.student_number })),
    )
    .await;
    let token = ctx
        .token_store
        .all()
        .into_iter()
        .find(|t| t.token_type == TokenType::from(StudentTokenKind::Login))
        .unwrap()
        .value;
    let verify = send(
        app,
        ApiRequest::new("POST", "/api/student/auth/verify")
            .json(json!({ "token": token, "duration_seconds": 0 })),
    )
    .await;
    verify.cookie_pair("student_refresh_token").unwrap()
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let ctx = TestContext::new();
    let app = app(&ctx);

    let response = send(&app, ApiRequest::new("POST", "/api/auth/refresh").empty()).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Invalid credentials");
    assert!(response.clears_cookie("teacher_refresh_token"));
    assert!(response.clears_cookie("student_refresh_token"));
}

#[tokio::test]
async fn test_refresh_with_both_cookies_is_rejected() {
    let ctx = TestContext::new();
    seed_teacher(&ctx).await;
    let app = app(&ctx);
    let teacher = login_teacher(&app, true)
        .await
        .cookie_pair("teacher_refresh_token")
        .unwrap();
    let student = student_cookie(&ctx, &app).await;

    let response = send(
        &app,
        ApiRequest::new("POST", "/api/auth/refresh")
            .cookie(&format!("{teacher}; {student}"))
            .empty(),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.clears_cookie("teacher_refresh_token"));
    assert!(response.clears_cookie("student_refresh_token"));
}

#[tokio::test]
async fn test_teacher_refresh_rotates_cookie() {
    let ctx = TestContext::new();
    seed_teacher(&ctx).await;
    let app = app(&ctx);
    let original = login_teacher(&app, true)
        .await
        .cookie_pair("teacher_refresh_token")
        .unwrap();

    let refreshed = send(
        &app,
        ApiRequest::new("POST", "/api/auth/refresh")
            .cookie(&original)
            .empty(),
    )
    .await;
    assert_eq!(refreshed.status, StatusCode::OK);
    assert!(refreshed.body["access_token"].is_string());
    let rotated = refreshed.cookie_pair("teacher_refresh_token").unwrap();
    assert_ne!(rotated, original);
    assert!(
        refreshed
            .set_cookie("teacher_refresh_token")
            .unwrap()
            .contains("Expires=")
    );

    let replay = send(
        &app,
        ApiRequest::new("POST", "/api/auth/refresh")
            .cookie(&original)
            .empty(),
    )
    .await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
    assert!(replay.clears_cookie("teacher_refresh_token"));

    let next = send(
        &app,
        ApiRequest::new("POST", "/api/auth/refresh")
            .cookie(&rotated)
            .empty(),
    )
    .await;
    assert_eq!(next.status, StatusCode::OK);
}

#[tokio::test]
async fn test_teacher_session_only_scope_survives_rotation() {
    let ctx = TestContext::new();
    seed_teacher(&ctx).await;
    let app = app(&ctx);
    let original = login_teacher(&app, false)
        .await
        .cookie_pair("teacher_refresh_token")
        .unwrap();

    let refreshed = send(
        &app,
        ApiRequest::new("POST", "/api/auth/refresh")
            .cookie(&original)
            .empty(),
    )
    .await;

    assert_eq!(refreshed.status, StatusCode::OK);
    let cookie = refreshed.set_cookie("teacher_refresh_token").unwrap();
    assert!(!cookie.contains("Expires="));
}

#[tokio::test]
async fn test_student_refresh_keeps_cookie() {
    let ctx = TestContext::new();
    let app = app(&ctx);
    let cookie = student_cookie(&ctx, &app).await;

    for _ in 0..2 {
        let response = send(
            &app,
            ApiRequest::new("POST", "/api/auth/refresh")
                .cookie(&cookie)
                .empty(),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body["access_token"].is_string());
        assert!(response.set_cookie("student_refresh_token").is_none());
    }
}

#[tokio::test]
async fn test_refresh_with_unknown_token_clears_cookie() {
    let ctx = TestContext::new();
    let app = app(&ctx);

    let response = send(
        &app,
        ApiRequest::new("POST", "/api/auth/refresh")
            .cookie("student_refresh_token=never-issued")
            .empty(),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.clears_cookie("student_refresh_token"));
}

#[tokio::test]
async fn test_teacher_logout_revokes_session() {
    let ctx = TestContext::new();
    seed_teacher(&ctx).await;
    let app = app(&ctx);
    let cookie = login_teacher(&app, true)
        .await
        .cookie_pair("teacher_refresh_token")
        .unwrap();

    let response = send(
        &app,
        ApiRequest::new("POST", "/api/auth/logout")
            .cookie(&cookie)
            .empty(),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.clears_cookie("teacher_refresh_token"));
    assert!(response.clears_cookie("student_refresh_token"));
    assert!(ctx.token_store.is_empty());
}

#[tokio::test]
async fn test_logout_with_both_cookies_revokes_both() {
    let ctx = TestContext::new();
    seed_teacher(&ctx).await;
    let app = app(&ctx);
    let teacher = login_teacher(&app, true)
        .await
        .cookie_pair("teacher_refresh_token")
        .unwrap();
    let student = student_cookie(&ctx, &app).await;
    assert_eq!(ctx.token_store.len(), 2);

    let response = send(
        &app,
        ApiRequest::new("POST", "/api/auth/logout")
            .cookie(&format!("{teacher}; {student}"))
            .empty(),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(ctx.token_store.is_empty());
}

#[tokio::test]
async fn test_logout_never_fails() {
    let ctx = TestContext::new();
    let app = app(&ctx);

    let bare = send(&app, ApiRequest::new("POST", "/api/auth/logout").empty()).await;
    let stale = send(
        &app,
        ApiRequest::new("POST", "/api/auth/logout")
            .cookie("teacher_refresh_token=!-!never-issued")
            .empty(),
    )
    .await;

    assert_eq!(bare.status, StatusCode::OK);
    assert_eq!(stale.status, StatusCode::OK);
    assert!(stale.clears_cookie("teacher_refresh_token"));
}
