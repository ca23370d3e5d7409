use axum::{Router, routing::post};

use super::controller::{forget_sessions, request_access, verify};
use crate::state::AppState;

pub fn init_student_auth_router() -> Router<AppState> {
    Router::new()
        .route("/request-access", post(request_access))
        .route("/verify", post(verify))
        .route("/forget-sessions", post(forget_sessions))
}
