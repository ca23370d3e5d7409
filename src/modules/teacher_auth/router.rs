use axum::{Router, routing::post};

use super::controller::{confirm_password_reset, login, request_password_reset};
use crate::state::AppState;

pub fn init_teacher_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/password-reset/request", post(request_password_reset))
        .route("/password-reset/confirm", post(confirm_password_reset))
}
