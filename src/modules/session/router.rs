use axum::{Router, routing::post};

use super::controller::{logout, refresh};
use crate::state::AppState;

pub fn init_session_router() -> Router<AppState> {
    Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
}
