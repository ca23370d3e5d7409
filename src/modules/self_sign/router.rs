use axum::{
    Router,
    routing::{get, post, put},
};

use super::controller::{
    delete_day_key, generate_day_key, list_pending, resolve, set_day_key, submit_self_sign,
};
use crate::state::AppState;

pub fn init_self_sign_router() -> Router<AppState> {
    Router::new()
        .route(
            "/days/{day_id}/self-sign-key",
            put(set_day_key).delete(delete_day_key),
        )
        .route("/days/{day_id}/self-sign-key/generate", post(generate_day_key))
        .route("/days/{day_id}/self-signs", get(list_pending))
        .route("/days/{day_id}/self-sign", post(submit_self_sign))
        .route("/self-signs/{id}/resolve", post(resolve))
}
