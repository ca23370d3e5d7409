use axum::http::{HeaderValue, Method, header};
use axum::{Router, middleware};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::{metrics_app, metrics_middleware};
use crate::modules::self_sign::router::init_self_sign_router;
use crate::modules::session::router::init_session_router;
use crate::modules::student_auth::router::init_student_auth_router;
use crate::modules::teacher_auth::router::init_teacher_auth_router;
use crate::state::AppState;

fn cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = state
        .cors_config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Refresh cookies cross origins, so credentials must be allowed.
    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

pub fn init_router(state: AppState) -> Router {
    init_router_with_metrics(state, None)
}

/// The full application. `/metrics` is mounted when a Prometheus handle is given.
pub fn init_router_with_metrics(state: AppState, metrics: Option<PrometheusHandle>) -> Router {
    let mut app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest(
            "/api",
            Router::new()
                .nest("/teacher/auth", init_teacher_auth_router())
                .nest("/student/auth", init_student_auth_router())
                .nest("/auth", init_session_router())
                .nest("/attendance", init_self_sign_router()),
        )
        .with_state(state.clone());

    if let Some(handle) = metrics {
        app = app.merge(metrics_app(handle));
    }

    app.layer(cors_layer(&state))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
