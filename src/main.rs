use std::net::SocketAddr;
use std::time::Duration;

use dotenvy::dotenv;
use tracing::{error, info};

use classmark::classmark_auth::spawn_expiry_sweeper;
use classmark::classmark_db::{init_db_pool, run_migrations};
use classmark::logging::{init_tracing, shutdown_tracer};
use classmark::metrics::init_metrics;
use classmark::router::init_router_with_metrics;
use classmark::state::init_app_state;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let pool = match init_db_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };
    if let Err(e) = run_migrations(&pool).await {
        error!(error = %e, "Failed to run migrations");
        std::process::exit(1);
    }

    let state = init_app_state(pool);
    let sweep_interval = Duration::from_secs(state.session_config.sweep_interval_secs.max(1));
    let _sweeper = spawn_expiry_sweeper(state.tokens.clone(), sweep_interval);

    let app = init_router_with_metrics(state, init_metrics());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    info!("🚀 Server running on http://localhost:{}", port);
    info!("📚 Swagger UI available at http://localhost:{}/swagger-ui", port);
    info!("📖 Scalar UI available at http://localhost:{}/scalar", port);

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!(error = %e, "Server error");
    }

    shutdown_tracer().await;
}
