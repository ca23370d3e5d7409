//! # Classmark DB
//!
//! Postgres pool setup and the embedded schema migrations (principals,
//! tokens, attendance).
//!
//! ```ignore
//! let pool = classmark_db::init_db_pool().await?;
//! classmark_db::run_migrations(&pool).await?;
//! ```

use std::env;
use std::time::Duration;

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPoolOptions;

pub use sqlx::PgPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Connects to `DATABASE_URL`.
///
/// Pool size comes from `DATABASE_MAX_CONNECTIONS` (default 10) and the
/// acquire timeout from `DATABASE_ACQUIRE_TIMEOUT_SECS` (default 5).
pub async fn init_db_pool() -> Result<PgPool, sqlx::Error> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| sqlx::Error::Configuration("DATABASE_URL must be set".into()))?;

    PgPoolOptions::new()
        .max_connections(env_or("DATABASE_MAX_CONNECTIONS", 10))
        .acquire_timeout(Duration::from_secs(env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)))
        .connect(&database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}
