use crate::error::DbError;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Pool sizing for [`connect`].
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Establishes a connection pool to the PostgreSQL database at `database_url`.
///
/// One connection is opened eagerly, so an unreachable server or a bad DSN
/// fails here rather than on first use.
pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(database_url)
        .await?;

    tracing::debug!(max_connections = settings.max_connections, "Database pool established.");
    Ok(pool)
}

/// Applies the embedded migrations in `./migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
