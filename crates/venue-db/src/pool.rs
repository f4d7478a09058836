//! PostgreSQL connection pool management
//!
//! Provides utilities for creating the connection pool, waiting for the
//! database at startup, and applying the embedded migrations.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use venue_core::config::DatabaseConfig;
use venue_core::{AppError, AppResult};

/// Delay between connection attempts while waiting for the database
const STARTUP_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Create a PostgreSQL connection pool
///
/// # Example
///
/// ```no_run
/// use venue_core::AppConfig;
/// use venue_db::create_pool;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = AppConfig::load()?;
///     let pool = create_pool(&config.database).await?;
///     Ok(())
/// }
/// ```
pub async fn create_pool(config: &DatabaseConfig) -> AppResult<PgPool> {
    info!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
        .test_before_acquire(true)
        .connect(&config.url)
        .await
        .map_err(|e| {
            warn!("Failed to create database pool: {}", e);
            AppError::Pool(format!("Failed to connect to database: {}", e))
        })?;

    info!(
        "Database pool created successfully with {} max connections",
        config.max_connections
    );

    // Test the connection
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| AppError::Database(format!("Database health check failed: {}", e)))?;

    info!("Database connection verified");

    Ok(pool)
}

/// Create the pool, retrying until `startup_wait_secs` have elapsed
///
/// Containers often start before Postgres accepts connections.
pub async fn wait_for_pool(config: &DatabaseConfig) -> AppResult<PgPool> {
    let deadline = Instant::now() + Duration::from_secs(config.startup_wait_secs);
    let mut attempt = 1u32;

    loop {
        match create_pool(config).await {
            Ok(pool) => return Ok(pool),
            Err(e) if Instant::now() + STARTUP_RETRY_DELAY < deadline => {
                warn!(attempt, "Database not ready, retrying: {}", e);
                attempt += 1;
                tokio::time::sleep(STARTUP_RETRY_DELAY).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Apply the embedded migrations
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Migration(e.to_string()))?;

    info!("Database migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DatabaseConfig {
        DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/venue_booking".to_string()),
            max_connections: 5,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 60,
            startup_wait_secs: 0,
        }
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_create_pool_and_migrate() {
        let pool = create_pool(&test_config()).await.unwrap();
        assert!(run_migrations(&pool).await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_gives_up_after_deadline() {
        let config = DatabaseConfig {
            url: "postgresql://127.0.0.1:1/unreachable".to_string(),
            acquire_timeout_secs: 1,
            ..test_config()
        };
        let result = wait_for_pool(&config).await;
        assert!(matches!(result, Err(AppError::Pool(_))));
    }
}
