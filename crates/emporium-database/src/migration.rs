//! Database migration runner.

use sqlx::PgPool;
use tracing::info;

use emporium_core::error::{AppError, ErrorKind};
use emporium_core::result::AppResult;

/// Applies the plugin tables migrations.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    info!("Running database migrations");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migrations: {e}"),
                e,
            )
        })?;

    info!("Database migrations completed");
    Ok(())
}
