//! Schema migrations for the audit tables.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use auditrail_core::error::{AppError, ErrorKind};
use auditrail_core::result::AppResult;

/// Apply every pending migration under `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let migrator = sqlx::migrate!("../../migrations");
    info!(available = migrator.iter().count(), "Applying audit schema migrations");

    migrator.run(pool).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Audit schema migration failed: {e}"),
            e,
        )
    })?;

    info!("Audit schema is up to date");
    Ok(())
}

/// A row of the sqlx migration ledger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppliedMigration {
    /// Migration version (timestamp prefix of the file name).
    pub version: i64,
    /// Migration description.
    pub description: String,
    /// When it was applied.
    pub installed_on: DateTime<Utc>,
    /// Whether it completed.
    pub success: bool,
}

/// Migrations recorded as applied, oldest first.
pub async fn applied_migrations(pool: &PgPool) -> AppResult<Vec<AppliedMigration>> {
    sqlx::query_as::<_, AppliedMigration>(
        "SELECT version, description, installed_on, success FROM _sqlx_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read migration ledger", e))
}
