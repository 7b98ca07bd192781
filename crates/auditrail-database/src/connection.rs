//! PostgreSQL pool for the audit tables.

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use auditrail_core::config::DatabaseConfig;
use auditrail_core::error::{AppError, ErrorKind};
use auditrail_core::result::AppResult;

use crate::context::PgContext;
use crate::repositories::AuditLogRepository;
use crate::transaction::PgTransaction;

/// Shared connection pool.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Connect using the `[database]` configuration section.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        info!(
            url = %redact_url(&config.url),
            max_connections = config.max_connections,
            "Opening audit database pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Cannot reach audit database: {e}"),
                    e,
                )
            })?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// A repository over this pool.
    pub fn audit_logs(&self) -> AuditLogRepository {
        AuditLogRepository::new(self.pool.clone())
    }

    /// A unit of work over this pool.
    pub fn context(&self) -> PgContext {
        PgContext::new(self.pool.clone())
    }

    /// Open a transaction.
    pub async fn begin(&self) -> AppResult<PgTransaction> {
        PgTransaction::begin(&self.pool).await
    }

    /// Whether the database answers a trivial query.
    pub async fn ping(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|one| one == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Audit database ping failed", e))
    }

    /// Close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Audit database pool closed");
    }
}

/// Hide the password of a connection URL.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}
