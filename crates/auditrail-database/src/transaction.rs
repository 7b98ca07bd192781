//! PostgreSQL transaction handle with named savepoints.

use std::fmt;

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

use auditrail_core::error::{AppError, ErrorKind};
use auditrail_core::result::AppResult;
use auditrail_entity::{AuditLog, NewAuditLog};

use crate::repositories::AuditLogRepository;
use crate::sql::quote_identifier;

/// An open transaction on a pooled connection.
///
/// Dropping it without [`commit`](Self::commit) rolls back.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
    savepoints: Vec<String>,
}

impl fmt::Debug for PgTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgTransaction")
            .field("savepoints", &self.savepoints)
            .finish_non_exhaustive()
    }
}

impl PgTransaction {
    /// Begin a transaction on a connection from `pool`.
    pub async fn begin(pool: &PgPool) -> AppResult<Self> {
        let tx = pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        Ok(Self {
            tx,
            savepoints: Vec::new(),
        })
    }

    /// The transaction's connection, for running statements inside it.
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Define a savepoint.
    pub async fn savepoint(&mut self, name: &str) -> AppResult<()> {
        self.execute(&format!("SAVEPOINT {}", quote_identifier(name)?), "create savepoint")
            .await?;
        self.savepoints.push(name.to_string());
        debug!(savepoint = name, "Savepoint created");
        Ok(())
    }

    /// Undo everything after `name`. The savepoint itself stays defined.
    pub async fn rollback_to(&mut self, name: &str) -> AppResult<()> {
        let position = self.position(name)?;
        self.execute(
            &format!("ROLLBACK TO SAVEPOINT {}", quote_identifier(name)?),
            "roll back to savepoint",
        )
        .await?;
        self.savepoints.truncate(position + 1);
        debug!(savepoint = name, "Rolled back to savepoint");
        Ok(())
    }

    /// Insert audit logs inside this transaction.
    pub async fn insert_audit_logs(&mut self, logs: Vec<NewAuditLog>) -> AppResult<Vec<AuditLog>> {
        let mut inserted = Vec::with_capacity(logs.len());
        for log in logs {
            inserted.push(AuditLogRepository::insert(&mut self.tx, log).await?);
        }
        Ok(inserted)
    }

    /// Commit.
    pub async fn commit(self) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e))
    }

    /// Roll back.
    pub async fn rollback(self) -> AppResult<()> {
        self.tx.rollback().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to roll back transaction", e)
        })
    }

    fn position(&self, name: &str) -> AppResult<usize> {
        self.savepoints
            .iter()
            .rposition(|s| s == name)
            .ok_or_else(|| AppError::not_found(format!("No savepoint named '{name}'")))
    }

    async fn execute(&mut self, sql: &str, action: &str) -> AppResult<()> {
        sqlx::query(sql)
            .execute(&mut *self.tx)
            .await
            .map(|_| ())
            .map_err(|e| AppError::with_source(ErrorKind::Database, format!("Failed to {action}"), e))
    }
}
