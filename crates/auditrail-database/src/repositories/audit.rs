//! Audit log repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use auditrail_core::error::{AppError, ErrorKind};
use auditrail_core::result::AppResult;
use auditrail_core::types::pagination::{PageRequest, PageResponse};
use auditrail_entity::{AuditEvent, AuditLog, AuditLogDetail, NewAuditLog};

/// Optional criteria for [`AuditLogRepository::search`].
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    /// Friendly entity type name.
    pub entity_type: Option<String>,
    /// Exact entity key.
    pub entity_id: Option<String>,
    /// Event kind.
    pub event_type: Option<AuditEvent>,
    /// Acting operator key.
    pub operator_id: Option<String>,
}

/// Reads and writes `audit_logs` and `audit_log_details`.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a log and its details on `conn`, typically inside a transaction.
    pub async fn insert(conn: &mut PgConnection, log: NewAuditLog) -> AppResult<AuditLog> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO audit_logs (entity_id, entity_type, event_type, event_time, operator_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&log.entity_id)
        .bind(&log.entity_type)
        .bind(log.event_type.as_str())
        .bind(log.event_time)
        .bind(&log.operator_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert audit log", e))?;

        let mut detail_ids = Vec::with_capacity(log.details.len());
        for detail in &log.details {
            let detail_id: i64 = sqlx::query_scalar(
                "INSERT INTO audit_log_details (audit_log_id, property_name, original_value, new_value) \
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(id)
            .bind(&detail.property_name)
            .bind(&detail.original_value)
            .bind(&detail.new_value)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to insert audit log detail", e)
            })?;
            detail_ids.push(detail_id);
        }

        Ok(log.into_persisted(id, detail_ids))
    }

    /// Find a log with its details.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<AuditLog>> {
        let log = sqlx::query_as::<_, AuditLog>("SELECT * FROM audit_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find audit log", e))?;

        match log {
            Some(log) => Ok(self.with_details(vec![log]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Full history of one entity, oldest first.
    pub async fn find_by_entity(&self, entity_type: &str, entity_id: &str) -> AppResult<Vec<AuditLog>> {
        let logs = sqlx::query_as::<_, AuditLog>(
            "SELECT * FROM audit_logs WHERE entity_type = $1 AND entity_id = $2 ORDER BY id",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load entity history", e))?;

        self.with_details(logs).await
    }

    /// Page through logs matching `filter`, newest first.
    pub async fn search(
        &self,
        filter: &AuditLogFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditLog>> {
        let offset = page.offset()?;
        let mut conditions = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        for (column, value) in [
            ("entity_type", filter.entity_type.clone()),
            ("entity_id", filter.entity_id.clone()),
            ("event_type", filter.event_type.map(|e| e.as_str().to_string())),
            ("operator_id", filter.operator_id.clone()),
        ] {
            if let Some(value) = value {
                binds.push(value);
                conditions.push(format!("{column} = ${}", binds.len()));
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let count_sql = format!("SELECT COUNT(*) FROM audit_logs {where_clause}");
        let select_sql = format!(
            "SELECT * FROM audit_logs {where_clause} ORDER BY event_time DESC, id DESC LIMIT ${} OFFSET ${}",
            binds.len() + 1,
            binds.len() + 2
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut select_query = sqlx::query_as::<_, AuditLog>(&select_sql);
        for value in &binds {
            count_query = count_query.bind(value);
            select_query = select_query.bind(value);
        }

        let total = count_query.fetch_one(&self.pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count audit logs", e)
        })?;

        let logs = select_query
            .bind(page.limit())
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to search audit logs", e))?;

        let logs = self.with_details(logs).await?;
        Ok(PageResponse::new(logs, page, total as u64))
    }

    /// Logs recorded at or after `since`, oldest first.
    pub async fn find_since(&self, since: DateTime<Utc>) -> AppResult<Vec<AuditLog>> {
        let logs = sqlx::query_as::<_, AuditLog>(
            "SELECT * FROM audit_logs WHERE event_time >= $1 ORDER BY event_time, id",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load recent audit logs", e))?;

        self.with_details(logs).await
    }

    /// Delete logs recorded before `before`. Details go with them.
    pub async fn delete_before(&self, before: DateTime<Utc>) -> AppResult<u64> {
        sqlx::query("DELETE FROM audit_logs WHERE event_time < $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to purge audit logs", e))
    }

    async fn with_details(&self, mut logs: Vec<AuditLog>) -> AppResult<Vec<AuditLog>> {
        if logs.is_empty() {
            return Ok(logs);
        }

        let ids: Vec<i64> = logs.iter().map(|l| l.id).collect();
        let details = sqlx::query_as::<_, AuditLogDetail>(
            "SELECT * FROM audit_log_details WHERE audit_log_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load audit log details", e))?;

        let mut by_log: HashMap<i64, Vec<AuditLogDetail>> = HashMap::new();
        for detail in details {
            by_log.entry(detail.audit_log_id).or_default().push(detail);
        }
        for log in &mut logs {
            log.details = by_log.remove(&log.id).unwrap_or_default();
        }
        Ok(logs)
    }
}
