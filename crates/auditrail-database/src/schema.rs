//! Column documentation for audited tables.

use sqlx::PgPool;
use tracing::info;

use auditrail_core::config::AuditEntityComments;
use auditrail_core::error::{AppError, ErrorKind};
use auditrail_core::result::AppResult;

use crate::sql::quote_identifier;

/// `COMMENT ON COLUMN` statements for the audit columns among `columns`.
///
/// Columns without a configured text are skipped.
pub fn column_comment_statements(
    table: &str,
    columns: &[String],
    comments: &AuditEntityComments,
) -> AppResult<Vec<String>> {
    let table = quote_identifier(table)?;
    columns
        .iter()
        .filter_map(|column| comments.for_column(column).map(|text| (column, text)))
        .map(|(column, text)| -> AppResult<String> {
            Ok(format!(
                "COMMENT ON COLUMN {table}.{} IS '{}'",
                quote_identifier(column)?,
                text.replace('\'', "''")
            ))
        })
        .collect()
}

/// Document the audit columns of `table` with `comments`.
///
/// Returns how many columns were commented.
pub async fn comment_audit_columns(
    pool: &PgPool,
    table: &str,
    comments: &AuditEntityComments,
) -> AppResult<usize> {
    let columns: Vec<String> = sqlx::query_scalar(
        "SELECT column_name::text FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1 ORDER BY ordinal_position",
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read table columns", e))?;

    if columns.is_empty() {
        return Err(AppError::not_found(format!("Table '{table}' does not exist")));
    }

    let statements = column_comment_statements(table, &columns, comments)?;
    let mut tx = pool.begin().await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
    })?;
    for statement in &statements {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to comment column", e))?;
    }
    tx.commit()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e))?;

    info!(table, commented = statements.len(), "Documented audit columns");
    Ok(statements.len())
}
