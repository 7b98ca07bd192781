//! PostgreSQL unit of work.

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool};
use sqlx::query::Query;
use sqlx::{Postgres, Row as _};
use tracing::debug;

use auditrail_audit::PersistenceContext;
use auditrail_audit::constants::ID;
use auditrail_core::error::{AppError, ErrorKind};
use auditrail_core::result::AppResult;
use auditrail_core::traits::{ChangeTracker, EntityState, EntryId, TrackedEntry};
use auditrail_core::types::FieldValue;
use auditrail_entity::NewAuditLog;

use crate::entries::EntrySet;
use crate::entry::EntityEntry;
use crate::sql::{self, Statement};
use crate::transaction::PgTransaction;

/// Tracks entity changes and writes them to PostgreSQL.
///
/// Each entity type maps to the table of the same name, each property to a
/// column. Without an open transaction a save runs in its own transaction;
/// otherwise it joins the open one.
#[derive(Debug)]
pub struct PgContext {
    pool: PgPool,
    entries: EntrySet,
    transaction: Option<PgTransaction>,
    pending_audit_logs: Vec<NewAuditLog>,
}

impl PgContext {
    /// A context over `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            entries: EntrySet::default(),
            transaction: None,
            pending_audit_logs: Vec::new(),
        }
    }

    /// Track a new entity for insertion.
    pub fn add(&mut self, entry: EntityEntry) -> EntryId {
        self.entries.add(entry)
    }

    /// Track an already-stored entity with its values as originals.
    pub fn attach(&mut self, entry: EntityEntry) -> EntryId {
        self.entries.attach(entry)
    }

    /// Mark an entity for deletion. A never-saved entity is simply forgotten.
    pub fn remove(&mut self, id: EntryId) -> AppResult<()> {
        self.entries.remove(id)
    }

    /// Borrow a tracked entity.
    pub fn get(&self, id: EntryId) -> Option<&EntityEntry> {
        self.entries.get(id)
    }

    /// Mutably borrow a tracked entity.
    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut EntityEntry> {
        self.entries.get_mut(id)
    }

    /// Write one property of a tracked entity.
    pub fn set(&mut self, id: EntryId, name: &str, value: impl Into<FieldValue>) -> AppResult<()> {
        self.entries.set(id, name, value)
    }

    /// Audit logs registered but not yet saved.
    pub fn pending_audit_logs(&self) -> &[NewAuditLog] {
        &self.pending_audit_logs
    }

    /// Treat every pending change as persisted.
    pub fn accept_all_changes(&mut self) {
        self.entries.accept_all_changes();
    }

    fn open_transaction(&mut self) -> AppResult<&mut PgTransaction> {
        self.transaction
            .as_mut()
            .ok_or_else(|| AppError::database("No transaction is open"))
    }
}

impl ChangeTracker for PgContext {
    fn entry_ids(&self) -> Vec<EntryId> {
        self.entries.entry_ids()
    }

    fn entry(&self, id: EntryId) -> Option<&dyn TrackedEntry> {
        self.entries.entry(id)
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut dyn TrackedEntry> {
        self.entries.entry_mut(id)
    }
}

#[async_trait]
impl PersistenceContext for PgContext {
    fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    async fn begin_transaction(&mut self) -> AppResult<()> {
        if self.transaction.is_some() {
            return Err(AppError::conflict("A transaction is already open"));
        }
        self.transaction = Some(PgTransaction::begin(&self.pool).await?);
        Ok(())
    }

    async fn create_savepoint(&mut self, name: &str) -> AppResult<()> {
        self.open_transaction()?.savepoint(name).await
    }

    async fn commit_transaction(&mut self) -> AppResult<()> {
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| AppError::database("No transaction is open"))?;
        tx.commit().await?;
        debug!("Committed transaction");
        Ok(())
    }

    async fn rollback_transaction(&mut self) -> AppResult<()> {
        self.pending_audit_logs.clear();
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| AppError::database("No transaction is open"))?;
        tx.rollback().await
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> AppResult<()> {
        self.pending_audit_logs.clear();
        self.open_transaction()?.rollback_to(name).await
    }

    async fn save(&mut self, accept_all_changes_on_success: bool) -> AppResult<u64> {
        let affected = match self.transaction.as_mut() {
            Some(tx) => flush(&mut self.entries, &mut self.pending_audit_logs, tx).await?,
            None => {
                let mut tx = PgTransaction::begin(&self.pool).await?;
                let affected =
                    flush(&mut self.entries, &mut self.pending_audit_logs, &mut tx).await?;
                tx.commit().await?;
                affected
            }
        };

        if accept_all_changes_on_success {
            self.accept_all_changes();
        }
        debug!(affected, "Saved tracked changes");
        Ok(affected)
    }

    fn add_audit_logs(&mut self, logs: Vec<NewAuditLog>) {
        self.pending_audit_logs.extend(logs);
    }
}

/// Write every pending entry, then the registered audit logs, inside `tx`.
async fn flush(
    entries: &mut EntrySet,
    audit_logs: &mut Vec<NewAuditLog>,
    tx: &mut PgTransaction,
) -> AppResult<u64> {
    let mut affected = 0;
    for entry in entries.values_mut() {
        let table = entry.entity_type().to_string();
        let keys = entry.key_names().to_vec();
        match entry.state() {
            EntityState::Added if entry.key_missing() => {
                if !entry.has_generated_key() {
                    return Err(AppError::validation(format!(
                        "{table} cannot be inserted without a key"
                    ))
                    .for_entity(table));
                }
                let statement = sql::insert(&table, &entry.row(), &keys, Some(ID))?;
                let generated: i64 = bind(&statement)
                    .fetch_one(tx.connection())
                    .await
                    .and_then(|row| row.try_get(0))
                    .map_err(|e| write_failed(&table, e))?;
                entry.assign(ID, FieldValue::Int(generated))?;
                affected += 1;
            }
            EntityState::Added => {
                let statement = sql::insert(&table, &entry.row(), &keys, None)?;
                affected += execute(&statement, &table, tx).await?;
            }
            EntityState::Modified => {
                if let Some(statement) = sql::update(&table, &entry.row(), &keys)? {
                    affected += execute(&statement, &table, tx).await?;
                }
            }
            EntityState::Deleted => {
                let statement = sql::delete(&table, &entry.row(), &keys)?;
                affected += execute(&statement, &table, tx).await?;
            }
            EntityState::Unchanged | EntityState::Detached => {}
        }
    }

    let logs = std::mem::take(audit_logs);
    if !logs.is_empty() {
        affected += tx.insert_audit_logs(logs).await?.len() as u64;
    }
    Ok(affected)
}

async fn execute(statement: &Statement, table: &str, tx: &mut PgTransaction) -> AppResult<u64> {
    bind(statement)
        .execute(tx.connection())
        .await
        .map(|done| done.rows_affected())
        .map_err(|e| write_failed(table, e))
}

fn bind(statement: &Statement) -> Query<'_, Postgres, PgArguments> {
    statement
        .params
        .iter()
        .fold(sqlx::query(&statement.sql), |query, value| match value {
            FieldValue::Null => query.bind(None::<String>),
            FieldValue::Bool(v) => query.bind(*v),
            FieldValue::Int(v) => query.bind(*v),
            FieldValue::Float(v) => query.bind(*v),
            FieldValue::Text(v) => query.bind(v.clone()),
            FieldValue::Uuid(v) => query.bind(*v),
            FieldValue::Timestamp(v) => query.bind(*v),
            FieldValue::Json(v) => query.bind(v.clone()),
        })
}

fn write_failed(table: &str, e: sqlx::Error) -> AppError {
    AppError::with_source(ErrorKind::Database, format!("Failed to save {table}"), e).for_entity(table)
}
