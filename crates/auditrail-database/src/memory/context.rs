//! In-memory unit of work.

use async_trait::async_trait;
use tracing::debug;

use auditrail_audit::PersistenceContext;
use auditrail_audit::constants::ID;
use auditrail_core::error::AppError;
use auditrail_core::result::AppResult;
use auditrail_core::traits::{ChangeTracker, EntityState, EntryId, TrackedEntry};
use auditrail_core::types::FieldValue;
use auditrail_entity::NewAuditLog;

use super::store::{MemoryStore, WriteOp};
use crate::entries::EntrySet;
use crate::entry::EntityEntry;

#[derive(Debug, Default)]
struct OpenTransaction {
    ops: Vec<WriteOp>,
    savepoints: Vec<(String, usize)>,
}

/// Tracks entity changes and writes them to a [`MemoryStore`].
///
/// Without an open transaction every save commits immediately. Inside a
/// transaction writes stay private until commit; rolling back discards them
/// but leaves tracked entries as they are.
///
/// Saves are idempotent per entry: saving an entry twice writes the same
/// row twice, and deleting twice removes nothing more.
#[derive(Debug)]
pub struct MemoryContext {
    store: MemoryStore,
    entries: EntrySet,
    transaction: Option<OpenTransaction>,
    pending_audit_logs: Vec<NewAuditLog>,
    failing_save: Option<usize>,
}

impl MemoryContext {
    /// A context writing to `store`.
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            entries: EntrySet::default(),
            transaction: None,
            pending_audit_logs: Vec::new(),
            failing_save: None,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
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

    /// Make the `n`th save from now (1-based) fail without writing anything.
    pub fn fail_nth_save(&mut self, n: usize) {
        self.failing_save = Some(n.max(1));
    }

    /// Treat every pending change as persisted.
    pub fn accept_all_changes(&mut self) {
        self.entries.accept_all_changes();
    }

    fn open_transaction(&mut self) -> AppResult<&mut OpenTransaction> {
        self.transaction
            .as_mut()
            .ok_or_else(|| AppError::database("No transaction is open"))
    }

    fn take_injected_failure(&mut self) -> AppResult<()> {
        match self.failing_save {
            Some(1) => {
                self.failing_save = None;
                Err(AppError::database("Injected save failure"))
            }
            Some(n) => {
                self.failing_save = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn collect_writes(&mut self) -> AppResult<Vec<WriteOp>> {
        let mut ops = Vec::new();
        for entry in self.entries.values_mut() {
            let table = entry.entity_type().to_string();
            match entry.state() {
                EntityState::Added => {
                    if entry.key_missing() {
                        if !entry.has_generated_key() {
                            return Err(AppError::validation(format!(
                                "{table} cannot be inserted without a key"
                            ))
                            .for_entity(table));
                        }
                        let key = self.store.next_key(&table).await;
                        entry.assign(ID, FieldValue::Int(key))?;
                    }
                    ops.push(WriteOp::Upsert {
                        key: entry.key_text(),
                        row: entry.row(),
                        table,
                    });
                }
                EntityState::Modified => ops.push(WriteOp::Upsert {
                    key: entry.key_text(),
                    row: entry.row(),
                    table,
                }),
                EntityState::Deleted => ops.push(WriteOp::Delete {
                    key: entry.key_text(),
                    table,
                }),
                EntityState::Unchanged | EntityState::Detached => {}
            }
        }
        Ok(ops)
    }
}

impl ChangeTracker for MemoryContext {
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
impl PersistenceContext for MemoryContext {
    fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    async fn begin_transaction(&mut self) -> AppResult<()> {
        if self.transaction.is_some() {
            return Err(AppError::conflict("A transaction is already open"));
        }
        self.transaction = Some(OpenTransaction::default());
        Ok(())
    }

    async fn create_savepoint(&mut self, name: &str) -> AppResult<()> {
        let tx = self.open_transaction()?;
        let mark = tx.ops.len();
        tx.savepoints.push((name.to_string(), mark));
        Ok(())
    }

    async fn commit_transaction(&mut self) -> AppResult<()> {
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| AppError::database("No transaction is open"))?;
        let writes = tx.ops.len();
        self.store.apply(tx.ops).await;
        debug!(writes, "Committed in-memory transaction");
        Ok(())
    }

    async fn rollback_transaction(&mut self) -> AppResult<()> {
        self.pending_audit_logs.clear();
        self.transaction
            .take()
            .map(|_| ())
            .ok_or_else(|| AppError::database("No transaction is open"))
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> AppResult<()> {
        self.pending_audit_logs.clear();
        let tx = self.open_transaction()?;
        let position = tx
            .savepoints
            .iter()
            .rposition(|(n, _)| n == name)
            .ok_or_else(|| AppError::not_found(format!("No savepoint named '{name}'")))?;
        let mark = tx.savepoints[position].1;
        tx.ops.truncate(mark);
        tx.savepoints.truncate(position + 1);
        Ok(())
    }

    async fn save(&mut self, accept_all_changes_on_success: bool) -> AppResult<u64> {
        self.take_injected_failure()?;

        let mut ops = self.collect_writes().await?;
        let audit_logs = std::mem::take(&mut self.pending_audit_logs);
        if !audit_logs.is_empty() {
            let persisted = self.store.persist(audit_logs).await;
            ops.extend(persisted.into_iter().map(WriteOp::Audit));
        }

        let affected = ops.len() as u64;
        match self.transaction.as_mut() {
            Some(tx) => tx.ops.extend(ops),
            None => self.store.apply(ops).await,
        }

        if accept_all_changes_on_success {
            self.accept_all_changes();
        }
        debug!(affected, "Saved in-memory changes");
        Ok(affected)
    }

    fn add_audit_logs(&mut self, logs: Vec<NewAuditLog>) {
        self.pending_audit_logs.extend(logs);
    }
}
