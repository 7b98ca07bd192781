//! Committed in-memory state shared by contexts.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;

use auditrail_entity::{AuditLog, NewAuditLog};

use crate::entry::Row;

/// A write recorded by a save and applied on commit.
#[derive(Debug, Clone)]
pub(crate) enum WriteOp {
    Upsert {
        table: String,
        key: String,
        row: Row,
    },
    Delete {
        table: String,
        key: String,
    },
    Audit(AuditLog),
}

#[derive(Debug, Default)]
struct InnerState {
    tables: BTreeMap<String, BTreeMap<String, Row>>,
    audit_logs: Vec<AuditLog>,
    sequences: HashMap<String, i64>,
    last_audit_log_id: i64,
    last_detail_id: i64,
}

/// Committed tables and audit logs.
///
/// Cloning yields another handle to the same state. Sequences advance even
/// when the transaction that drew from them rolls back.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed rows of a table, ordered by key text.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        let state = self.state.lock().await;
        state
            .tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// One committed row.
    pub async fn row(&self, table: &str, key: &str) -> Option<Row> {
        let state = self.state.lock().await;
        state.tables.get(table).and_then(|rows| rows.get(key).cloned())
    }

    /// Committed row count of a table.
    pub async fn count(&self, table: &str) -> usize {
        let state = self.state.lock().await;
        state.tables.get(table).map_or(0, BTreeMap::len)
    }

    /// Every committed audit log, in insertion order.
    pub async fn audit_logs(&self) -> Vec<AuditLog> {
        self.state.lock().await.audit_logs.clone()
    }

    /// Committed history of one entity.
    pub async fn audit_logs_for(&self, entity_type: &str, entity_id: &str) -> Vec<AuditLog> {
        let state = self.state.lock().await;
        state
            .audit_logs
            .iter()
            .filter(|log| log.entity_type == entity_type && log.entity_id == entity_id)
            .cloned()
            .collect()
    }

    /// Draw the next generated key of `table`.
    pub(crate) async fn next_key(&self, table: &str) -> i64 {
        let mut state = self.state.lock().await;
        let next = state.sequences.entry(table.to_string()).or_insert(0);
        *next += 1;
        *next
    }

    /// Assign log and detail ids.
    pub(crate) async fn persist(&self, logs: Vec<NewAuditLog>) -> Vec<AuditLog> {
        let mut state = self.state.lock().await;
        let mut persisted = Vec::with_capacity(logs.len());
        for log in logs {
            state.last_audit_log_id += 1;
            let id = state.last_audit_log_id;
            let first_detail = state.last_detail_id + 1;
            state.last_detail_id += log.details.len() as i64;
            persisted.push(log.into_persisted(id, first_detail..));
        }
        persisted
    }

    /// Apply writes as one atomic step.
    pub(crate) async fn apply(&self, ops: Vec<WriteOp>) {
        let mut state = self.state.lock().await;
        for op in ops {
            match op {
                WriteOp::Upsert { table, key, row } => {
                    state.tables.entry(table).or_default().insert(key, row);
                }
                WriteOp::Delete { table, key } => {
                    if let Some(rows) = state.tables.get_mut(&table) {
                        rows.remove(&key);
                    }
                }
                WriteOp::Audit(log) => state.audit_logs.push(log),
            }
        }
    }
}
