//! Persistence collaborator contract.

use async_trait::async_trait;

use auditrail_core::result::AppResult;
use auditrail_core::traits::ChangeTracker;
use auditrail_entity::NewAuditLog;

/// A unit of work the audit engine can wrap.
///
/// Implementations track entity changes, own at most one open transaction,
/// and persist audit logs registered through [`add_audit_logs`] on their
/// next [`save`].
///
/// [`add_audit_logs`]: PersistenceContext::add_audit_logs
/// [`save`]: PersistenceContext::save
#[async_trait]
pub trait PersistenceContext: ChangeTracker + Send {
    /// Whether a transaction is already open on this context.
    fn in_transaction(&self) -> bool;

    /// Open a transaction.
    async fn begin_transaction(&mut self) -> AppResult<()>;

    /// Create a named savepoint inside the open transaction.
    async fn create_savepoint(&mut self, name: &str) -> AppResult<()>;

    /// Commit and release the open transaction.
    async fn commit_transaction(&mut self) -> AppResult<()>;

    /// Roll back and release the open transaction.
    async fn rollback_transaction(&mut self) -> AppResult<()>;

    /// Undo everything after the named savepoint, keeping the transaction open.
    async fn rollback_to_savepoint(&mut self, name: &str) -> AppResult<()>;

    /// Flush pending changes and return the number of affected rows.
    ///
    /// Generated keys become visible through the tracked entries afterwards.
    async fn save(&mut self, accept_all_changes_on_success: bool) -> AppResult<u64>;

    /// Register audit logs to be written by the next [`save`](Self::save).
    fn add_audit_logs(&mut self, logs: Vec<NewAuditLog>);
}
