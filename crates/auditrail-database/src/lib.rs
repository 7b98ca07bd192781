//! # auditrail-database
//!
//! Persistence collaborators for the audit engine: PostgreSQL connection
//! management, migrations, the audit log repository and transaction handle,
//! a PostgreSQL unit of work and an in-memory one, both implementing
//! [`PersistenceContext`](auditrail_audit::PersistenceContext).

pub mod connection;
pub mod context;
pub mod entries;
pub mod entry;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod schema;
mod sql;
pub mod transaction;

pub use connection::DatabasePool;
pub use context::PgContext;
pub use entries::EntrySet;
pub use entry::{EntityEntry, Row};
pub use memory::{MemoryContext, MemoryStore};
pub use repositories::{AuditLogFilter, AuditLogRepository};
pub use transaction::PgTransaction;
