//! In-memory persistence context.
//!
//! A complete [`PersistenceContext`](auditrail_audit::PersistenceContext)
//! with transactions, savepoints and generated keys, backed by a shared
//! [`MemoryStore`]. Used for tests and for embedding the audit engine
//! without a database.

pub mod context;
pub mod store;

pub use context::MemoryContext;
pub use store::MemoryStore;
