//! # auditrail-audit
//!
//! The change-audit engine. Wraps a persistence collaborator's save so that
//! every pending entity change is classified into an [`AuditEvent`], diffed
//! property by property, and written as an audit record in the same
//! transaction as the data it describes.
//!
//! A save cycle runs in this order:
//!
//! 1. open a transaction, or a savepoint inside the caller's transaction;
//! 2. classify pending changes and stamp audit fields ([`classifier`]);
//! 3. assemble records for non-create events while original values are
//!    still known ([`assembler`], [`diff`]);
//! 4. run the underlying save, which assigns generated keys;
//! 5. assemble create records, register them, and save again;
//! 6. commit, or roll back and rethrow.
//!
//! [`AuditEvent`]: auditrail_entity::AuditEvent

pub mod assembler;
pub mod classifier;
pub mod constants;
pub mod context;
pub mod diff;
pub mod model;
pub mod orchestrator;
pub mod policy;
pub mod properties;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::ClassifiedChange;
pub use context::PersistenceContext;
pub use model::{AuditModel, AuditModelBuilder, EntityAuditConfig};
pub use orchestrator::{AuditDbContext, TransactionScope};
pub use properties::AuditablePropertyCache;
