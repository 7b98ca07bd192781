//! # Auditrail
//!
//! Atomic, property-level audit trails for change-tracking persistence
//! contexts. Wrap a context in [`AuditDbContext`], register per-type audit
//! policy on an [`AuditModel`], and every save writes the audit records of
//! its changes in the same transaction as the data.

pub use auditrail_audit as audit;
pub use auditrail_database as database;
pub use auditrail_entity as entity;

pub use auditrail_audit::{
    AuditDbContext, AuditModel, AuditModelBuilder, EntityAuditConfig, PersistenceContext,
    TransactionScope,
};
pub use auditrail_core::config::{AppConfig, AuditOptions};
pub use auditrail_core::error::{AppError, ErrorKind};
pub use auditrail_core::result::AppResult;
pub use auditrail_core::traits::{Capabilities, ChangeTracker, EntityState, EntryId, TrackedEntry};
pub use auditrail_core::types::{DbOperation, FieldValue, TypeName};
pub use auditrail_database::{EntityEntry, MemoryContext, MemoryStore, PgContext};
pub use auditrail_entity::{AuditEvent, AuditLog, AuditLogDetail, Operator};
