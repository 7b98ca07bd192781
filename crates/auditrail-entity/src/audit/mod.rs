//! Audit log records.

pub mod event;
pub mod model;

pub use event::AuditEvent;
pub use model::{AuditLog, AuditLogDetail, NewAuditLog, NewAuditLogDetail};
