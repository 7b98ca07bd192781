//! Repositories over the audit tables.

pub mod audit;

pub use audit::{AuditLogFilter, AuditLogRepository};
