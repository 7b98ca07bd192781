//! # auditrail-entity
//!
//! Persistent audit records and the event vocabulary. Every struct in this
//! crate is either a database row (`sqlx::FromRow`) or the insert payload
//! for one.

pub mod audit;
pub mod operator;

pub use audit::{AuditEvent, AuditLog, AuditLogDetail, NewAuditLog, NewAuditLogDetail};
pub use operator::Operator;
