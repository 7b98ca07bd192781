//! Shared fixtures for end-to-end save tests.

#![allow(dead_code)]

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use auditrail::{
    AuditDbContext, AuditLog, AuditModel, AuditOptions, Capabilities, DbOperation, EntityEntry,
    MemoryContext, MemoryStore, Operator,
};

/// Key of the signed-in operator used by most tests.
pub const OPERATOR_KEY: i64 = 7;

/// The audit registration shared by the tests.
///
/// - `User` is the operator's own type.
/// - `Comment` may be created and modified anonymously.
/// - `Order.internal_note` is never audited.
/// - `Session` is not audited at all.
pub fn model() -> Arc<AuditModel> {
    Arc::new(
        AuditModel::builder()
            .operator_type("User")
            .entity("Comment", |e| {
                e.anonymous(DbOperation::CREATE | DbOperation::UPDATE);
            })
            .entity("Order", |e| {
                e.exclude_property("internal_note");
            })
            .disable_auditing("Session")
            .build(),
    )
}

pub fn operator() -> Operator {
    Operator::new("User", OPERATOR_KEY).with_name("ada")
}

/// A fully audited order.
pub fn order(status: &str) -> EntityEntry {
    EntityEntry::new("Order", Capabilities::FULL_AUDITED)
        .with("status", status)
        .with("total", 100)
        .with("internal_note", "")
}

/// An order that already exists in the store under `id`.
pub fn stored_order(id: i64, status: &str) -> EntityEntry {
    order(status).with("id", id)
}

/// A context over `store` acting as [`operator`].
pub fn audited(store: &MemoryStore) -> AuditDbContext<MemoryContext> {
    anonymous(store).with_operator(operator())
}

/// A context over `store` with no operator.
pub fn anonymous(store: &MemoryStore) -> AuditDbContext<MemoryContext> {
    AuditDbContext::new(
        MemoryContext::new(store.clone()),
        model(),
        AuditOptions::default(),
    )
}

pub fn token() -> CancellationToken {
    CancellationToken::new()
}

/// Committed audit logs of one entity type.
pub async fn logs_of(store: &MemoryStore, entity_type: &str) -> Vec<AuditLog> {
    store
        .audit_logs()
        .await
        .into_iter()
        .filter(|log| log.entity_type == entity_type)
        .collect()
}
