//! Audited saves inside a caller-owned transaction.

mod helpers;

use auditrail::{AuditEvent, ErrorKind, FieldValue, MemoryStore, PersistenceContext};

#[tokio::test]
async fn test_outer_owner_commits() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    ctx.inner_mut().begin_transaction().await.unwrap();
    ctx.inner_mut().add(helpers::order("open"));

    ctx.save_changes(true, &helpers::token()).await.unwrap();

    assert!(ctx.inner().in_transaction());
    assert_eq!(store.count("Order").await, 0);
    assert!(store.audit_logs().await.is_empty());

    ctx.inner_mut().commit_transaction().await.unwrap();
    assert_eq!(store.count("Order").await, 1);
    let logs = store.audit_logs().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].event_type, AuditEvent::Create);
    assert_eq!(logs[0].entity_id, "1");
}

#[tokio::test]
async fn test_failure_restores_savepoint_and_keeps_outer_work() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    ctx.inner_mut().begin_transaction().await.unwrap();

    ctx.inner_mut().add(helpers::order("kept"));
    ctx.save_changes(true, &helpers::token()).await.unwrap();

    ctx.inner_mut().add(helpers::order("lost"));
    ctx.inner_mut().fail_nth_save(2);
    let err = ctx.save_changes(true, &helpers::token()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);
    assert!(ctx.inner().in_transaction());
    assert!(ctx.inner().pending_audit_logs().is_empty());

    ctx.inner_mut().commit_transaction().await.unwrap();

    let rows = store.rows("Order").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], FieldValue::from("kept"));
    let logs = store.audit_logs().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].entity_id, "1");
}

#[tokio::test]
async fn test_rejection_inside_transaction_leaves_it_usable() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    ctx.inner_mut().begin_transaction().await.unwrap();
    ctx.inner_mut().add(helpers::order("kept"));
    ctx.save_changes(true, &helpers::token()).await.unwrap();

    ctx.set_operator(None);
    let id = ctx.inner_mut().add(helpers::order("anonymous"));
    let err = ctx.save_changes(true, &helpers::token()).await.unwrap_err();
    assert!(err.is_authorization());
    assert!(ctx.inner().in_transaction());

    ctx.inner_mut().remove(id).unwrap();
    ctx.set_operator(Some(helpers::operator()));
    ctx.inner_mut().commit_transaction().await.unwrap();

    assert_eq!(store.count("Order").await, 1);
    assert_eq!(store.audit_logs().await.len(), 1);
}

#[tokio::test]
async fn test_outer_rollback_discards_audit_rows() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    ctx.inner_mut().begin_transaction().await.unwrap();
    ctx.inner_mut().add(helpers::order("open"));
    ctx.save_changes(true, &helpers::token()).await.unwrap();

    ctx.inner_mut().rollback_transaction().await.unwrap();

    assert_eq!(store.count("Order").await, 0);
    assert!(store.audit_logs().await.is_empty());
}

#[tokio::test]
async fn test_consecutive_nested_saves_share_outer_transaction() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    ctx.inner_mut().begin_transaction().await.unwrap();

    let id = ctx.inner_mut().add(helpers::order("open"));
    ctx.save_changes(true, &helpers::token()).await.unwrap();
    ctx.inner_mut().set(id, "status", "paid").unwrap();
    ctx.save_changes(true, &helpers::token()).await.unwrap();
    ctx.inner_mut().commit_transaction().await.unwrap();

    let events: Vec<_> = store
        .audit_logs_for("Order", "1")
        .await
        .iter()
        .map(|l| l.event_type)
        .collect();
    assert_eq!(events, vec![AuditEvent::Create, AuditEvent::Modify]);
    let row = store.row("Order", "1").await.unwrap();
    assert_eq!(row["status"], FieldValue::from("paid"));
}
