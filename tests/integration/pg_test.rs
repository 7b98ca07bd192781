//! Audit storage against a live PostgreSQL.
//!
//! Run with `AUDITRAIL_TEST_DATABASE_URL` set and `--ignored`.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use auditrail::database::migration::run_migrations;
use auditrail::database::{AuditLogFilter, DatabasePool};
use auditrail::entity::{NewAuditLog, NewAuditLogDetail};
use auditrail::{
    AuditDbContext, AuditEvent, AuditModel, AuditOptions, Capabilities, EntityEntry, Operator,
    PersistenceContext,
};
use auditrail_core::config::DatabaseConfig;
use auditrail_core::types::PageRequest;

async fn pool() -> anyhow::Result<DatabasePool> {
    let url = std::env::var("AUDITRAIL_TEST_DATABASE_URL")?;
    let config = DatabaseConfig {
        max_connections: 2,
        ..DatabaseConfig::with_url(url)
    };
    let db = DatabasePool::connect(&config).await?;
    run_migrations(db.pool()).await?;
    Ok(db)
}

/// A log as the engine would assemble it: only modifications carry details.
fn log(entity_type: &str, entity_id: &str, event: AuditEvent) -> NewAuditLog {
    let details = if event.carries_diff() {
        vec![NewAuditLogDetail {
            property_name: format!("{entity_type}.status"),
            original_value: Some("open".to_string()),
            new_value: Some("paid".to_string()),
        }]
    } else {
        Vec::new()
    };
    NewAuditLog {
        entity_id: entity_id.to_string(),
        entity_type: entity_type.to_string(),
        event_type: event,
        event_time: Utc::now(),
        operator_id: Some("7".to_string()),
        details,
    }
}

/// Create a fully audited table named after a fresh entity type.
async fn order_table(db: &DatabasePool) -> anyhow::Result<String> {
    let table = format!("Order_{}", Uuid::new_v4().simple());
    sqlx::query(&format!(
        "CREATE TABLE \"{table}\" (\
            id BIGSERIAL PRIMARY KEY, \
            creation_time TIMESTAMPTZ, \
            creator_id BIGINT, \
            last_modification_time TIMESTAMPTZ, \
            last_modifier_id BIGINT, \
            deletion_time TIMESTAMPTZ, \
            deleter_id BIGINT, \
            is_deleted BOOLEAN NOT NULL DEFAULT FALSE, \
            status TEXT, \
            total BIGINT)"
    ))
    .execute(db.pool())
    .await?;
    Ok(table)
}

async fn drop_table(db: &DatabasePool, table: &str) -> anyhow::Result<()> {
    sqlx::query(&format!("DROP TABLE \"{table}\""))
        .execute(db.pool())
        .await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires AUDITRAIL_TEST_DATABASE_URL"]
async fn test_savepoint_rollback_keeps_outer_inserts() -> anyhow::Result<()> {
    let db = pool().await?;
    let entity_type = format!("Order{}", Uuid::new_v4().simple());

    let mut tx = db.begin().await?;
    tx.insert_audit_logs(vec![log(&entity_type, "1", AuditEvent::Modify)])
        .await?;
    tx.savepoint("audit_nested").await?;
    tx.insert_audit_logs(vec![log(&entity_type, "1", AuditEvent::Delete)])
        .await?;
    tx.rollback_to("audit_nested").await?;
    tx.commit().await?;

    let history = db.audit_logs().find_by_entity(&entity_type, "1").await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].event_type, AuditEvent::Modify);
    assert_eq!(history[0].details.len(), 1);
    assert_eq!(history[0].details[0].new_value.as_deref(), Some("paid"));

    db.close().await;
    Ok(())
}

#[tokio::test]
#[ignore = "requires AUDITRAIL_TEST_DATABASE_URL"]
async fn test_rolled_back_transaction_is_invisible() -> anyhow::Result<()> {
    let db = pool().await?;
    let entity_type = format!("Order{}", Uuid::new_v4().simple());

    let mut tx = db.begin().await?;
    tx.insert_audit_logs(vec![log(&entity_type, "2", AuditEvent::Modify)])
        .await?;
    tx.rollback().await?;

    let filter = AuditLogFilter {
        entity_type: Some(entity_type),
        ..Default::default()
    };
    let page = db
        .audit_logs()
        .search(&filter, &PageRequest::new(1, 10))
        .await?;
    assert_eq!(page.total_items, 0);

    db.close().await;
    Ok(())
}

#[tokio::test]
#[ignore = "requires AUDITRAIL_TEST_DATABASE_URL"]
async fn test_audited_save_writes_rows_and_history() -> anyhow::Result<()> {
    let db = pool().await?;
    let table = order_table(&db).await?;
    let model = Arc::new(AuditModel::builder().operator_type("User").build());
    let mut ctx = AuditDbContext::new(db.context(), model, AuditOptions::default())
        .with_operator(Operator::new("User", 7));
    let cancel = CancellationToken::new();

    let id = ctx.inner_mut().add(
        EntityEntry::new(&table, Capabilities::FULL_AUDITED)
            .with("status", "open")
            .with("total", 100),
    );
    ctx.save_changes(true, &cancel).await?;
    assert!(!ctx.inner().in_transaction());
    let key = ctx.inner().get(id).unwrap().key_text();

    ctx.inner_mut().set(id, "status", "paid")?;
    ctx.save_changes(true, &cancel).await?;

    let history = db.audit_logs().find_by_entity(&table, &key).await?;
    let events: Vec<_> = history.iter().map(|l| l.event_type).collect();
    assert_eq!(events, vec![AuditEvent::Create, AuditEvent::Modify]);
    assert!(history[0].details.is_empty());
    assert_eq!(history[0].operator_id.as_deref(), Some("7"));
    let status = history[1].detail(&format!("{table}.status")).unwrap();
    assert_eq!(status.original_value.as_deref(), Some("open"));
    assert_eq!(status.new_value.as_deref(), Some("paid"));

    let (stored, creator): (String, i64) = sqlx::query_as(&format!(
        "SELECT status, creator_id FROM \"{table}\" WHERE id = $1"
    ))
    .bind(key.parse::<i64>()?)
    .fetch_one(db.pool())
    .await?;
    assert_eq!(stored, "paid");
    assert_eq!(creator, 7);

    drop_table(&db, &table).await?;
    db.close().await;
    Ok(())
}

#[tokio::test]
#[ignore = "requires AUDITRAIL_TEST_DATABASE_URL"]
async fn test_failed_audited_save_leaves_no_trace() -> anyhow::Result<()> {
    let db = pool().await?;
    let table = order_table(&db).await?;
    let model = Arc::new(AuditModel::builder().operator_type("User").build());
    let mut ctx = AuditDbContext::new(db.context(), model, AuditOptions::default())
        .with_operator(Operator::new("User", 7));

    ctx.inner_mut().add(
        EntityEntry::new(&table, Capabilities::FULL_AUDITED)
            .with("status", "open")
            .with("missing_column", 1),
    );
    assert!(ctx.save_changes(true, &CancellationToken::new()).await.is_err());
    assert!(!ctx.inner().in_transaction());

    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{table}\""))
        .fetch_one(db.pool())
        .await?;
    assert_eq!(count, 0);
    let filter = AuditLogFilter {
        entity_type: Some(table.clone()),
        ..Default::default()
    };
    let page = db
        .audit_logs()
        .search(&filter, &PageRequest::new(1, 10))
        .await?;
    assert_eq!(page.total_items, 0);

    drop_table(&db, &table).await?;
    db.close().await;
    Ok(())
}
