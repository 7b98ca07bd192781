//! End-to-end audited saves over the in-memory context.

mod helpers;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use auditrail::entity::NewAuditLog;
use auditrail::{
    AppResult, AuditDbContext, AuditEvent, Capabilities, ChangeTracker, EntityEntry, EntityState,
    EntryId, ErrorKind, FieldValue, MemoryContext, MemoryStore, PersistenceContext, TrackedEntry,
};

#[tokio::test]
async fn test_create_log_uses_generated_key() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    let id = ctx.inner_mut().add(helpers::order("open"));

    let affected = ctx.save_changes(true, &helpers::token()).await.unwrap();
    assert_eq!(affected, 1);

    let logs = store.audit_logs().await;
    assert_eq!(logs.len(), 1);
    let log = &logs[0];
    assert_eq!(log.event_type, AuditEvent::Create);
    assert_eq!(log.entity_type, "Order");
    assert_eq!(log.entity_id, "1");
    assert_eq!(log.operator_id.as_deref(), Some("7"));
    assert!(log.details.is_empty());

    let entry = ctx.inner().get(id).unwrap();
    assert_eq!(entry.get("id"), FieldValue::Int(1));
    let row = store.row("Order", "1").await.unwrap();
    assert_eq!(row["creator_id"], FieldValue::Int(helpers::OPERATOR_KEY));
    assert!(matches!(row["creation_time"], FieldValue::Timestamp(_)));
}

#[tokio::test]
async fn test_modify_diff_covers_only_changed_auditable_properties() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    let id = ctx.inner_mut().attach(helpers::stored_order(5, "open"));
    ctx.inner_mut().set(id, "status", "paid").unwrap();
    ctx.inner_mut().set(id, "internal_note", "vip").unwrap();
    ctx.inner_mut().set(id, "total", 100).unwrap();

    ctx.save_changes(true, &helpers::token()).await.unwrap();

    let logs = helpers::logs_of(&store, "Order").await;
    assert_eq!(logs.len(), 1);
    let log = &logs[0];
    assert_eq!(log.event_type, AuditEvent::Modify);
    assert_eq!(log.entity_id, "5");
    assert_eq!(log.details.len(), 1);
    let detail = log.detail("Order.status").unwrap();
    assert_eq!(detail.original_value.as_deref(), Some("open"));
    assert_eq!(detail.new_value.as_deref(), Some("paid"));
    assert!(log.detail("Order.internal_note").is_none());
    assert!(log.detail("Order.last_modifier_id").is_none());

    let row = store.row("Order", "5").await.unwrap();
    assert_eq!(row["last_modifier_id"], FieldValue::Int(helpers::OPERATOR_KEY));
}

#[tokio::test]
async fn test_soft_delete_becomes_update() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    let id = ctx.inner_mut().attach(helpers::stored_order(3, "open"));
    ctx.inner_mut().remove(id).unwrap();

    ctx.save_changes(false, &helpers::token()).await.unwrap();

    let entry = ctx.inner().get(id).unwrap();
    assert_eq!(entry.state(), EntityState::Modified);
    assert_eq!(entry.get("is_deleted"), FieldValue::Bool(true));
    assert_eq!(entry.get("deleter_id"), FieldValue::Int(helpers::OPERATOR_KEY));

    let events: Vec<_> = store.audit_logs().await.iter().map(|l| l.event_type).collect();
    assert_eq!(events, vec![AuditEvent::SoftDelete]);
    let row = store.row("Order", "3").await.unwrap();
    assert_eq!(row["is_deleted"], FieldValue::Bool(true));
}

#[tokio::test]
async fn test_recovery() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    let id = ctx
        .inner_mut()
        .attach(helpers::stored_order(3, "open").with("is_deleted", true));
    ctx.inner_mut().set(id, "is_deleted", false).unwrap();

    ctx.save_changes(true, &helpers::token()).await.unwrap();

    let logs = store.audit_logs().await;
    assert_eq!(logs[0].event_type, AuditEvent::Recovery);
}

#[tokio::test]
async fn test_hard_delete_without_soft_delete_capability() {
    let store = MemoryStore::new();
    let mut seed = helpers::audited(&store);
    let tag = seed
        .inner_mut()
        .add(EntityEntry::new("Tag", Capabilities::NONE).with("label", "urgent"));
    seed.save_changes(true, &helpers::token()).await.unwrap();
    assert_eq!(store.count("Tag").await, 1);

    seed.inner_mut().remove(tag).unwrap();
    seed.save_changes(true, &helpers::token()).await.unwrap();

    assert_eq!(store.count("Tag").await, 0);
    let logs = helpers::logs_of(&store, "Tag").await;
    let events: Vec<_> = logs.iter().map(|l| l.event_type).collect();
    assert_eq!(events, vec![AuditEvent::Create, AuditEvent::Delete]);
    assert!(logs[1].details.is_empty());
    assert_eq!(logs[1].entity_id, "1");
}

#[tokio::test]
async fn test_anonymous_create_is_rejected_and_store_untouched() {
    let store = MemoryStore::new();
    let mut ctx = helpers::anonymous(&store);
    ctx.inner_mut().add(helpers::order("open"));

    let err = ctx.save_changes(true, &helpers::token()).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Authorization);
    assert_eq!(err.message, "Anonymous creation of Order is not allowed.");
    assert_eq!(store.count("Order").await, 0);
    assert!(store.audit_logs().await.is_empty());
    assert!(!ctx.inner().in_transaction());
}

#[tokio::test]
async fn test_anonymous_create_permitted_by_type_policy() {
    let store = MemoryStore::new();
    let mut ctx = helpers::anonymous(&store);
    let comment = EntityEntry::new("Comment", Capabilities::CREATION_AUDITED).with("body", "hi");
    ctx.inner_mut().add(comment);

    ctx.save_changes(true, &helpers::token()).await.unwrap();

    let logs = store.audit_logs().await;
    assert_eq!(logs.len(), 1);
    assert!(logs[0].operator_id.is_none());
    let row = store.row("Comment", "1").await.unwrap();
    assert_eq!(row["creator_id"], FieldValue::Null);
}

#[tokio::test]
async fn test_anonymous_operator_type_creation_is_exempt() {
    let store = MemoryStore::new();
    let mut ctx = helpers::anonymous(&store);
    ctx.inner_mut()
        .add(EntityEntry::new("User", Capabilities::CREATION_AUDITED).with("name", "ada"));

    ctx.save_changes(true, &helpers::token()).await.unwrap();
    assert_eq!(store.count("User").await, 1);
}

#[tokio::test]
async fn test_failed_audit_save_leaves_nothing_behind() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    ctx.inner_mut().add(helpers::order("open"));
    ctx.inner_mut().fail_nth_save(2);

    let err = ctx.save_changes(true, &helpers::token()).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Database);
    assert_eq!(store.count("Order").await, 0);
    assert!(store.audit_logs().await.is_empty());
    assert!(!ctx.inner().in_transaction());
}

#[tokio::test]
async fn test_long_values_are_truncated() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    let id = ctx.inner_mut().attach(helpers::stored_order(1, "open"));
    ctx.inner_mut().set(id, "status", "s".repeat(200)).unwrap();

    ctx.save_changes(true, &helpers::token()).await.unwrap();

    let logs = store.audit_logs().await;
    let stored = logs[0]
        .detail("Order.status")
        .and_then(|d| d.new_value.clone())
        .unwrap();
    assert_eq!(stored.chars().count(), 128);
    assert_eq!(stored, format!("{}...", "s".repeat(125)));
}

#[tokio::test]
async fn test_save_without_accepting_keeps_pending_state() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    let id = ctx.inner_mut().add(helpers::order("open"));

    ctx.save_changes(false, &helpers::token()).await.unwrap();

    assert_eq!(ctx.inner().get(id).unwrap().state(), EntityState::Added);
    assert_eq!(store.count("Order").await, 1);
    assert_eq!(store.audit_logs().await.len(), 1);

    ctx.inner_mut().accept_all_changes();
    assert_eq!(ctx.inner().get(id).unwrap().state(), EntityState::Unchanged);
}

#[tokio::test]
async fn test_cancelled_save_writes_nothing() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    ctx.inner_mut().add(helpers::order("open"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = ctx.save_changes(true, &cancel).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert_eq!(store.count("Order").await, 0);
    assert!(!ctx.inner().in_transaction());
}

/// Cancels the token as soon as the data save completes.
struct CancelAfterFirstSave {
    inner: MemoryContext,
    token: CancellationToken,
}

impl ChangeTracker for CancelAfterFirstSave {
    fn entry_ids(&self) -> Vec<EntryId> {
        self.inner.entry_ids()
    }

    fn entry(&self, id: EntryId) -> Option<&dyn TrackedEntry> {
        self.inner.entry(id)
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut dyn TrackedEntry> {
        self.inner.entry_mut(id)
    }
}

#[async_trait]
impl PersistenceContext for CancelAfterFirstSave {
    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    async fn begin_transaction(&mut self) -> AppResult<()> {
        self.inner.begin_transaction().await
    }

    async fn create_savepoint(&mut self, name: &str) -> AppResult<()> {
        self.inner.create_savepoint(name).await
    }

    async fn commit_transaction(&mut self) -> AppResult<()> {
        self.inner.commit_transaction().await
    }

    async fn rollback_transaction(&mut self) -> AppResult<()> {
        self.inner.rollback_transaction().await
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> AppResult<()> {
        self.inner.rollback_to_savepoint(name).await
    }

    async fn save(&mut self, accept_all_changes_on_success: bool) -> AppResult<u64> {
        let affected = self.inner.save(accept_all_changes_on_success).await?;
        self.token.cancel();
        Ok(affected)
    }

    fn add_audit_logs(&mut self, logs: Vec<NewAuditLog>) {
        self.inner.add_audit_logs(logs);
    }
}

#[tokio::test]
async fn test_cancellation_after_data_save_rolls_back() {
    let store = MemoryStore::new();
    let token = CancellationToken::new();
    let mut inner = MemoryContext::new(store.clone());
    inner.add(helpers::order("open"));
    let wrapped = CancelAfterFirstSave {
        inner,
        token: token.clone(),
    };
    let mut ctx = AuditDbContext::new(wrapped, helpers::model(), Default::default())
        .with_operator(helpers::operator());

    let err = ctx.save_changes(true, &token).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert_eq!(store.count("Order").await, 0);
    assert!(store.audit_logs().await.is_empty());
}

#[test]
fn test_blocking_save() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    ctx.inner_mut().add(helpers::order("open"));

    assert_eq!(ctx.save_changes_blocking(true).unwrap(), 1);

    let logs = block_on(store.audit_logs());
    assert_eq!(logs.len(), 1);
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}
