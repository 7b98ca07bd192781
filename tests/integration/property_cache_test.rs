//! Shared auditable-property cache under concurrent saves.

mod helpers;

use std::sync::Arc;

use chrono::Utc;

use auditrail::audit::classifier::classify;
use auditrail::audit::properties::auditable_properties;
use auditrail::{
    AuditDbContext, AuditEvent, AuditOptions, Capabilities, EntityEntry, MemoryContext,
    MemoryStore,
};

#[test]
fn test_concurrent_first_use_agrees_on_one_set() {
    let model = helpers::model();
    let entry = helpers::order("open");

    let sets: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| auditable_properties(&entry, &model).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let cached = model.property_cache().get("Order").unwrap();
    assert_eq!(&*cached, &["status".to_string(), "total".to_string()]);
    for set in &sets {
        assert!(Arc::ptr_eq(set, &cached));
    }
    assert_eq!(model.property_cache().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_save_cycles_share_model() {
    let model = helpers::model();
    let mut tasks = Vec::new();

    for i in 0..16 {
        let model = Arc::clone(&model);
        tasks.push(tokio::spawn(async move {
            let store = MemoryStore::new();
            let mut ctx = AuditDbContext::new(
                MemoryContext::new(store.clone()),
                model,
                AuditOptions::default(),
            )
            .with_operator(helpers::operator());
            let id = ctx.inner_mut().attach(helpers::stored_order(1, "open"));
            ctx.inner_mut().set(id, "status", format!("step-{i}")).unwrap();
            ctx.save_changes(true, &helpers::token()).await.unwrap();
            store.audit_logs().await
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let logs = task.await.unwrap();
        assert_eq!(logs.len(), 1);
        let detail = logs[0].detail("Order.status").unwrap();
        assert_eq!(detail.new_value.as_deref(), Some(format!("step-{i}").as_str()));
    }
    assert_eq!(model.property_cache().len(), 1);
}

#[tokio::test]
async fn test_disabled_type_logs_without_details_and_is_not_cached() {
    let store = MemoryStore::new();
    let mut ctx = helpers::audited(&store);
    let session = EntityEntry::new("Session", Capabilities::NONE)
        .with("id", 4)
        .with("token", "a");
    let id = ctx.inner_mut().attach(session);
    ctx.inner_mut().set(id, "token", "b").unwrap();

    ctx.save_changes(true, &helpers::token()).await.unwrap();

    let logs = helpers::logs_of(&store, "Session").await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].event_type, AuditEvent::Modify);
    assert_eq!(logs[0].entity_id, "4");
    assert!(logs[0].details.is_empty());
    assert!(ctx.model().property_cache().get("Session").is_none());
}

#[test]
fn test_classification_is_repeatable() {
    let model = helpers::model();
    let operator = helpers::operator();
    let options = AuditOptions::default();
    let mut ctx = MemoryContext::new(MemoryStore::new());
    let added = ctx.add(helpers::order("open"));
    let stored = ctx.attach(helpers::stored_order(2, "open"));
    ctx.set(stored, "status", "shipped").unwrap();
    let now = Utc::now();

    let first = classify(&mut ctx, Some(&operator), &options, &model, now).unwrap();
    let snapshot = (ctx.get(added).cloned(), ctx.get(stored).cloned());
    let second = classify(&mut ctx, Some(&operator), &options, &model, now).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].event, AuditEvent::Create);
    assert_eq!(first[1].event, AuditEvent::Modify);
    assert_eq!(snapshot, (ctx.get(added).cloned(), ctx.get(stored).cloned()));
}
