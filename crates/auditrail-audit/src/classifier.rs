//! Event classification.
//!
//! Maps each pending entry's lifecycle state to an [`AuditEvent`] and stamps
//! the audit fields the entity carries. Soft-delete capable entities that
//! are pending deletion are turned into updates before the underlying save
//! runs.

use chrono::{DateTime, Utc};
use tracing::trace;

use auditrail_core::config::AuditOptions;
use auditrail_core::error::AppError;
use auditrail_core::result::AppResult;
use auditrail_core::traits::{ChangeTracker, EntityState, EntryId, TrackedEntry};
use auditrail_core::types::{DbOperation, FieldValue};
use auditrail_entity::{AuditEvent, Operator};

use crate::constants::{
    CREATION_TIME, CREATOR_ID, DELETER_ID, DELETION_TIME, IS_DELETED, LAST_MODIFICATION_TIME,
    LAST_MODIFIER_ID,
};
use crate::model::AuditModel;
use crate::policy::ensure_anonymous_allowed;

/// A pending entry paired with the audit event it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedChange {
    /// The entry inside the change tracker.
    pub entry_id: EntryId,
    /// The event to record.
    pub event: AuditEvent,
}

/// Classify every pending entry of `tracker`, stamping audit fields with `now`.
///
/// Fails with an authorization error on the first anonymous write that
/// nothing permits. Entries already stamped before the failure keep their
/// stamps; the caller is expected to roll back.
pub fn classify<T>(
    tracker: &mut T,
    operator: Option<&Operator>,
    options: &AuditOptions,
    model: &AuditModel,
    now: DateTime<Utc>,
) -> AppResult<Vec<ClassifiedChange>>
where
    T: ChangeTracker + ?Sized,
{
    let actor = operator.map(|o| o.key.clone()).unwrap_or_default();
    let stamp = Stamp { now, actor: &actor };
    let mut changes = Vec::new();

    for entry_id in tracker.entry_ids() {
        let entry = tracker
            .entry_mut(entry_id)
            .ok_or_else(|| AppError::internal(format!("Tracked entry {entry_id} vanished")))?;

        let event = match entry.state() {
            EntityState::Added => classify_added(entry, operator, options, model, &stamp)?,
            EntityState::Modified => classify_modified(entry, operator, options, model, &stamp)?,
            EntityState::Deleted => classify_deleted(entry, operator, options, model, &stamp)?,
            EntityState::Unchanged | EntityState::Detached => continue,
        };

        trace!(entity_type = entry.entity_type(), %entry_id, %event, "Classified change");
        changes.push(ClassifiedChange { entry_id, event });
    }

    Ok(changes)
}

/// The event a `Modified` entry produces, without stamping anything.
///
/// A flipped soft-delete flag turns the update into `SoftDelete` (set) or
/// `Recovery` (cleared).
pub fn modified_event(entry: &dyn TrackedEntry) -> AuditEvent {
    if !entry.capabilities().soft_delete {
        return AuditEvent::Modify;
    }

    let original = entry.original_value(IS_DELETED).unwrap_or_default();
    let current = entry.current_value(IS_DELETED).unwrap_or_default();
    if original == current {
        return AuditEvent::Modify;
    }

    match current.as_bool() {
        Some(true) => AuditEvent::SoftDelete,
        _ => AuditEvent::Recovery,
    }
}

struct Stamp<'a> {
    now: DateTime<Utc>,
    actor: &'a FieldValue,
}

fn classify_added(
    entry: &mut dyn TrackedEntry,
    operator: Option<&Operator>,
    options: &AuditOptions,
    model: &AuditModel,
    stamp: &Stamp<'_>,
) -> AppResult<AuditEvent> {
    let capabilities = entry.capabilities();
    if capabilities.creator {
        check(entry, DbOperation::CREATE, operator, options, model)?;
        entry.set_current_value(CREATOR_ID, stamp.actor.clone())?;
    }
    if capabilities.creation_time {
        entry.set_current_value(CREATION_TIME, stamp.now.into())?;
    }
    Ok(AuditEvent::Create)
}

fn classify_modified(
    entry: &mut dyn TrackedEntry,
    operator: Option<&Operator>,
    options: &AuditOptions,
    model: &AuditModel,
    stamp: &Stamp<'_>,
) -> AppResult<AuditEvent> {
    let capabilities = entry.capabilities();
    if capabilities.modifier {
        check(entry, DbOperation::UPDATE, operator, options, model)?;
        entry.set_current_value(LAST_MODIFIER_ID, stamp.actor.clone())?;
    }
    if capabilities.modification_time {
        entry.set_current_value(LAST_MODIFICATION_TIME, stamp.now.into())?;
    }
    Ok(modified_event(entry))
}

fn classify_deleted(
    entry: &mut dyn TrackedEntry,
    operator: Option<&Operator>,
    options: &AuditOptions,
    model: &AuditModel,
    stamp: &Stamp<'_>,
) -> AppResult<AuditEvent> {
    let capabilities = entry.capabilities();
    if capabilities.deleter {
        check(entry, DbOperation::DELETE, operator, options, model)?;
        entry.set_current_value(DELETER_ID, stamp.actor.clone())?;
    }
    if capabilities.deletion_time {
        entry.set_current_value(DELETION_TIME, stamp.now.into())?;
    }

    if !capabilities.soft_delete {
        return Ok(AuditEvent::Delete);
    }

    entry.set_current_value(IS_DELETED, FieldValue::Bool(true))?;
    entry.set_state(EntityState::Modified);
    Ok(AuditEvent::SoftDelete)
}

fn check(
    entry: &dyn TrackedEntry,
    operation: DbOperation,
    operator: Option<&Operator>,
    options: &AuditOptions,
    model: &AuditModel,
) -> AppResult<()> {
    let display_name = entry.type_name().to_string();
    ensure_anonymous_allowed(
        operation,
        entry.entity_type(),
        &display_name,
        operator,
        options,
        model,
    )
}
