//! Audit log assembly.

use chrono::Utc;

use auditrail_core::result::AppResult;
use auditrail_core::traits::TrackedEntry;
use auditrail_entity::{AuditEvent, NewAuditLog, NewAuditLogDetail, Operator};

use crate::diff::compute_diff;
use crate::model::AuditModel;

/// Build the audit record for one classified entry.
///
/// The event time is read here, not at classification.
pub fn build_audit_log(
    entry: &dyn TrackedEntry,
    event: AuditEvent,
    operator: Option<&Operator>,
    model: &AuditModel,
) -> AppResult<NewAuditLog> {
    let details = compute_diff(entry, event, model)?
        .into_iter()
        .map(NewAuditLogDetail::from)
        .collect();

    let log = NewAuditLog {
        entity_id: resolve_entity_id(entry),
        entity_type: entry.type_name().to_string(),
        event_type: event,
        event_time: Utc::now(),
        operator_id: operator.and_then(Operator::id),
        details,
    };
    log.validate()?;
    Ok(log)
}

/// Comma-joined key values, or an empty string when no key is known yet.
pub fn resolve_entity_id(entry: &dyn TrackedEntry) -> String {
    let keys = entry.key_values();
    if keys.iter().all(|k| k.is_null()) {
        return String::new();
    }
    keys.iter()
        .map(|k| k.to_text().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}
