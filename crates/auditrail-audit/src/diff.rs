//! Property-level diffs between original and current entity values.

use auditrail_core::result::AppResult;
use auditrail_core::traits::TrackedEntry;
use auditrail_core::types::FieldValue;
use auditrail_entity::audit::model::MAX_VALUE_LENGTH;
use auditrail_entity::{AuditEvent, NewAuditLogDetail};

use crate::model::AuditModel;
use crate::properties::auditable_properties;

const ELLIPSIS: &str = "...";

/// One changed property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    /// Entity-type-qualified name, e.g. `Order.status`.
    pub property_name: String,
    /// Stored form of the original value.
    pub original_value: Option<String>,
    /// Stored form of the current value.
    pub new_value: Option<String>,
}

impl From<PropertyChange> for NewAuditLogDetail {
    fn from(change: PropertyChange) -> Self {
        Self {
            property_name: change.property_name,
            original_value: change.original_value,
            new_value: change.new_value,
        }
    }
}

/// Compute the changed auditable properties of an entry.
///
/// `Create` and `Delete` events never carry diffs, and neither do entity
/// types registered with auditing disabled. The result follows the
/// auditable-property order.
pub fn compute_diff(
    entry: &dyn TrackedEntry,
    event: AuditEvent,
    model: &AuditModel,
) -> AppResult<Vec<PropertyChange>> {
    if !event.carries_diff() || model.is_audit_disabled(entry.entity_type()) {
        return Ok(Vec::new());
    }

    let properties = auditable_properties(entry, model)?;
    let type_name = entry.type_name().to_string();

    let changes = properties
        .iter()
        .filter_map(|name| {
            let original = entry.original_value(name).unwrap_or_default();
            let current = entry.current_value(name).unwrap_or_default();
            (original != current).then(|| PropertyChange {
                property_name: format!("{type_name}.{name}"),
                original_value: stored_text(&original),
                new_value: stored_text(&current),
            })
        })
        .collect();

    Ok(changes)
}

/// Stringify and truncate a value for storage.
pub fn stored_text(value: &FieldValue) -> Option<String> {
    value.to_text().map(truncate)
}

/// Truncate to [`MAX_VALUE_LENGTH`] characters, marking the cut with `...`.
pub fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_VALUE_LENGTH {
        return text;
    }
    let keep = MAX_VALUE_LENGTH - ELLIPSIS.len();
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}
