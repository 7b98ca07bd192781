//! Audit log entity models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use auditrail_core::error::AppError;
use auditrail_core::result::AppResult;

use super::event::AuditEvent;

/// Maximum stored length of an original/new value.
pub const MAX_VALUE_LENGTH: usize = 128;
/// Maximum stored length of an entity key.
pub const MAX_ENTITY_ID_LENGTH: usize = 128;
/// Maximum stored length of an entity type, property name or operator key.
pub const MAX_NAME_LENGTH: usize = 64;

/// An immutable audit record for one changed entity in one save cycle.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    /// Monotonic surrogate key.
    pub id: i64,
    /// Comma-joined primary key values of the audited entity; empty if unresolvable.
    pub entity_id: String,
    /// Friendly name of the audited entity type.
    pub entity_type: String,
    /// The kind of change.
    #[sqlx(try_from = "String")]
    pub event_type: AuditEvent,
    /// When the record was assembled.
    pub event_time: DateTime<Utc>,
    /// Key of the acting operator, if any.
    pub operator_id: Option<String>,
    /// Changed properties, in auditable-property order.
    #[sqlx(skip)]
    pub details: Vec<AuditLogDetail>,
}

impl AuditLog {
    /// Find the detail row for a qualified property name such as `Order.status`.
    pub fn detail(&self, property_name: &str) -> Option<&AuditLogDetail> {
        self.details
            .iter()
            .find(|d| d.property_name == property_name)
    }
}

/// One changed property of an [`AuditLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AuditLogDetail {
    /// Surrogate key.
    pub id: i64,
    /// The owning audit log.
    pub audit_log_id: i64,
    /// Entity-type-qualified property name (e.g. `Order.status`).
    pub property_name: String,
    /// Value before the change, truncated to [`MAX_VALUE_LENGTH`].
    pub original_value: Option<String>,
    /// Value after the change, truncated to [`MAX_VALUE_LENGTH`].
    pub new_value: Option<String>,
}

/// Data required to insert an audit log and its details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditLog {
    /// Comma-joined primary key values.
    pub entity_id: String,
    /// Friendly entity type name.
    pub entity_type: String,
    /// The kind of change.
    pub event_type: AuditEvent,
    /// Assembly timestamp.
    pub event_time: DateTime<Utc>,
    /// Acting operator key.
    pub operator_id: Option<String>,
    /// Changed properties.
    pub details: Vec<NewAuditLogDetail>,
}

impl NewAuditLog {
    /// Check every field fits its column.
    ///
    /// Values are truncated when the diff is computed; keys and names are
    /// rejected instead, since a cut key no longer identifies anything.
    pub fn validate(&self) -> AppResult<()> {
        let fields = [
            ("entity id", self.entity_id.as_str(), MAX_ENTITY_ID_LENGTH),
            ("entity type", self.entity_type.as_str(), MAX_NAME_LENGTH),
            (
                "operator id",
                self.operator_id.as_deref().unwrap_or_default(),
                MAX_NAME_LENGTH,
            ),
        ];
        let names = self
            .details
            .iter()
            .map(|d| ("property name", d.property_name.as_str(), MAX_NAME_LENGTH));

        for (field, value, limit) in fields.into_iter().chain(names) {
            let length = value.chars().count();
            if length > limit {
                return Err(AppError::validation(format!(
                    "Audit log {field} '{value}' is {length} characters long, the limit is {limit}"
                ))
                .for_entity(self.entity_type.as_str()));
            }
        }
        Ok(())
    }

    /// Attach the identifiers assigned on insert.
    pub fn into_persisted(self, id: i64, detail_ids: impl IntoIterator<Item = i64>) -> AuditLog {
        let details = self
            .details
            .into_iter()
            .zip(detail_ids)
            .map(|(detail, detail_id)| AuditLogDetail {
                id: detail_id,
                audit_log_id: id,
                property_name: detail.property_name,
                original_value: detail.original_value,
                new_value: detail.new_value,
            })
            .collect();

        AuditLog {
            id,
            entity_id: self.entity_id,
            entity_type: self.entity_type,
            event_type: self.event_type,
            event_time: self.event_time,
            operator_id: self.operator_id,
            details,
        }
    }
}

/// Data required to insert one detail row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuditLogDetail {
    /// Qualified property name.
    pub property_name: String,
    /// Stringified original value.
    pub original_value: Option<String>,
    /// Stringified new value.
    pub new_value: Option<String>,
}
