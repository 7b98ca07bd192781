//! Audit capture configuration.

use serde::{Deserialize, Serialize};

use crate::types::operation::DbOperation;

/// Options controlling how save cycles are audited.
///
/// Read-only during a save. Loaded from the `[audit]` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditOptions {
    /// Allow creating creator-tracked entities without an operator.
    #[serde(default)]
    pub allow_anonymous_create: bool,
    /// Allow modifying modifier-tracked entities without an operator.
    #[serde(default)]
    pub allow_anonymous_modify: bool,
    /// Allow deleting deleter-tracked entities without an operator.
    #[serde(default)]
    pub allow_anonymous_delete: bool,
    /// Never reject an anonymous creation of the operator's own entity type.
    ///
    /// This lets a user account be registered before anyone is signed in.
    #[serde(default = "default_true")]
    pub exempt_operator_type_on_create: bool,
    /// Column documentation emitted into generated schemas.
    #[serde(default)]
    pub comments: AuditEntityComments,
}

impl AuditOptions {
    /// Whether the global options alone permit `operation` without an operator.
    ///
    /// Only the single-operation flags `CREATE`, `UPDATE` and `DELETE` are
    /// meaningful here; any other value yields `false`.
    pub fn allows_anonymous(&self, operation: DbOperation) -> bool {
        if operation == DbOperation::CREATE {
            self.allow_anonymous_create
        } else if operation == DbOperation::UPDATE {
            self.allow_anonymous_modify
        } else if operation == DbOperation::DELETE {
            self.allow_anonymous_delete
        } else {
            false
        }
    }
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            allow_anonymous_create: false,
            allow_anonymous_modify: false,
            allow_anonymous_delete: false,
            exempt_operator_type_on_create: true,
            comments: AuditEntityComments::default(),
        }
    }
}

/// Descriptive text for the audit infrastructure columns of audited tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditEntityComments {
    /// Primary key column.
    pub id: String,
    /// Creation timestamp column.
    pub creation_time: String,
    /// Creator foreign key column.
    pub creator_id: String,
    /// Last modification timestamp column.
    pub last_modification_time: String,
    /// Last modifier foreign key column.
    pub last_modifier_id: String,
    /// Deletion timestamp column.
    pub deletion_time: String,
    /// Deleter foreign key column.
    pub deleter_id: String,
    /// Soft-delete flag column.
    pub is_deleted: String,
}

impl Default for AuditEntityComments {
    fn default() -> Self {
        Self {
            id: "Unique identifier for this entity.".to_string(),
            creation_time: "The time this entity was created.".to_string(),
            creator_id: "The primary key of the user who created this entity.".to_string(),
            last_modification_time: "The time this entity was last modified.".to_string(),
            last_modifier_id: "The primary key of the user who last modified this entity."
                .to_string(),
            deletion_time: "The time this entity was deleted.".to_string(),
            deleter_id: "The primary key of the user who deleted this entity.".to_string(),
            is_deleted: "Whether this entity is soft deleted.".to_string(),
        }
    }
}

impl AuditEntityComments {
    /// The text for an audit infrastructure column, `None` for any other.
    pub fn for_column(&self, column: &str) -> Option<&str> {
        let text = match column {
            "id" => &self.id,
            "creation_time" => &self.creation_time,
            "creator_id" => &self.creator_id,
            "last_modification_time" => &self.last_modification_time,
            "last_modifier_id" => &self.last_modifier_id,
            "deletion_time" => &self.deletion_time,
            "deleter_id" => &self.deleter_id,
            "is_deleted" => &self.is_deleted,
            _ => return None,
        };
        Some(text.as_str())
    }
}

fn default_true() -> bool {
    true
}
