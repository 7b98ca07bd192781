//! The acting principal of a save cycle.

use serde::{Deserialize, Serialize};

use auditrail_core::types::FieldValue;

/// The user on whose behalf changes are saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    /// Registration key of the operator's own entity type (e.g. `"User"`).
    pub entity_type: String,
    /// Primary key of the operator, stamped into creator/modifier/deleter fields.
    pub key: FieldValue,
    /// Display name for logs.
    pub name: Option<String>,
}

impl Operator {
    /// Create an operator.
    pub fn new(entity_type: impl Into<String>, key: impl Into<FieldValue>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
            name: None,
        }
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Text form of the key, as stored in `audit_logs.operator_id`.
    pub fn id(&self) -> Option<String> {
        self.key.to_text()
    }
}
