//! Audit event vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use auditrail_core::AppError;

/// The kind of change an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditEvent {
    /// The entity was inserted.
    Create,
    /// The entity was updated.
    Modify,
    /// The entity was physically removed.
    Delete,
    /// The entity was flagged as deleted.
    SoftDelete,
    /// A soft-deleted entity was restored.
    Recovery,
}

impl AuditEvent {
    /// Whether records of this event carry property-level diffs.
    ///
    /// Inserts and physical deletes have no comparable before/after state.
    pub fn carries_diff(&self) -> bool {
        !matches!(self, Self::Create | Self::Delete)
    }

    /// Return the event as its stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Modify => "Modify",
            Self::Delete => "Delete",
            Self::SoftDelete => "SoftDelete",
            Self::Recovery => "Recovery",
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuditEvent {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "modify" => Ok(Self::Modify),
            "delete" => Ok(Self::Delete),
            "softdelete" | "soft_delete" => Ok(Self::SoftDelete),
            "recovery" => Ok(Self::Recovery),
            _ => Err(AppError::validation(format!(
                "Invalid audit event: '{s}'. Expected one of: Create, Modify, Delete, SoftDelete, Recovery"
            ))),
        }
    }
}

impl TryFrom<String> for AuditEvent {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
