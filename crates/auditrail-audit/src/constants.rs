//! Names of the audit infrastructure properties.
//!
//! These are stamped by the classifier and never diffed.

/// Primary key.
pub const ID: &str = "id";
/// Creation timestamp.
pub const CREATION_TIME: &str = "creation_time";
/// Creator foreign key.
pub const CREATOR_ID: &str = "creator_id";
/// Last modification timestamp.
pub const LAST_MODIFICATION_TIME: &str = "last_modification_time";
/// Last modifier foreign key.
pub const LAST_MODIFIER_ID: &str = "last_modifier_id";
/// Deletion timestamp.
pub const DELETION_TIME: &str = "deletion_time";
/// Deleter foreign key.
pub const DELETER_ID: &str = "deleter_id";
/// Soft-delete flag.
pub const IS_DELETED: &str = "is_deleted";

/// Every infrastructure property name.
pub const INFRASTRUCTURE_PROPERTIES: [&str; 8] = [
    ID,
    CREATION_TIME,
    CREATOR_ID,
    LAST_MODIFICATION_TIME,
    LAST_MODIFIER_ID,
    DELETION_TIME,
    DELETER_ID,
    IS_DELETED,
];

/// Whether `name` is an infrastructure property (ASCII case-insensitive).
pub fn is_infrastructure_property(name: &str) -> bool {
    INFRASTRUCTURE_PROPERTIES
        .iter()
        .any(|p| p.eq_ignore_ascii_case(name))
}
