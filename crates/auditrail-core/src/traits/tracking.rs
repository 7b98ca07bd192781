//! Change-tracking contract supplied by the persistence collaborator.
//!
//! A save cycle observes every tracked entity through [`TrackedEntry`]:
//! its lifecycle state, the audit fields it carries, and original versus
//! current property values. The collaborator owns the entries; the audit
//! engine only borrows them for the duration of one save.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::types::{FieldValue, TypeName};

/// Lifecycle state of a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    /// Not tracked.
    Detached,
    /// Tracked, no pending change.
    Unchanged,
    /// Pending insert.
    Added,
    /// Pending update.
    Modified,
    /// Pending delete.
    Deleted,
}

impl EntityState {
    /// Whether a save would write this entity.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Added | Self::Modified | Self::Deleted)
    }

    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detached => "detached",
            Self::Unchanged => "unchanged",
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The audit fields an entity type carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// Has a `creation_time` field.
    pub creation_time: bool,
    /// Has a `creator_id` field.
    pub creator: bool,
    /// Has a `last_modification_time` field.
    pub modification_time: bool,
    /// Has a `last_modifier_id` field.
    pub modifier: bool,
    /// Has a `deletion_time` field.
    pub deletion_time: bool,
    /// Has a `deleter_id` field.
    pub deleter: bool,
    /// Has an `is_deleted` flag and is deleted by update.
    pub soft_delete: bool,
}

impl Capabilities {
    /// No audit fields.
    pub const NONE: Self = Self {
        creation_time: false,
        creator: false,
        modification_time: false,
        modifier: false,
        deletion_time: false,
        deleter: false,
        soft_delete: false,
    };

    /// Creation time and creator.
    pub const CREATION_AUDITED: Self = Self {
        creation_time: true,
        creator: true,
        ..Self::NONE
    };

    /// Modification time and modifier.
    pub const MODIFICATION_AUDITED: Self = Self {
        modification_time: true,
        modifier: true,
        ..Self::NONE
    };

    /// Soft delete with deletion time and deleter.
    pub const DELETION_AUDITED: Self = Self {
        deletion_time: true,
        deleter: true,
        soft_delete: true,
        ..Self::NONE
    };

    /// Creation and modification auditing.
    pub const CREATION_AND_MODIFICATION_AUDITED: Self =
        Self::CREATION_AUDITED.union(Self::MODIFICATION_AUDITED);

    /// Every audit field.
    pub const FULL_AUDITED: Self =
        Self::CREATION_AND_MODIFICATION_AUDITED.union(Self::DELETION_AUDITED);

    /// Combine two capability sets.
    pub const fn union(self, other: Self) -> Self {
        Self {
            creation_time: self.creation_time || other.creation_time,
            creator: self.creator || other.creator,
            modification_time: self.modification_time || other.modification_time,
            modifier: self.modifier || other.modifier,
            deletion_time: self.deletion_time || other.deletion_time,
            deleter: self.deleter || other.deleter,
            soft_delete: self.soft_delete || other.soft_delete,
        }
    }
}

/// A transient view over one tracked entity instance.
pub trait TrackedEntry: Send + Sync {
    /// Registration key of the entity type (e.g. `"Order"`).
    fn entity_type(&self) -> &str;

    /// Friendly, generics-aware name of the entity type.
    fn type_name(&self) -> TypeName {
        TypeName::parse(self.entity_type())
    }

    /// Current lifecycle state.
    fn state(&self) -> EntityState;

    /// Change the lifecycle state the next save will act on.
    fn set_state(&mut self, state: EntityState);

    /// Audit fields this entity carries.
    fn capabilities(&self) -> Capabilities;

    /// Persisted property names, in model order.
    fn property_names(&self) -> Vec<String>;

    /// Value of `property` when the entity was loaded or last saved.
    ///
    /// Returns `None` if the property does not exist.
    fn original_value(&self, property: &str) -> Option<FieldValue>;

    /// Value of `property` as currently held in memory.
    ///
    /// Returns `None` if the property does not exist.
    fn current_value(&self, property: &str) -> Option<FieldValue>;

    /// Overwrite the in-memory value of `property`.
    fn set_current_value(&mut self, property: &str, value: FieldValue) -> AppResult<()>;

    /// Ordered primary key values. Generated keys read `Null` until saved.
    fn key_values(&self) -> Vec<FieldValue>;
}

/// Handle to an entry inside a [`ChangeTracker`], stable for one save cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub usize);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Enumerates the entities tracked by a unit of work.
pub trait ChangeTracker {
    /// Every tracked entry, in tracking order.
    fn entry_ids(&self) -> Vec<EntryId>;

    /// Borrow an entry.
    fn entry(&self, id: EntryId) -> Option<&dyn TrackedEntry>;

    /// Mutably borrow an entry.
    fn entry_mut(&mut self, id: EntryId) -> Option<&mut dyn TrackedEntry>;
}
