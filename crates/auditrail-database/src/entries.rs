//! Change tracking shared by the persistence contexts.

use std::collections::BTreeMap;

use auditrail_core::error::AppError;
use auditrail_core::result::AppResult;
use auditrail_core::traits::{ChangeTracker, EntityState, EntryId, TrackedEntry};
use auditrail_core::types::FieldValue;

use crate::entry::EntityEntry;

/// Tracked entries in insertion order, keyed by stable [`EntryId`]s.
#[derive(Debug, Default)]
pub struct EntrySet {
    entries: BTreeMap<EntryId, EntityEntry>,
    next_entry: usize,
}

impl EntrySet {
    /// Track a new entity for insertion.
    pub fn add(&mut self, entry: EntityEntry) -> EntryId {
        self.track(entry, EntityState::Added)
    }

    /// Track an already-stored entity with its values as originals.
    pub fn attach(&mut self, mut entry: EntityEntry) -> EntryId {
        entry.accept();
        self.track(entry, EntityState::Unchanged)
    }

    /// Mark an entity for deletion. A never-saved entity is simply forgotten.
    pub fn remove(&mut self, id: EntryId) -> AppResult<()> {
        let entry = self.require_mut(id)?;
        if entry.state() == EntityState::Added {
            self.entries.remove(&id);
        } else {
            entry.set_state(EntityState::Deleted);
        }
        Ok(())
    }

    /// Borrow a tracked entity.
    pub fn get(&self, id: EntryId) -> Option<&EntityEntry> {
        self.entries.get(&id)
    }

    /// Mutably borrow a tracked entity.
    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut EntityEntry> {
        self.entries.get_mut(&id)
    }

    /// Write one property of a tracked entity.
    pub fn set(&mut self, id: EntryId, name: &str, value: impl Into<FieldValue>) -> AppResult<()> {
        self.require_mut(id)?.set(name, value)
    }

    /// Treat every pending change as persisted.
    ///
    /// Deleted entries stop being tracked; all others become `Unchanged`
    /// with their current values as originals.
    pub fn accept_all_changes(&mut self) {
        self.entries
            .retain(|_, entry| entry.state() != EntityState::Deleted);
        for entry in self.entries.values_mut() {
            if entry.state().is_pending() {
                entry.accept();
                entry.set_state(EntityState::Unchanged);
            }
        }
    }

    /// Every tracked entry, mutably, in insertion order.
    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut EntityEntry> {
        self.entries.values_mut()
    }

    fn track(&mut self, mut entry: EntityEntry, state: EntityState) -> EntryId {
        entry.set_state(state);
        let id = EntryId(self.next_entry);
        self.next_entry += 1;
        self.entries.insert(id, entry);
        id
    }

    fn require_mut(&mut self, id: EntryId) -> AppResult<&mut EntityEntry> {
        self.entries
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Entry {id} is not tracked")))
    }
}

impl ChangeTracker for EntrySet {
    fn entry_ids(&self) -> Vec<EntryId> {
        self.entries.keys().copied().collect()
    }

    fn entry(&self, id: EntryId) -> Option<&dyn TrackedEntry> {
        self.entries.get(&id).map(|e| e as &dyn TrackedEntry)
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut dyn TrackedEntry> {
        self.entries.get_mut(&id).map(|e| e as &mut dyn TrackedEntry)
    }
}
