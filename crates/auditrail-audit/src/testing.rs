//! In-crate test doubles for the change-tracking and persistence contracts.

use async_trait::async_trait;

use auditrail_core::error::AppError;
use auditrail_core::result::AppResult;
use auditrail_core::traits::{Capabilities, ChangeTracker, EntityState, EntryId, TrackedEntry};
use auditrail_core::types::FieldValue;
use auditrail_entity::NewAuditLog;

use crate::context::PersistenceContext;

#[derive(Debug, Clone)]
pub struct FakeEntry {
    entity_type: String,
    state: EntityState,
    capabilities: Capabilities,
    properties: Vec<(String, FieldValue, FieldValue)>,
    unreadable: Vec<String>,
    keys: Vec<String>,
}

impl FakeEntry {
    pub fn new(entity_type: &str, capabilities: Capabilities) -> Self {
        let mut entry = Self {
            entity_type: entity_type.to_string(),
            state: EntityState::Unchanged,
            capabilities,
            properties: Vec::new(),
            unreadable: Vec::new(),
            keys: vec!["id".to_string()],
        };
        for (enabled, name, value) in [
            (capabilities.creation_time, "creation_time", FieldValue::Null),
            (capabilities.creator, "creator_id", FieldValue::Null),
            (capabilities.modification_time, "last_modification_time", FieldValue::Null),
            (capabilities.modifier, "last_modifier_id", FieldValue::Null),
            (capabilities.deletion_time, "deletion_time", FieldValue::Null),
            (capabilities.deleter, "deleter_id", FieldValue::Null),
            (capabilities.soft_delete, "is_deleted", FieldValue::Bool(false)),
        ] {
            if enabled {
                entry
                    .properties
                    .push((name.to_string(), value.clone(), value));
            }
        }
        entry
    }

    pub fn with_state(mut self, state: EntityState) -> Self {
        self.state = state;
        self
    }

    pub fn with_keys(mut self, keys: &[&str]) -> Self {
        self.keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_property(self, name: &str, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        self.with_change(name, value.clone(), value)
    }

    pub fn with_change(
        mut self,
        name: &str,
        original: impl Into<FieldValue>,
        current: impl Into<FieldValue>,
    ) -> Self {
        let (original, current) = (original.into(), current.into());
        match self.properties.iter_mut().find(|(n, _, _)| n == name) {
            Some(slot) => {
                slot.1 = original;
                slot.2 = current;
            }
            None => self.properties.push((name.to_string(), original, current)),
        }
        self
    }

    pub fn with_unreadable_property(mut self, name: &str) -> Self {
        self.unreadable.push(name.to_string());
        self
    }

    pub fn value(&self, name: &str) -> FieldValue {
        self.current_value(name).unwrap_or_default()
    }
}

impl TrackedEntry for FakeEntry {
    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn state(&self) -> EntityState {
        self.state
    }

    fn set_state(&mut self, state: EntityState) {
        self.state = state;
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn property_names(&self) -> Vec<String> {
        self.properties
            .iter()
            .map(|(n, _, _)| n.clone())
            .chain(self.unreadable.iter().cloned())
            .collect()
    }

    fn original_value(&self, property: &str) -> Option<FieldValue> {
        self.properties
            .iter()
            .find(|(n, _, _)| n == property)
            .map(|(_, o, _)| o.clone())
    }

    fn current_value(&self, property: &str) -> Option<FieldValue> {
        self.properties
            .iter()
            .find(|(n, _, _)| n == property)
            .map(|(_, _, c)| c.clone())
    }

    fn set_current_value(&mut self, property: &str, value: FieldValue) -> AppResult<()> {
        let slot = self
            .properties
            .iter_mut()
            .find(|(n, _, _)| n == property)
            .ok_or_else(|| AppError::internal(format!("Unknown property '{property}'")))?;
        slot.2 = value;
        Ok(())
    }

    fn key_values(&self) -> Vec<FieldValue> {
        self.keys.iter().map(|k| self.value(k)).collect()
    }
}

#[derive(Debug, Default)]
pub struct FakeTracker {
    pub entries: Vec<FakeEntry>,
}

impl FakeTracker {
    pub fn new(entries: Vec<FakeEntry>) -> Self {
        Self { entries }
    }
}

impl ChangeTracker for FakeTracker {
    fn entry_ids(&self) -> Vec<EntryId> {
        (0..self.entries.len()).map(EntryId).collect()
    }

    fn entry(&self, id: EntryId) -> Option<&dyn TrackedEntry> {
        self.entries.get(id.0).map(|e| e as &dyn TrackedEntry)
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut dyn TrackedEntry> {
        self.entries.get_mut(id.0).map(|e| e as &mut dyn TrackedEntry)
    }
}

/// A persistence context that records every call it receives.
#[derive(Debug, Default)]
pub struct ScriptedContext {
    pub tracker: FakeTracker,
    pub journal: Vec<String>,
    pub pending_logs: Vec<NewAuditLog>,
    pub saved_logs: Vec<NewAuditLog>,
    pub open_transaction: bool,
    pub fail_save: Option<usize>,
    pub fail_begin: bool,
    saves: usize,
    next_key: i64,
}

impl ScriptedContext {
    pub fn new(entries: Vec<FakeEntry>) -> Self {
        Self {
            tracker: FakeTracker::new(entries),
            next_key: 100,
            ..Self::default()
        }
    }

    pub fn in_outer_transaction(mut self) -> Self {
        self.open_transaction = true;
        self
    }

    pub fn failing_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }

    /// Make the `n`th save call (1-based) fail.
    pub fn failing_save(mut self, n: usize) -> Self {
        self.fail_save = Some(n);
        self
    }
}

impl ChangeTracker for ScriptedContext {
    fn entry_ids(&self) -> Vec<EntryId> {
        self.tracker.entry_ids()
    }

    fn entry(&self, id: EntryId) -> Option<&dyn TrackedEntry> {
        self.tracker.entry(id)
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut dyn TrackedEntry> {
        self.tracker.entry_mut(id)
    }
}

#[async_trait]
impl PersistenceContext for ScriptedContext {
    fn in_transaction(&self) -> bool {
        self.open_transaction
    }

    async fn begin_transaction(&mut self) -> AppResult<()> {
        if self.fail_begin {
            return Err(AppError::database("scripted begin failure"));
        }
        self.journal.push("begin".into());
        self.open_transaction = true;
        Ok(())
    }

    async fn create_savepoint(&mut self, name: &str) -> AppResult<()> {
        self.journal.push(format!("savepoint {name}"));
        Ok(())
    }

    async fn commit_transaction(&mut self) -> AppResult<()> {
        self.journal.push("commit".into());
        self.open_transaction = false;
        Ok(())
    }

    async fn rollback_transaction(&mut self) -> AppResult<()> {
        self.journal.push("rollback".into());
        self.open_transaction = false;
        self.pending_logs.clear();
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> AppResult<()> {
        self.journal.push(format!("rollback to {name}"));
        self.pending_logs.clear();
        Ok(())
    }

    async fn save(&mut self, _accept_all_changes_on_success: bool) -> AppResult<u64> {
        self.saves += 1;
        self.journal.push(format!("save {}", self.saves));
        if self.fail_save == Some(self.saves) {
            return Err(AppError::database("scripted save failure"));
        }

        let mut affected = 0;
        for entry in &mut self.tracker.entries {
            if !entry.state().is_pending() {
                continue;
            }
            affected += 1;
            if entry.state() == EntityState::Added && entry.value("id").is_null() {
                self.next_key += 1;
                entry.set_current_value("id", FieldValue::Int(self.next_key))?;
            }
        }
        self.saved_logs.append(&mut self.pending_logs);
        Ok(affected)
    }

    fn add_audit_logs(&mut self, logs: Vec<NewAuditLog>) {
        self.journal.push(format!("add {}", logs.len()));
        self.pending_logs.extend(logs);
    }
}
