//! Tracked entity shared by the persistence contexts.

use std::collections::BTreeMap;

use auditrail_audit::constants::{
    CREATION_TIME, CREATOR_ID, DELETER_ID, DELETION_TIME, ID, IS_DELETED, LAST_MODIFICATION_TIME,
    LAST_MODIFIER_ID,
};
use auditrail_core::error::AppError;
use auditrail_core::result::AppResult;
use auditrail_core::traits::{Capabilities, EntityState, TrackedEntry};
use auditrail_core::types::FieldValue;

/// A stored row: property name to value.
pub type Row = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq)]
struct Property {
    name: String,
    original: FieldValue,
    current: FieldValue,
}

/// One entity instance tracked by a [`MemoryContext`](crate::MemoryContext)
/// or a [`PgContext`](crate::PgContext).
///
/// The entity type doubles as the table name when saved to PostgreSQL.
///
/// Properties keep their declaration order. Writing a property of an
/// `Unchanged` entry marks it `Modified`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityEntry {
    entity_type: String,
    capabilities: Capabilities,
    state: EntityState,
    keys: Vec<String>,
    generated_key: bool,
    properties: Vec<Property>,
}

impl EntityEntry {
    /// A detached entity with an `id` key generated on insert and the audit
    /// fields its capabilities call for.
    pub fn new(entity_type: impl Into<String>, capabilities: Capabilities) -> Self {
        let mut entry = Self {
            entity_type: entity_type.into(),
            capabilities,
            state: EntityState::Detached,
            keys: vec![ID.to_string()],
            generated_key: true,
            properties: Vec::new(),
        };
        entry.declare(ID, FieldValue::Null);

        let audit_fields = [
            (capabilities.creation_time, CREATION_TIME),
            (capabilities.creator, CREATOR_ID),
            (capabilities.modification_time, LAST_MODIFICATION_TIME),
            (capabilities.modifier, LAST_MODIFIER_ID),
            (capabilities.deletion_time, DELETION_TIME),
            (capabilities.deleter, DELETER_ID),
        ];
        for (present, name) in audit_fields {
            if present {
                entry.declare(name, FieldValue::Null);
            }
        }
        if capabilities.soft_delete {
            entry.declare(IS_DELETED, FieldValue::Bool(false));
        }
        entry
    }

    /// Use caller-assigned key properties instead of a generated `id`.
    ///
    /// Missing key properties are declared as `Null`.
    pub fn with_keys(mut self, keys: &[&str]) -> Self {
        self.keys = keys.iter().map(|k| k.to_string()).collect();
        self.generated_key = false;
        for key in keys {
            if self.position(key).is_none() {
                self.declare(key, FieldValue::Null);
            }
        }
        self
    }

    /// Declare a property with its value.
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        match self.position(name) {
            Some(i) => {
                self.properties[i].original = value.clone();
                self.properties[i].current = value;
            }
            None => self.declare(name, value),
        }
        self
    }

    /// Current value of `name`, `Null` if undeclared.
    pub fn get(&self, name: &str) -> FieldValue {
        self.current_value(name).unwrap_or_default()
    }

    /// Write a property; see [`TrackedEntry::set_current_value`].
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> AppResult<()> {
        self.set_current_value(name, value.into())
    }

    /// The key as stored: values joined by `,`.
    pub fn key_text(&self) -> String {
        self.key_values()
            .iter()
            .map(|k| k.to_text().unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Names of the key properties.
    pub fn key_names(&self) -> &[String] {
        &self.keys
    }

    /// Whether inserting assigns the key.
    pub fn has_generated_key(&self) -> bool {
        self.generated_key
    }

    /// Whether any key component is still `Null`.
    pub fn key_missing(&self) -> bool {
        self.key_values().iter().any(FieldValue::is_null)
    }

    /// Snapshot of current values.
    pub fn row(&self) -> Row {
        self.properties
            .iter()
            .map(|p| (p.name.clone(), p.current.clone()))
            .collect()
    }

    /// Make current values the new originals.
    pub(crate) fn accept(&mut self) {
        for property in &mut self.properties {
            property.original = property.current.clone();
        }
    }

    /// Store a value without touching the state.
    pub(crate) fn assign(&mut self, name: &str, value: FieldValue) -> AppResult<()> {
        let i = self.require(name)?;
        self.properties[i].current = value;
        Ok(())
    }

    fn declare(&mut self, name: &str, value: FieldValue) {
        self.properties.push(Property {
            name: name.to_string(),
            original: value.clone(),
            current: value,
        });
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    fn require(&self, name: &str) -> AppResult<usize> {
        self.position(name).ok_or_else(|| {
            AppError::validation(format!("{} has no property '{name}'", self.entity_type))
                .for_entity(self.entity_type.as_str())
        })
    }
}

impl TrackedEntry for EntityEntry {
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
        self.properties.iter().map(|p| p.name.clone()).collect()
    }

    fn original_value(&self, property: &str) -> Option<FieldValue> {
        self.position(property)
            .map(|i| self.properties[i].original.clone())
    }

    fn current_value(&self, property: &str) -> Option<FieldValue> {
        self.position(property)
            .map(|i| self.properties[i].current.clone())
    }

    fn set_current_value(&mut self, property: &str, value: FieldValue) -> AppResult<()> {
        let i = self.require(property)?;
        if self.state == EntityState::Unchanged && self.properties[i].original != value {
            self.state = EntityState::Modified;
        }
        self.properties[i].current = value;
        Ok(())
    }

    fn key_values(&self) -> Vec<FieldValue> {
        self.keys.iter().map(|k| self.get(k)).collect()
    }
}
