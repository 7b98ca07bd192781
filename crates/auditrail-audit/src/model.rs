//! Declarative per-entity-type audit registration.
//!
//! Built once during model setup and shared by every save cycle through an
//! `Arc`. Holds the anonymous-operation policy and audit-exclusion markers
//! for each entity type, plus the process-wide auditable-property cache.

use std::collections::{HashMap, HashSet};

use auditrail_core::types::{DbOperation, TypeName};

use crate::properties::AuditablePropertyCache;

/// Audit settings registered for one entity type.
#[derive(Debug, Clone, Default)]
pub struct EntityAuditConfig {
    anonymous: DbOperation,
    disabled: bool,
    excluded_properties: HashSet<String>,
}

impl EntityAuditConfig {
    /// Permit these operations without an operator.
    pub fn anonymous(&mut self, operations: DbOperation) -> &mut Self {
        self.anonymous = operations;
        self
    }

    /// Never diff this property.
    pub fn exclude_property(&mut self, name: impl Into<String>) -> &mut Self {
        self.excluded_properties.insert(name.into());
        self
    }

    /// Never diff any property of this type.
    pub fn disable_auditing(&mut self) -> &mut Self {
        self.disabled = true;
        self
    }
}

/// Immutable audit registration for every entity type of a model.
#[derive(Debug, Default)]
pub struct AuditModel {
    operator_type: Option<String>,
    entities: HashMap<String, EntityAuditConfig>,
    property_cache: AuditablePropertyCache,
}

impl AuditModel {
    /// Start building a model.
    pub fn builder() -> AuditModelBuilder {
        AuditModelBuilder::default()
    }

    /// Operations the entity type permits without an operator.
    ///
    /// Types without a registration permit nothing.
    pub fn anonymous_policy(&self, entity_type: &str) -> DbOperation {
        self.entities
            .get(entity_type)
            .map(|c| c.anonymous)
            .unwrap_or(DbOperation::NONE)
    }

    /// Whether the whole entity type is excluded from diffing.
    pub fn is_audit_disabled(&self, entity_type: &str) -> bool {
        self.entities
            .get(entity_type)
            .is_some_and(|c| c.disabled)
    }

    /// Whether `property` of `entity_type` is explicitly excluded from diffing.
    pub fn is_property_excluded(&self, entity_type: &str, property: &str) -> bool {
        self.entities
            .get(entity_type)
            .is_some_and(|c| c.excluded_properties.contains(property))
    }

    /// Whether `entity_type` is the operator's own entity type.
    pub fn is_operator_type(&self, entity_type: &str) -> bool {
        self.operator_type.as_deref() == Some(entity_type)
    }

    /// The shared auditable-property cache.
    pub fn property_cache(&self) -> &AuditablePropertyCache {
        &self.property_cache
    }
}

/// Builder for [`AuditModel`].
#[derive(Debug, Default)]
pub struct AuditModelBuilder {
    operator_type: Option<String>,
    entities: HashMap<String, EntityAuditConfig>,
}

impl AuditModelBuilder {
    /// Declare the operator's own entity type.
    pub fn operator_type(mut self, entity_type: impl Into<String>) -> Self {
        self.operator_type = Some(entity_type.into());
        self
    }

    /// Configure an entity type by registration key.
    ///
    /// Calling this twice for the same key amends the earlier registration.
    pub fn entity(
        mut self,
        entity_type: impl Into<String>,
        configure: impl FnOnce(&mut EntityAuditConfig),
    ) -> Self {
        configure(self.entities.entry(entity_type.into()).or_default());
        self
    }

    /// Configure an entity type keyed by its Rust type's friendly name.
    pub fn entity_of<T: ?Sized>(self, configure: impl FnOnce(&mut EntityAuditConfig)) -> Self {
        self.entity(TypeName::of::<T>().to_string(), configure)
    }

    /// Exclude an entity type from diffing entirely.
    pub fn disable_auditing(self, entity_type: impl Into<String>) -> Self {
        self.entity(entity_type, |e| {
            e.disable_auditing();
        })
    }

    /// Finish the model.
    pub fn build(self) -> AuditModel {
        AuditModel {
            operator_type: self.operator_type,
            entities: self.entities,
            property_cache: AuditablePropertyCache::new(),
        }
    }
}
