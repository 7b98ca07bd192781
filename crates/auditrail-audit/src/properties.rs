//! Auditable-property cache.
//!
//! The set of properties eligible for diffing is computed once per entity
//! type and shared by all save cycles in the process. Concurrent first
//! callers may each compute the set, but only the first stored value is
//! ever kept and every caller observes that value.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use auditrail_core::error::AppError;
use auditrail_core::result::AppResult;
use auditrail_core::traits::TrackedEntry;

use crate::constants::is_infrastructure_property;
use crate::model::AuditModel;

/// Ordered, immutable set of auditable property names.
pub type PropertySet = Arc<[String]>;

/// Write-once cache of auditable properties keyed by entity type.
#[derive(Debug, Default)]
pub struct AuditablePropertyCache {
    entries: DashMap<String, PropertySet>,
}

impl AuditablePropertyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached set for `entity_type`, if computed.
    pub fn get(&self, entity_type: &str) -> Option<PropertySet> {
        self.entries.get(entity_type).map(|e| Arc::clone(e.value()))
    }

    /// Number of cached entity types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached set, computing and storing it on first use.
    ///
    /// A failed computation stores nothing.
    pub fn get_or_try_insert_with(
        &self,
        entity_type: &str,
        compute: impl FnOnce() -> AppResult<PropertySet>,
    ) -> AppResult<PropertySet> {
        if let Some(cached) = self.get(entity_type) {
            return Ok(cached);
        }

        let computed = compute()?;
        let stored = self
            .entries
            .entry(entity_type.to_string())
            .or_insert(computed);
        Ok(Arc::clone(stored.value()))
    }
}

/// Auditable properties of the entry's type, in model order.
///
/// Excludes properties the model marks non-auditable and the audit
/// infrastructure properties. Fails without caching if the collaborator
/// lists a property it cannot read.
pub fn auditable_properties(
    entry: &dyn TrackedEntry,
    model: &AuditModel,
) -> AppResult<PropertySet> {
    let entity_type = entry.entity_type();
    model
        .property_cache()
        .get_or_try_insert_with(entity_type, || {
            let mut names = Vec::new();
            for name in entry.property_names() {
                if entry.current_value(&name).is_none() {
                    return Err(AppError::internal(format!(
                        "Property '{name}' of {entity_type} is listed but not readable"
                    ))
                    .for_entity(entity_type));
                }
                if model.is_property_excluded(entity_type, &name)
                    || is_infrastructure_property(&name)
                {
                    continue;
                }
                names.push(name);
            }
            trace!(entity_type, count = names.len(), "Computed auditable properties");
            Ok(names.into())
        })
}
