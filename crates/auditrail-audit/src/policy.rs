//! Anonymous-write policy.

use tracing::warn;

use auditrail_core::config::AuditOptions;
use auditrail_core::error::AppError;
use auditrail_core::result::AppResult;
use auditrail_core::types::DbOperation;
use auditrail_entity::Operator;

use crate::model::AuditModel;

/// Operations the entity type permits without an operator.
pub fn allowed_anonymous_operations(model: &AuditModel, entity_type: &str) -> DbOperation {
    model.anonymous_policy(entity_type)
}

/// Noun used in rejection messages for a single write operation.
fn action_noun(operation: DbOperation) -> &'static str {
    if operation == DbOperation::CREATE {
        "creation"
    } else if operation == DbOperation::UPDATE {
        "modification"
    } else {
        "deletion"
    }
}

/// Reject an operator-less write unless something permits it.
///
/// A write with an operator always passes. Otherwise it passes when the
/// global options allow the operation, when the type's registered policy
/// contains it, or, for creation only, when the type is the operator's own
/// type and the exemption is enabled.
pub fn ensure_anonymous_allowed(
    operation: DbOperation,
    entity_type: &str,
    display_name: &str,
    operator: Option<&Operator>,
    options: &AuditOptions,
    model: &AuditModel,
) -> AppResult<()> {
    if operator.is_some()
        || options.allows_anonymous(operation)
        || allowed_anonymous_operations(model, entity_type).contains(operation)
    {
        return Ok(());
    }

    if operation == DbOperation::CREATE
        && options.exempt_operator_type_on_create
        && model.is_operator_type(entity_type)
    {
        return Ok(());
    }

    warn!(
        entity_type = display_name,
        operation = %operation,
        "Rejected anonymous write"
    );
    Err(AppError::anonymous_denied(action_noun(operation), display_name))
}
