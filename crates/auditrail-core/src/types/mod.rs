//! Shared value types used across all crates.

pub mod operation;
pub mod pagination;
pub mod type_name;
pub mod value;

pub use operation::DbOperation;
pub use pagination::{PageRequest, PageResponse};
pub use type_name::TypeName;
pub use value::FieldValue;
