//! # auditrail-core
//!
//! Core crate for Auditrail. Contains the change-tracking collaborator
//! contract, configuration schemas, the dynamic field value model,
//! pagination types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Auditrail crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
