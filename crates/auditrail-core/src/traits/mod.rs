//! Collaborator traits defined in `auditrail-core` and implemented by
//! persistence backends.

pub mod tracking;

pub use tracking::{Capabilities, ChangeTracker, EntityState, EntryId, TrackedEntry};
