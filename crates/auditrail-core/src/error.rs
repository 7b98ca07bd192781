//! The error type shared by every Auditrail crate.

use std::fmt;
use thiserror::Error;

/// What went wrong, independent of which crate noticed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// No such audit log or tracked entry.
    NotFound,
    /// An operation was attempted without a permitted operator.
    Authorization,
    /// An entity cannot be persisted as it stands.
    Validation,
    /// The operation clashes with current state.
    Conflict,
    /// A broken internal invariant.
    Internal,
    /// The persistence collaborator failed (save, commit, rollback).
    Database,
    /// Configuration could not be loaded.
    Configuration,
    /// JSON encoding or decoding failed.
    Serialization,
    /// The operation observed a cancellation request.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// An error with its kind, a message for humans, and the entity type it
/// concerns when there is one.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    /// The entity type the error concerns, when there is one.
    pub entity_type: Option<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// An error of `kind` with no cause attached.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            entity_type: None,
            source: None,
        }
    }

    /// An error wrapping its underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            entity_type: None,
            source: Some(Box::new(source)),
        }
    }

    /// Attach the entity type this error concerns.
    pub fn for_entity(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// A missing audit log, savepoint or tracked entry.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// A write the current operator (or its absence) may not perform.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Create the authorization error raised when an operator-less write is
    /// attempted on an entity type that does not permit it.
    ///
    /// `action` is the noun form of the operation: `"creation"`,
    /// `"modification"` or `"deletion"`.
    pub fn anonymous_denied(action: &str, entity_type: &str) -> Self {
        Self::authorization(format!(
            "Anonymous {action} of {entity_type} is not allowed."
        ))
        .for_entity(entity_type)
    }

    /// Input or entity state that cannot be persisted as given.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// An operation that clashes with state already in place, such as a
    /// second `begin` on an open transaction.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// A broken invariant inside Auditrail itself.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// A failure reported by the persistence collaborator.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Configuration that cannot be loaded or parsed.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// A save abandoned because its cancellation token fired.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Whether this error is an anonymous-write rejection.
    pub fn is_authorization(&self) -> bool {
        self.kind == ErrorKind::Authorization
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            entity_type: self.entity_type.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("Invalid JSON: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Cannot load configuration: {err}"),
            err,
        )
    }
}
