//! Validation errors raised while constructing domain values.
use thiserror::Error;

/// Represents a domain value that failed validation.
///
/// These errors are raised by constructors before anything reaches the graph,
/// so a value that exists is always well formed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid catalog identifier '{value}': {reason}")]
    InvalidCatalogId { value: String, reason: &'static str },

    #[error("Unknown catalog scheme: {0}")]
    UnknownScheme(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Unknown dedupe policy: {0}")]
    UnknownDedupePolicy(String),

    #[error("Unknown data node kind: {0}")]
    UnknownKind(String),
}

impl ValidationError {
    pub fn payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }
}
