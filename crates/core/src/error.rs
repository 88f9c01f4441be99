//! Validation error model for household entities.

use thiserror::Error;

/// Result type used when building or validating entities.
pub type DomainResult<T> = Result<T, DomainError>;

/// Entity-level error.
///
/// Keep this focused on deterministic failures (validation, malformed ids).
/// Transport and storage concerns belong to their own crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. blank title, weekday out of range).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
