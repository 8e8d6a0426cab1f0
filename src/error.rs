//! Custom error types for the cycle ledger
//!
//! This module defines the error hierarchy for the engine using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for cycle ledger operations
#[derive(Error, Debug)]
pub enum CycleError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// YAML data set errors
    #[error("YAML error: {0}")]
    Yaml(String),

    /// Malformed input or an operation that is undefined for the entity's state
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate writes and detected races
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The acting user may not perform the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unexpected failure inside a multi-entity update
    #[error("Internal error: {0}")]
    Internal(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CycleError {
    /// Create a "not found" error for cycles
    pub fn cycle_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Cycle",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for meetings
    pub fn meeting_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Meeting",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for registrations
    pub fn registration_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Registration",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for instructors
    pub fn instructor_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Instructor",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for expenses
    pub fn expense_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Expense",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for upsell leads
    pub fn lead_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Lead",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<std::io::Error> for CycleError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CycleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for CycleError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

/// Result type alias for cycle ledger operations
pub type CycleResult<T> = Result<T, CycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CycleError::Validation("meeting is not completed".into());
        assert_eq!(err.to_string(), "Validation error: meeting is not completed");
    }

    #[test]
    fn test_not_found_error() {
        let err = CycleError::meeting_not_found("mtg-1234abcd");
        assert_eq!(err.to_string(), "Meeting not found: mtg-1234abcd");
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_conflict_error() {
        let err = CycleError::Conflict("lead already exists".into());
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "Conflict: lead already exists");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CycleError = io_err.into();
        assert!(matches!(err, CycleError::Io(_)));
    }
}
