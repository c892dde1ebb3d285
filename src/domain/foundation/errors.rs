//! Error types for the domain layer.

use std::fmt;
use thiserror::Error;

/// Errors raised when user input or a state change is rejected before any
/// collaborator is contacted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be at least {min}, got {actual}")]
    BelowMinimum {
        field: String,
        min: u32,
        actual: u32,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField {
            field: field.into(),
        }
    }

    /// Creates a below-minimum validation error.
    pub fn below_minimum(field: impl Into<String>, min: u32, actual: u32) -> Self {
        ValidationError::BelowMinimum {
            field: field.into(),
            min,
            actual,
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        ValidationError::InvalidState(reason.into())
    }
}

/// Error codes organized by category, used for log fields and for choosing
/// the user-facing failure text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Persistence errors
    Unauthorized,
    Forbidden,
    ThreadNotFound,
    StorageError,

    // Agent errors
    Timeout,
    NetworkError,
    ServiceBusy,
    ParseError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::ThreadNotFound => "THREAD_NOT_FOUND",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::ServiceBusy => "SERVICE_BUSY",
            ErrorCode::ParseError => "PARSE_ERROR",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("utterance");
        assert_eq!(format!("{}", err), "Field 'utterance' cannot be empty");
    }

    #[test]
    fn validation_error_below_minimum_displays_correctly() {
        let err = ValidationError::below_minimum("adults", 1, 0);
        assert_eq!(format!("{}", err), "Field 'adults' must be at least 1, got 0");
    }

    #[test]
    fn error_code_displays_screaming_case() {
        assert_eq!(ErrorCode::ThreadNotFound.to_string(), "THREAD_NOT_FOUND");
        assert_eq!(ErrorCode::ServiceBusy.to_string(), "SERVICE_BUSY");
    }
}
