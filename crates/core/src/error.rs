//! Error types for the resource model.
//!
//! Decoding of string-typed spec fields is strict: anything outside the
//! accepted set is an error, never a silent default.

use thiserror::Error;

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Model error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A string-typed field held a value outside its accepted set.
    #[error("{field} '{value}' is not supported, it should be {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    /// A required field was empty.
    #[error("required field '{field}' is empty")]
    MissingField { field: String },

    /// A serialized object could not be decoded into its kind.
    #[error("failed to decode {kind}: {reason}")]
    Decode { kind: String, reason: String },
}

impl Error {
    /// Create an invalid value error.
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}
