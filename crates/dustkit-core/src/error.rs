//! Error types for the core model.

use std::error::Error;
use std::fmt;

use crate::variable::VariableType;

/// Errors from typed variable access and the JSON projection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// A variable exists under `key` but holds a different type.
    FieldType {
        /// The variable key.
        key: String,
        /// The type the caller asked for.
        expected: VariableType,
        /// The type actually stored.
        found: VariableType,
    },
    /// A JSON schema/value pair could not be converted.
    Json {
        /// Human-readable description of what went wrong.
        detail: String,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldType {
                key,
                expected,
                found,
            } => write!(
                f,
                "variable '{key}' has type {found}, expected {expected}"
            ),
            Self::Json { detail } => write!(f, "invalid variable JSON: {detail}"),
        }
    }
}

impl Error for CoreError {}
