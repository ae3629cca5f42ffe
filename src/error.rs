//! Error types for datakit

use std::fmt;

use thiserror::Error;

use crate::is::ValueKind;

/// Result type for registry and schema-construction operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the registry and by schema construction.
///
/// Failed schema checks are not errors; they are reported through
/// [`crate::schema::Report`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid data shape: {0}")]
    InvalidShape(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Consistency violation: registry is read-only, cannot modify '{path}'")]
    Consistency { path: String },

    #[error("Validation failed at '{path}': {violation}")]
    Validation { path: String, violation: Violation },

    #[error("Path conflict at '{path}': cannot descend into {found}")]
    PathConflict { path: String, found: ValueKind },

    #[error("Index {index} at '{path}' is too far past the end of a sequence of length {len}")]
    IndexOutOfRange { path: String, index: usize, len: usize },

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Unknown string format: {0}")]
    UnknownFormat(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid schema definition: {0}")]
    InvalidDefinition(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Model inheritance cycle through '{0}'")]
    ModelCycle(String),
}

impl Error {
    /// Whether this error describes malformed input data (as opposed to
    /// a misuse of the API).
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidShape(_)
                | Error::Json(_)
                | Error::Validation { .. }
                | Error::IndexOutOfRange { .. }
        )
    }
}

/// What a structural validation found wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A container was expected (or found) where the rules disagree
    WrongShape { expected: ValueKind, found: ValueKind },
    /// A property that no rule covers
    ExtraProperty,
    /// A leaf of the wrong type
    WrongType { expected: ValueKind, found: ValueKind },
    /// Data that has no JSON mapping/sequence representation
    NotJsonShape(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::WrongShape { expected, found } => {
                write!(f, "expected {} shape, found {}", expected, found)
            }
            Violation::ExtraProperty => write!(f, "property is not allowed"),
            Violation::WrongType { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            Violation::NotJsonShape(reason) => write!(f, "not JSON-shaped data: {}", reason),
        }
    }
}
