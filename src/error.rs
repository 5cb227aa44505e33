//! Error types for document loading, reference resolution and validation.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Errors while loading an OpenAPI document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown API version \"{version}\"")]
    UnknownVersion { version: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// Reasons a type reference could not be resolved against a type table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("type reference is empty")]
    Empty,

    #[error("type reference {reference} does not start with \"#/\"")]
    MissingPrefix { reference: String },

    #[error("type reference {reference} has a non-numeric index")]
    InvalidIndex { reference: String },

    #[error("type reference {reference} is out of range for a table of {len} types")]
    OutOfRange { reference: String, len: usize },

    #[error("type reference {reference} points at an empty slot")]
    EmptySlot { reference: String },
}

/// What went wrong at a single location of a validated payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationErrorKind {
    /// The payload value has a different JSON kind than the type expects.
    Mismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// A length, bound or pattern constraint was violated.
    Constraint { message: String },
    /// A required object property is absent.
    MissingRequired,
    /// No alternative of a union accepted the value.
    NoAlternativeMatched,
}

/// Single validation error with path context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Dotted breadcrumb to the invalid value (e.g. `members.2.name`).
    pub path: String,
    #[serde(flatten)]
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn mismatch(path: &str, expected: &'static str, actual: &'static str) -> Self {
        Self {
            path: path.to_string(),
            kind: ValidationErrorKind::Mismatch { expected, actual },
        }
    }

    pub fn constraint(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            kind: ValidationErrorKind::Constraint {
                message: message.into(),
            },
        }
    }

    pub fn missing_required(path: &str) -> Self {
        Self {
            path: path.to_string(),
            kind: ValidationErrorKind::MissingRequired,
        }
    }

    pub fn no_alternative_matched(path: &str) -> Self {
        Self {
            path: path.to_string(),
            kind: ValidationErrorKind::NoAlternativeMatched,
        }
    }

    /// Human-readable message without the path.
    pub fn message(&self) -> String {
        match &self.kind {
            ValidationErrorKind::Mismatch { expected, actual } => {
                format!("expected {}, got {}", expected, actual)
            }
            ValidationErrorKind::Constraint { message } => message.clone(),
            ValidationErrorKind::MissingRequired => "required property is missing".to_string(),
            ValidationErrorKind::NoAlternativeMatched => {
                "value does not match any of the alternatives".to_string()
            }
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message())
    }
}
