//! Error types for the keel core library.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for every fallible keel operation.
///
/// Step-level failures (a gate denial, a spawn failure, a timeout, a non-zero
/// exit) are not errors: they are reported as
/// [`ExecutionResult`](crate::models::ExecutionResult) values. This type
/// covers what must be rejected before anything runs, and lookups that miss.
#[derive(Error, Debug)]
pub enum KeelError {
    /// Malformed plan specs, dependency cycles and other rejected input
    #[error("Invalid input for field '{field}': {reason}")]
    Validation { field: String, reason: String },
    /// Plan not found for the given ID
    #[error("Plan with ID {id} not found")]
    PlanNotFound { id: String },
    /// No running process matches the tracking ID or pid
    #[error("No running process matches '{target}'")]
    ProcessNotFound { target: String },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A danger pattern failed to compile
    #[error("Invalid danger pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Builder for creating validation errors.
pub struct ValidationErrorBuilder {
    field: String,
}

impl ValidationErrorBuilder {
    /// Create a new validation error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> KeelError {
        KeelError::Validation {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl KeelError {
    /// Creates a builder for validation errors.
    pub fn validation(field: impl Into<String>) -> ValidationErrorBuilder {
        ValidationErrorBuilder::new(field)
    }

    /// Wraps an I/O error with the path it happened at.
    pub fn file_system(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// True for the not-found family, which callers usually report rather
    /// than propagate.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            KeelError::PlanNotFound { .. } | KeelError::ProcessNotFound { .. }
        )
    }
}

/// Extension trait for Result to provide concise error mapping with
/// anyhow-style context.
pub trait ResultExt<T, E> {
    /// Add context to any error type, converting to KeelError.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| KeelError::Configuration {
            message: format!("{}: {}", context, e),
        })
    }
}

/// Result type alias for keel operations
pub type Result<T> = std::result::Result<T, KeelError>;
