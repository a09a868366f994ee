//! Error types for the migration plan compiler.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::QueryParseError;

/// Which end of the migration a schema or warning belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The system records are read from.
    Source,
    /// The system records are written to.
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Target => f.write_str("target"),
        }
    }
}

/// Main error type for task setup and schema resolution.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error scoped to one object (bad query, missing correlation key, ...)
    #[error("Configuration error for object {object}: {message}")]
    Config { object: String, message: String },

    /// Schema metadata could not be fetched or the object is unknown on one side
    #[error("Metadata not found for object {object} on the {side} side: {message}")]
    Metadata {
        object: String,
        side: Side,
        message: String,
    },

    /// A schema describe call failed before the owning task could attribute it to a side
    #[error("Describe failed: {0}")]
    Describe(String),

    /// Query text could not be parsed
    #[error(transparent)]
    QueryParse(#[from] QueryParseError),

    /// Job-level configuration error (empty object list, no describable side, ...)
    #[error("Invalid job configuration: {0}")]
    InvalidConfig(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Config error for an object.
    pub fn config(object: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Config {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Create a Metadata error for an object and side.
    pub fn metadata(object: impl Into<String>, side: Side, message: impl Into<String>) -> Self {
        MigrateError::Metadata {
            object: object.into(),
            side,
            message: message.into(),
        }
    }

    /// True for configuration-class errors, which must never be re-wrapped as metadata errors.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            MigrateError::Config { .. } | MigrateError::QueryParse(_) | MigrateError::InvalidConfig(_)
        )
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config { .. }
            | MigrateError::QueryParse(_)
            | MigrateError::InvalidConfig(_)
            | MigrateError::Yaml(_)
            | MigrateError::Json(_) => 1,
            MigrateError::Metadata { .. } | MigrateError::Describe(_) => 3,
            MigrateError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
