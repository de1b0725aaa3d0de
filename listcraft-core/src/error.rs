//! Error types for template loading and rewriting

use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while resolving, loading or rewriting a template.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// A template key segment cannot be used as a path component.
    #[error("invalid {field}: '{value}'")]
    InvalidKey { field: &'static str, value: String },

    /// The resolved template file does not exist.
    #[error("template '{name}' not found in '{}'", location.display())]
    NotFound { name: String, location: PathBuf },

    /// The template file exists but could not be read.
    #[error("failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The template bytes are not a readable XLSX package.
    #[error("template could not be parsed: {0}")]
    Parse(String),

    /// The rewritten workbook could not be encoded.
    #[error("rewritten workbook could not be serialized: {0}")]
    Serialization(String),
}

impl TemplateError {
    pub(crate) fn parse(err: impl Display) -> Self {
        TemplateError::Parse(err.to_string())
    }

    pub(crate) fn serialization(err: impl Display) -> Self {
        TemplateError::Serialization(err.to_string())
    }
}
