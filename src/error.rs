use std::path::Path;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ModcfgError {
    #[error("Failed to access file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read stdin: {source}")]
    StdinRead {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse stdin JSON request: {source}")]
    InvalidJsonRequest {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize response JSON: {source}")]
    ResponseSerialization {
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Config files must use a .json, .json5, or .toml extension (got '{extension}')")]
    UnsupportedExtension { extension: String },

    #[error("File '{path}' is busy: another save operation is in progress")]
    ResourceBusy { path: String },

    #[error("File '{path}' changed on disk during save; reload and retry")]
    PathChanged { path: String },

    #[error("File content changed since it was read. Expected hash '{expected_hash}', got '{actual_hash}'")]
    PreconditionFailed {
        expected_hash: String,
        actual_hash: String,
    },

    #[error("Text failed to parse as {dialect}: {message}")]
    ValidationFailed {
        dialect: &'static str,
        message: String,
    },

    #[error("TOML has no null literal; cannot render a null value")]
    NullNotRepresentable,
}

impl ModcfgError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        let (error_type, suggestion) = match self {
            Self::Io { .. } | Self::StdinRead { .. } => ("io_error", None),
            Self::InvalidJsonRequest { .. } | Self::InvalidRequest { .. } => {
                ("invalid_request", None)
            }
            Self::ResponseSerialization { .. } => ("serialization_error", None),
            Self::UnsupportedExtension { .. } => (
                "unsupported_extension",
                Some("Supported extensions: .json, .json5, .toml".to_string()),
            ),
            Self::ResourceBusy { .. } => (
                "resource_busy",
                Some("Retry after the current save operation completes".to_string()),
            ),
            Self::PathChanged { .. } | Self::PreconditionFailed { .. } => (
                "stale_read",
                Some("Reload the file and rebuild the change list before saving".to_string()),
            ),
            Self::ValidationFailed { .. } => (
                "validation_failed",
                Some(
                    "The previous file version is untouched; inspect the reported parser message"
                        .to_string(),
                ),
            ),
            Self::NullNotRepresentable => (
                "null_not_representable",
                Some("Remove the key instead of assigning null in TOML files".to_string()),
            ),
        };

        ErrorResponse {
            error: ErrorBody {
                r#type: error_type.to_string(),
                message: self.to_string(),
                suggestion,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub r#type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}
