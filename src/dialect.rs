use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ModcfgError;
use crate::value::ConfigValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum Dialect {
    Json,
    Json5,
    Toml,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Json5 => "json5",
            Self::Toml => "toml",
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ModcfgError> {
        let extension = path
            .extension()
            .and_then(|value| value.to_str())
            .map(|value| value.to_ascii_lowercase())
            .ok_or_else(|| ModcfgError::UnsupportedExtension {
                extension: "<none>".to_string(),
            })?;

        match extension.as_str() {
            "json" => Ok(Self::Json),
            "json5" => Ok(Self::Json5),
            "toml" => Ok(Self::Toml),
            other => Err(ModcfgError::UnsupportedExtension {
                extension: other.to_string(),
            }),
        }
    }
}

/// Re-parses `text` with the dialect's real parser. This is the post-patch
/// validation gate: a failure here is the one hard error a save must treat
/// as fatal, keeping the previous durable version.
pub fn validate_text(dialect: Dialect, text: &str) -> Result<(), ModcfgError> {
    let parse_error = match dialect {
        Dialect::Json => serde_json::from_str::<serde_json::Value>(text)
            .err()
            .map(|error| error.to_string()),
        Dialect::Json5 => json5::from_str::<serde_json::Value>(text)
            .err()
            .map(|error| error.to_string()),
        Dialect::Toml => toml::from_str::<toml::Value>(text)
            .err()
            .map(|error| error.to_string()),
    };

    match parse_error {
        None => Ok(()),
        Some(message) => Err(ModcfgError::ValidationFailed {
            dialect: dialect.name(),
            message,
        }),
    }
}

/// Parses `text` into the closed value union, for diffing and inspection.
pub fn parse_text(dialect: Dialect, text: &str) -> Result<ConfigValue, ModcfgError> {
    let failed = |message: String| ModcfgError::ValidationFailed {
        dialect: dialect.name(),
        message,
    };

    match dialect {
        Dialect::Json => {
            serde_json::from_str::<ConfigValue>(text).map_err(|error| failed(error.to_string()))
        }
        Dialect::Json5 => {
            json5::from_str::<ConfigValue>(text).map_err(|error| failed(error.to_string()))
        }
        Dialect::Toml => {
            toml::from_str::<ConfigValue>(text).map_err(|error| failed(error.to_string()))
        }
    }
}
