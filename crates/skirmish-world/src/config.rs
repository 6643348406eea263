//! Save configuration and data-file loading.
//!
//! Provides format detection (RON/TOML/JSON) and deserialization helpers
//! shared by [`SaveConfig`] and the object definition store.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use skirmish_persist::GameVariant;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors raised while reading a configuration or data file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("failed to read {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Deserialize `content` that came from `file` in the given format.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<T, ConfigError> {
    let parse_error = |detail: String| ConfigError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        file: path.to_path_buf(),
        source,
    })?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// SaveConfig
// ===========================================================================

fn default_true() -> bool {
    true
}

/// Settings shared by every save and load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveConfig {
    /// Engine family the save belongs to. Gates per-engine fields.
    pub game: GameVariant,
    /// Root of the user data directory. Embedded maps are materialized
    /// relative to it.
    pub user_data_root: PathBuf,
    /// Re-read a materialized map after writing it and compare digests.
    #[serde(default = "default_true")]
    pub verify_embedded_map: bool,
}

impl SaveConfig {
    pub fn new(game: GameVariant, user_data_root: impl Into<PathBuf>) -> Self {
        Self {
            game,
            user_data_root: user_data_root.into(),
            verify_embedded_map: true,
        }
    }

    /// Load from a `.ron`, `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        deserialize_file(path)
    }
}
