//! Persisted user settings
//!
//! Explicit load-at-init / save-on-change lifecycle: the binary loads once,
//! injects values into the clients, and writes back only when the user edits
//! something. Environment variables overlay the file so deployments can
//! override without touching it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Settings persistence error types
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Process-wide configuration consumed by the pipeline
///
/// Read-mostly; there is a single thread of control, so writes are
/// last-writer-wins without locking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Reconstruction service endpoint URL
    pub sam3d_endpoint: String,

    /// Reconstruction service API key
    pub sam3d_api_key: String,

    /// Image generation API key
    pub gemini_api_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sam3d_endpoint: apex_sam3d::DEFAULT_ENDPOINT.to_string(),
            sam3d_api_key: String::new(),
            gemini_api_key: String::new(),
        }
    }
}

impl Settings {
    /// Default settings file location under the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("apex3d").join("settings.toml"))
    }

    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// unreadable
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
                Self::default()
            }
        }
    }

    /// Write settings to a TOML file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Overlay environment variables on top of the file-backed values
    ///
    /// `SAM3D_ENDPOINT`, `SAM3D_API_KEY` and `GEMINI_API_KEY` take
    /// precedence when set and non-empty.
    pub fn overlay_env(mut self) -> Self {
        if let Ok(value) = std::env::var("SAM3D_ENDPOINT") {
            if !value.is_empty() {
                self.sam3d_endpoint = value;
            }
        }
        if let Ok(value) = std::env::var("SAM3D_API_KEY") {
            if !value.is_empty() {
                self.sam3d_api_key = value;
            }
        }
        if let Ok(value) = std::env::var("GEMINI_API_KEY") {
            if !value.is_empty() {
                self.gemini_api_key = value;
            }
        }
        self
    }
}
