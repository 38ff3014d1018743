//! Transport configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Settings for the bundled HTTP transport
///
/// Stored as JSON. Missing files and missing fields fall back to defaults.
///
/// # Example
/// ```rust,no_run
/// use igd_gateway::{ReqwestTransport, TransportSettings};
///
/// let settings = TransportSettings::load("igd.json").expect("Failed to load");
/// let transport = ReqwestTransport::from_settings(&settings).expect("Failed to build client");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Whole-request deadline in milliseconds (0 = none)
    pub timeout_ms: u64,
    /// Connect deadline in milliseconds (0 = none)
    pub connect_timeout_ms: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            connect_timeout_ms: 2_000,
            user_agent: format!("igd-gateway/{} UPnP/1.1", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportSettings {
    /// Load settings from a JSON file
    ///
    /// Returns the defaults if the file doesn't exist or is empty.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)?;

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Save settings to a JSON file, creating parent directories
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, json)?;

        Ok(())
    }
}
