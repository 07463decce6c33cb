//! Configuration management for the Device MCP Server
//!
//! Handles paths, environment variables, and server identity.

use std::path::PathBuf;

use crate::error::{ConfigError, DeviceMcpError, Result};

/// Configuration for the Device MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding persistent settings namespaces
    pub settings_dir: PathBuf,

    /// Server name reported in the `initialize` reply (usually the board name)
    pub server_name: String,
}

impl Config {
    /// Create a new configuration with default paths
    pub fn new(server_name: impl Into<String>) -> Result<Self> {
        let settings_dir = std::env::var("DEVICE_MCP_SETTINGS_DIR")
            .map(PathBuf::from)
            .map_or_else(|_| Self::default_settings_dir(), Ok)?;

        Self::with_settings_dir(server_name, settings_dir)
    }

    /// Create a configuration rooted at an explicit settings directory
    pub fn with_settings_dir(
        server_name: impl Into<String>,
        settings_dir: PathBuf,
    ) -> Result<Self> {
        if !settings_dir.exists() {
            std::fs::create_dir_all(&settings_dir).map_err(|_| {
                DeviceMcpError::Config(ConfigError::DirCreationFailed {
                    path: settings_dir.display().to_string(),
                })
            })?;
        }

        Ok(Self {
            settings_dir,
            server_name: server_name.into(),
        })
    }

    fn default_settings_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            DeviceMcpError::Config(ConfigError::DirNotFound {
                path: "~".to_string(),
            })
        })?;
        Ok(home.join(".device-mcp"))
    }
}

/// Server identity constants
pub mod server {
    /// Server version reported in the `initialize` reply
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Default board name when none is supplied
    pub const DEFAULT_BOARD_NAME: &str = "simulated-board";
}
