//! Configuration loading

use anyhow::Result;
use meadow_core::config::ImportConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Contents of `meadow.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Extensions listed in a synthesized manifest
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory holding index.html and the wasm bundle
    #[serde(default = "default_root")]
    pub root: String,
    /// Models directory, served under `/models`
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            root: default_root(),
            models_dir: default_models_dir(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_root() -> String {
    "crates/meadow-web/www".to_string()
}

fn default_models_dir() -> String {
    "crates/meadow-web/www/models".to_string()
}

/// Load configuration from file, or defaults when the file is absent
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
