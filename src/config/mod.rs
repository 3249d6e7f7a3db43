// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{EdgeError, Result};
use config::{Config, Environment, File};
use std::path::PathBuf;

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest)
    /// 2. Config file (`path`, or `~/.smartsports-edge/config.toml`)
    /// 3. Defaults (lowest)
    pub fn load(path: Option<&str>) -> Result<Self> {
        let (file, required) = match path {
            Some(p) => (p.to_string(), true),
            None => (Self::default_config_path(), false),
        };

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::with_name(&file).required(required))
            // Override with environment variables (prefix: SMARTSPORTS_EDGE_)
            .add_source(
                Environment::with_prefix("SMARTSPORTS_EDGE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| EdgeError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| EdgeError::Config(e.to_string()))
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".smartsports-edge")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
