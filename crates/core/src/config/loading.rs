//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, Environment, File};
use std::path::Path;

use super::{default_config_path, EngineConfig};

impl EngineConfig {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `MOXTER_` and use double underscores
    /// for nested values. For example:
    /// - `MOXTER_STRICT=false`
    /// - `MOXTER_HTTP__BASE_URL=http://localhost:9090`
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut builder = ConfigLib::builder();

        // Add the config file if it exists
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("MOXTER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Bearer tokens are commonly exported without the prefix
        if let Ok(token) = std::env::var("MOXTER_TOKEN") {
            builder = builder
                .set_override("auth.bearer_token", token)
                .map_err(|e| Error::config(format!("Failed to set MOXTER_TOKEN: {e}")))?;
        }

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (`./moxter.toml` or custom --config path)
    /// 3. Environment variables (MOXTER_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };
        let config = Self::from_file(&path)?;
        config.validate()?;
        Ok(config)
    }
}
