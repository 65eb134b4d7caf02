//! Configuration module for the moxter engine
//!
//! Configuration can be loaded from a TOML file and/or environment variables
//! prefixed with `MOXTER_`. Every field has a default, so an absent file
//! yields a usable configuration.

mod defaults;
mod loading;

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use crate::variables::OverwritePolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use defaults::*;

/// Returns the path of the configuration file used when none is given
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Main configuration structure for the moxter engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory standing in for the classpath root; scope directories live below it
    #[serde(default = "default_fixtures_root")]
    pub fixtures_root: String,

    /// Candidate definition file names, tried in order in each directory
    #[serde(default = "default_file_names")]
    pub file_names: Vec<String>,

    /// Strict execution: status mismatches and call errors fail the call
    #[serde(default = "default_strict")]
    pub strict: bool,

    /// Strict variables: saving an already-set variable is an error
    #[serde(default = "default_strict_vars")]
    pub strict_vars: bool,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Credentials attached to every request
    #[serde(default)]
    pub auth: AuthConfig,

    /// CSRF token attached to state-changing requests
    #[serde(default)]
    pub csrf: CsrfConfig,
}

/// Configuration for the HTTP executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL that relative endpoints are joined to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Headers sent with every request unless a fixture overrides them
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

/// Authentication attached to requests
///
/// A bearer token takes precedence over basic credentials.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub bearer_token: Option<String>,

    #[serde(default)]
    pub basic_username: Option<String>,

    #[serde(default)]
    pub basic_password: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "***REDACTED***"),
            )
            .field("basic_username", &self.basic_username)
            .field(
                "basic_password",
                &self.basic_password.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}

/// CSRF configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct CsrfConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_csrf_header")]
    pub header_name: String,

    #[serde(default)]
    pub token: Option<String>,
}

impl std::fmt::Debug for CsrfConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfConfig")
            .field("enabled", &self.enabled)
            .field("header_name", &self.header_name)
            .field("token", &self.token.as_ref().map(|_| "***REDACTED***"))
            .finish()
    }
}

// Default implementations

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixtures_root: default_fixtures_root(),
            file_names: default_file_names(),
            strict: default_strict(),
            strict_vars: default_strict_vars(),
            http: HttpConfig::default(),
            auth: AuthConfig::default(),
            csrf: CsrfConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            default_headers: BTreeMap::new(),
        }
    }
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            header_name: default_csrf_header(),
            token: None,
        }
    }
}

impl EngineConfig {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.fixtures_root.trim().is_empty() {
            return Err(Error::config("fixtures_root cannot be empty".to_string()));
        }

        if self.file_names.is_empty() {
            return Err(Error::config(
                "file_names must list at least one file name".to_string(),
            ));
        }
        if let Some(bad) = self
            .file_names
            .iter()
            .find(|n| n.trim().is_empty() || n.contains('/') || n.contains('\\'))
        {
            return Err(Error::config(format!(
                "Invalid fixture file name '{bad}'. Must be a bare file name"
            )));
        }

        if !(self.http.base_url.starts_with("http://") || self.http.base_url.starts_with("https://"))
        {
            return Err(Error::config(format!(
                "Invalid http.base_url '{}'. Must start with http:// or https://",
                self.http.base_url
            )));
        }

        if self.http.timeout_secs == 0 {
            return Err(Error::config(
                "http.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.http.timeout_secs > 3600 {
            return Err(Error::config(format!(
                "http.timeout_secs too large (max 3600, got {})",
                self.http.timeout_secs
            )));
        }

        if self.auth.basic_username.is_some() != self.auth.basic_password.is_some() {
            return Err(Error::config(
                "auth.basic_username and auth.basic_password must be set together".to_string(),
            ));
        }

        if self.csrf.enabled {
            if self.csrf.token.as_deref().is_none_or(str::is_empty) {
                return Err(Error::config(
                    "csrf.token is required when csrf.enabled is true".to_string(),
                ));
            }
            if self.csrf.header_name.trim().is_empty() {
                return Err(Error::config("csrf.header_name cannot be empty".to_string()));
            }
        }

        Ok(())
    }

    /// Overwrite policy implied by `strict_vars`
    pub fn overwrite_policy(&self) -> OverwritePolicy {
        OverwritePolicy::from_strict(self.strict_vars)
    }

    /// Saves the configuration to a TOML file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, toml_string)
            .map_err(|e| Error::config(format!("Failed to write config file: {e}")))?;

        Ok(())
    }
}
