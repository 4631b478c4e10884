//! Client configuration.
//!
//! Values come from built-in defaults, optionally a TOML file, and finally
//! `CATALOG_*` environment variables, later sources winning.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_BASE_URL: &str = "CATALOG_BASE_URL";
pub const ENV_API_PREFIX: &str = "CATALOG_API_PREFIX";
pub const ENV_LOCALE: &str = "CATALOG_LOCALE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme, host and port of the backend, e.g. `http://127.0.0.1:3000`.
    pub base_url: String,
    /// Path prefix in front of every endpoint.
    pub api_prefix: String,
    /// Locale used when neither a cookie nor a negotiated locale matches.
    pub fallback_locale: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            api_prefix: "/api".to_string(),
            fallback_locale: "en".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    /// Environment overrides are applied in both cases.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            Self::from_toml_str(&fs::read_to_string(path)?)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(prefix) = get(ENV_API_PREFIX) {
            self.api_prefix = prefix;
        }
        if let Some(locale) = get(ENV_LOCALE) {
            self.fallback_locale = locale;
        }
        self
    }

    /// `base_url` and `api_prefix` joined, without a trailing slash.
    pub fn api_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{prefix}")
        }
    }
}
