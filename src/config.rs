//! Configuration Management
//!
//! Reads `~/.scwrc` and applies environment overrides.

use crate::cache::CacheStore;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// API endpoint used when nothing else is configured
pub const DEFAULT_API_ENDPOINT: &str = "https://api.cloud.online.net/";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// API endpoint
    #[serde(default)]
    pub api_endpoint: Option<String>,
    /// Organization owning created resources
    #[serde(default)]
    pub organization: Option<String>,
    /// Authentication token
    #[serde(default)]
    pub token: Option<String>,
    /// Location of the resolution cache
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".scwrc"))
    }

    /// Load configuration from disk, then apply environment overrides
    pub fn load() -> Self {
        let mut config = Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load a configuration file; unreadable or invalid files give defaults
    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Override fields from `SCW_*` variables
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.is_empty());

        if let Some(v) = non_empty("SCW_API_ENDPOINT") {
            self.api_endpoint = Some(v);
        }
        if let Some(v) = non_empty("SCW_ORGANIZATION") {
            self.organization = Some(v);
        }
        if let Some(v) = non_empty("SCW_TOKEN") {
            self.token = Some(v);
        }
        if let Some(v) = non_empty("SCW_CACHE_PATH") {
            self.cache_path = Some(PathBuf::from(v));
        }
    }

    /// Get effective endpoint (CLI > env > file > default), validated
    pub fn effective_endpoint(&self) -> Result<String> {
        let endpoint = self
            .api_endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        let parsed = url::Url::parse(&endpoint)
            .with_context(|| format!("Invalid API endpoint '{}'", endpoint))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("Invalid API endpoint '{}': expected http or https", endpoint);
        }
        Ok(endpoint)
    }

    pub fn effective_token(&self) -> Result<String> {
        match self.token.as_deref() {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => bail!("No API token configured. Set SCW_TOKEN or add \"token\" to ~/.scwrc"),
        }
    }

    pub fn effective_organization(&self) -> Result<String> {
        match self.organization.as_deref() {
            Some(org) if !org.is_empty() => Ok(org.to_string()),
            _ => bail!(
                "No organization configured. Set SCW_ORGANIZATION or add \"organization\" to ~/.scwrc"
            ),
        }
    }

    /// Cache store for the configured (or default) cache path
    pub fn cache_store(&self) -> CacheStore {
        match &self.cache_path {
            Some(path) => CacheStore::new(path),
            None => CacheStore::default(),
        }
    }
}
