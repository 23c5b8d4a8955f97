//! Configuration for the Nodetable client
//!
//! Values come from the environment, optionally seeded from a `.env` file.
//! Invalid values are reported and replaced by their defaults; only a missing
//! or malformed backend URL is fatal.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use nodetable_core::{GraphError, GraphResult, ScopeId};

use crate::api::ApiConfig;
use crate::cache::CacheConfig;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Workspace every endpoint is scoped to
    #[serde(default)]
    pub scope_id: Option<ScopeId>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Query cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            scope_id: None,
            timeout_secs: default_timeout_secs(),
            log_level: default_log_level(),
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a `.env` file and environment variables
    pub fn load() -> GraphResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> GraphResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup("NODETABLE_API_URL") {
            config.base_url = base_url;
        }

        if let Some(scope) = lookup("NODETABLE_SCOPE_ID") {
            match scope.parse::<i64>() {
                Ok(id) => config.scope_id = Some(ScopeId(id)),
                Err(_) => warn!("Invalid NODETABLE_SCOPE_ID value: {}", scope),
            }
        }

        if let Some(timeout) = lookup("NODETABLE_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout_secs = secs,
                _ => warn!("Invalid NODETABLE_TIMEOUT_SECS value: {}", timeout),
            }
        }

        if let Some(capacity) = lookup("NODETABLE_CACHE_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(items) if items > 0 => config.cache.capacity = items,
                _ => warn!("Invalid NODETABLE_CACHE_CAPACITY value: {}", capacity),
            }
        }

        if let Some(stale_after) = lookup("NODETABLE_STALE_AFTER_MS") {
            match stale_after.parse::<u64>() {
                Ok(ms) => config.cache.stale_after = Duration::from_millis(ms),
                Err(_) => warn!("Invalid NODETABLE_STALE_AFTER_MS value: {}", stale_after),
            }
        }

        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.log_level = log_level;
        }

        config.validate()?;
        info!(base_url = %config.base_url, scoped = config.scope_id.is_some(), "Loaded client configuration");
        Ok(config)
    }

    /// Check that the backend URL is usable
    pub fn validate(&self) -> GraphResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(GraphError::Config("Backend URL is required".to_string()));
        }

        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| GraphError::Config(format!("Invalid backend URL {}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GraphError::Config(format!(
                "Backend URL must use http or https: {}",
                self.base_url
            )));
        }
        Ok(())
    }

    pub fn api(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            scope_id: self.scope_id,
            timeout_secs: self.timeout_secs,
        }
    }
}
