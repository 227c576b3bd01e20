use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::backend::postgrest::DEFAULT_BACKEND_TIMEOUT_SECS;
use crate::cache::DEFAULT_CACHE_TTL_SECS;

pub const ENV_BACKEND_URL: &str = "GOGUMA_BACKEND_URL";
pub const ENV_BACKEND_ANON_KEY: &str = "GOGUMA_BACKEND_ANON_KEY";
pub const ENV_LISTEN_ADDR: &str = "GOGUMA_LISTEN_ADDR";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8081";
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid listen address {0:?}")]
    InvalidListenAddr(String),
}

/// Configuration of the reputation service binary.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Optional log level string (e.g. "info", "goguma_reputation=debug").
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Hosted database connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: Option<String>,

    /// Anonymous API key sent as `apikey` and bearer token.
    #[serde(default)]
    pub anon_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// `0` disables the score cache.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_BACKEND_TIMEOUT_SECS
}

fn default_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_cleanup_interval_secs() -> u64 {
    DEFAULT_CLEANUP_INTERVAL_SECS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            log_level: None,
            backend: BackendConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl ServiceConfig {
    /// Load the service configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    /// Applies `GOGUMA_*` environment variables on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend.url = Some(url);
        }
        if let Some(key) = lookup(ENV_BACKEND_ANON_KEY) {
            self.backend.anon_key = Some(key);
        }
        if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
            self.listen_addr = addr;
        }
    }

    /// Fails when the backend cannot be reached with the current settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        if blank(&self.backend.url) {
            return Err(ConfigError::Missing("backend.url"));
        }
        if blank(&self.backend.anon_key) {
            return Err(ConfigError::Missing("backend.anon_key"));
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(self.listen_addr.clone()))
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache.cleanup_interval_secs.max(1))
    }
}
