//! Runtime configuration.
//!
//! Loaded from a TOML file when one is given or found at
//! `~/.lanscope/config.toml`; every field has a default so an empty or absent
//! file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

const DATA_DIR: &str = ".lanscope";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// User maintained MAC -> vendor/hostname overrides. Never written by us.
    #[serde(default = "default_overrides_path")]
    pub overrides_path: PathBuf,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_ms: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_broadcast_window")]
    pub broadcast_window_ms: u64,
    /// Interface used for broadcast sweeps; picked automatically when unset.
    #[serde(default)]
    pub interface: Option<String>,
    /// Store every resolved client in the IP information cache.
    #[serde(default = "default_cache_results")]
    pub cache_results: bool,
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR)
}

fn default_cache_path() -> PathBuf {
    data_dir().join("ip_info_cache.json")
}

fn default_overrides_path() -> PathBuf {
    data_dir().join("mac_info.json")
}

fn default_max_workers() -> usize {
    30
}

fn default_lookup_timeout() -> u64 {
    2_000
}

fn default_poll_interval() -> u64 {
    250
}

fn default_broadcast_window() -> u64 {
    3_000
}

fn default_cache_results() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            overrides_path: default_overrides_path(),
            max_workers: default_max_workers(),
            lookup_timeout_ms: default_lookup_timeout(),
            poll_interval_ms: default_poll_interval(),
            broadcast_window_ms: default_broadcast_window(),
            interface: None,
            cache_results: default_cache_results(),
        }
    }
}

impl DiscoveryConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn broadcast_window(&self) -> Duration {
        Duration::from_millis(self.broadcast_window_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Uses `explicit` when given, then the default location, then built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let default_path = data_dir().join(CONFIG_FILE);
        if default_path.is_file() {
            debug!("Loading config from {}", default_path.display());
            return Self::load(default_path);
        }

        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.discovery.max_workers, 30);
        assert_eq!(config.discovery.poll_interval(), Duration::from_millis(250));
        assert!(config.discovery.cache_results);
        assert!(config.discovery.interface.is_none());
        assert!(config.cache.path.ends_with("ip_info_cache.json"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[discovery]\nmax_workers = 8\ninterface = \"eth0\"\n\n[cache]\npath = \"/tmp/cache.json\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.discovery.max_workers, 8);
        assert_eq!(config.discovery.interface.as_deref(), Some("eth0"));
        assert_eq!(config.discovery.lookup_timeout_ms, 2_000);
        assert_eq!(config.cache.path, PathBuf::from("/tmp/cache.json"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[discovery\nmax_workers = ").unwrap();

        assert!(Config::load(file.path()).is_err());
    }
}
