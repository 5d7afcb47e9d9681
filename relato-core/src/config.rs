//! Configuration
//!
//! One TOML file, `$XDG_CONFIG_HOME/relato/config.toml`, with a section
//! per concern: `[collector]` for the delivery endpoint, `[image]` for
//! photo transcoding, `[logging]` for the file log level. Every field has
//! a default, so a missing file (the common case on a fresh install) is
//! a working offline-only configuration.
//!
//! All on-disk paths hang off the XDG base directories: config and the
//! location catalog under `$XDG_CONFIG_HOME/relato/`, the queue database
//! under `$XDG_DATA_HOME/relato/`, logs under `$XDG_STATE_HOME/relato/`.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// XDG base directory: the env var when set, else the fallback under home
fn xdg_base(env_var: &str, home_fallback: &str) -> PathBuf {
    std::env::var_os(env_var)
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(home_fallback))
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Report collector configuration
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Photo transcoding configuration
    #[serde(default)]
    pub image: ImageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Report collector configuration
///
/// The collector endpoint is where queued reports get delivered. Without
/// one configured, reports accumulate locally and `sync` explains why.
#[derive(Debug, Deserialize, Clone)]
pub struct CollectorConfig {
    /// Collector URL (e.g., `https://reports.example.org/ingest`)
    pub endpoint_url: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_collector_timeout")]
    pub timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            timeout_secs: default_collector_timeout(),
        }
    }
}

impl CollectorConfig {
    /// Check if a collector endpoint is configured
    pub fn is_ready(&self) -> bool {
        self.endpoint_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.endpoint_url {
            if url.trim().is_empty() {
                return Err(Error::Config(
                    "collector.endpoint_url must not be empty when set".to_string(),
                ));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Config(
                    "collector.endpoint_url must be an http(s) URL".to_string(),
                ));
            }
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "collector.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_collector_timeout() -> u64 {
    30
}

/// Photo transcoding configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ImageConfig {
    /// Maximum output width in pixels; wider photos get downscaled
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// JPEG quality on a 0.0-1.0 scale
    #[serde(default = "default_quality")]
    pub quality: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            quality: default_quality(),
        }
    }
}

impl ImageConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 {
            return Err(Error::Config(
                "image.max_width must be at least 1".to_string(),
            ));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(Error::Config(
                "image.quality must be in (0.0, 1.0]".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_max_width() -> u32 {
    1280
}

fn default_quality() -> f32 {
    0.7
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load the config file, or defaults when none is installed
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load a config file from an explicit path; the file must exist
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.collector.validate()?;
        self.image.validate()?;
        Ok(())
    }

    /// `$XDG_CONFIG_HOME/relato/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_base("XDG_CONFIG_HOME", ".config")
            .join("relato")
            .join("config.toml")
    }

    /// `$XDG_CONFIG_HOME/relato/catalog.toml` (the location catalog)
    pub fn catalog_path() -> PathBuf {
        xdg_base("XDG_CONFIG_HOME", ".config")
            .join("relato")
            .join("catalog.toml")
    }

    /// `$XDG_DATA_HOME/relato/`, holds the queue database
    pub fn data_dir() -> PathBuf {
        xdg_base("XDG_DATA_HOME", ".local/share").join("relato")
    }

    /// `$XDG_STATE_HOME/relato/`, holds the rolling log files
    pub fn state_dir() -> PathBuf {
        xdg_base("XDG_STATE_HOME", ".local/state").join("relato")
    }

    /// `$XDG_DATA_HOME/relato/queue.db`
    pub fn queue_path() -> PathBuf {
        Self::data_dir().join("queue.db")
    }

    /// Pin the XDG base env vars so every component resolves the same
    /// paths for the rest of the process. Binaries call this first.
    pub fn ensure_xdg_env() {
        let home = home_dir();
        for (var, fallback) in [
            ("XDG_CONFIG_HOME", ".config"),
            ("XDG_DATA_HOME", ".local/share"),
            ("XDG_STATE_HOME", ".local/state"),
        ] {
            if std::env::var_os(var).is_none() {
                std::env::set_var(var, home.join(fallback));
            }
        }
    }
}
