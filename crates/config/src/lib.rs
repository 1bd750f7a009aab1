#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for repomirror
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/repomirror/config.toml)
//! - Environment variables
//! - CLI flags

use repomirror_errors::{ConfigError, Error};
use repomirror_types::{Channel, FilterSet, PatternSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub mirror: MirrorConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub verify: VerifyConfig,

    #[serde(default)]
    pub filter: FilterConfig,
}

/// Mirror source and target configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MirrorConfig {
    /// Upstream channel: a bare name or a full URL
    pub upstream: Option<String>,
    /// Platform subdirectories to synchronize
    #[serde(default)]
    pub subdirs: Vec<String>,
    /// Local mirror root directory
    pub target: Option<PathBuf>,
    /// Keep only the highest version of each package
    #[serde(default)]
    pub latest_only: bool,
    /// Cap the number of artifacts downloaded per subdirectory
    #[serde(default)]
    pub max_packages: Option<usize>,
    /// Free-space floor that must remain after planned downloads
    #[serde(default = "default_min_free_space_mb")]
    pub min_free_space_mb: u64,
    /// Withhold index publication for a subdirectory with failures
    #[serde(default)]
    pub strict: bool,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Concurrent artifact downloads
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Total attempts per artifact, first try included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_secs")]
    pub max_retry_delay_secs: u64,
    /// HTTP(S) proxy URL
    #[serde(default)]
    pub proxy: Option<String>,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
}

/// Checksum verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Verify digests of fresh downloads before promotion
    #[serde(default = "default_true")]
    pub downloads: bool,
    /// Re-hash artifacts already on disk before planning
    #[serde(default = "default_true")]
    pub existing: bool,
}

/// Record filter configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilterConfig {
    #[serde(default)]
    pub blacklist: Vec<PatternSpec>,
    #[serde(default)]
    pub whitelist: Vec<PatternSpec>,
}

// Default implementations

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 360, // 6 minutes per request
            connect_timeout_secs: 30,
            concurrency: 4,
            max_attempts: 3,
            initial_retry_delay_ms: 500,
            max_retry_delay_secs: 30,
            proxy: None,
            insecure: false,
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            downloads: true,
            existing: true,
        }
    }
}

// Default value functions for serde

fn default_min_free_space_mb() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    360 // 6 minutes per request
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_retry_delay_ms() -> u64 {
    500
}

fn default_max_retry_delay_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl NetworkConfig {
    /// Per-request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connection establishment timeout
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Delay before the first retry
    #[must_use]
    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms)
    }

    /// Ceiling for backoff delays
    #[must_use]
    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_secs(self.max_retry_delay_secs)
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("repomirror").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// If path is provided, loads from that file.
    /// If path is None, uses the default loading behavior.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // REPOMIRROR_UPSTREAM
        if let Ok(upstream) = std::env::var("REPOMIRROR_UPSTREAM") {
            self.mirror.upstream = Some(upstream);
        }

        // REPOMIRROR_TARGET
        if let Ok(target) = std::env::var("REPOMIRROR_TARGET") {
            self.mirror.target = Some(PathBuf::from(target));
        }

        // REPOMIRROR_PROXY
        if let Ok(proxy) = std::env::var("REPOMIRROR_PROXY") {
            self.network.proxy = Some(proxy);
        }

        // REPOMIRROR_CONCURRENCY
        if let Ok(concurrency) = std::env::var("REPOMIRROR_CONCURRENCY") {
            self.network.concurrency =
                concurrency.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "REPOMIRROR_CONCURRENCY".to_string(),
                    value: concurrency,
                })?;
        }

        Ok(())
    }

    /// Check that required fields are present and value ranges sane
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing or out-of-range field.
    pub fn validate(&self) -> Result<(), Error> {
        if self
            .mirror
            .upstream
            .as_deref()
            .is_none_or(|u| u.trim().is_empty())
        {
            return Err(ConfigError::MissingField {
                field: "mirror.upstream".to_string(),
            }
            .into());
        }
        if self.mirror.target.is_none() {
            return Err(ConfigError::MissingField {
                field: "mirror.target".to_string(),
            }
            .into());
        }
        if self.mirror.subdirs.is_empty() {
            return Err(ConfigError::MissingField {
                field: "mirror.subdirs".to_string(),
            }
            .into());
        }
        if self.network.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.concurrency".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.network.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.max_attempts".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Resolve the configured upstream into a channel location
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream is absent or unparseable.
    pub fn upstream_channel(&self) -> Result<Channel, Error> {
        let upstream = self.mirror.upstream.as_deref().ok_or_else(|| {
            Error::from(ConfigError::MissingField {
                field: "mirror.upstream".to_string(),
            })
        })?;
        Channel::parse(upstream)
    }

    /// Compile the configured filter patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern holds an invalid glob.
    pub fn compile_filters(&self) -> Result<FilterSet, Error> {
        FilterSet::compile(&self.filter.blacklist, &self.filter.whitelist)
    }

    /// Get the mirror target directory (validated configs always have one)
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        self.mirror.target.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
