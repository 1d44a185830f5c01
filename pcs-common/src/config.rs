//! Configuration loading and config file resolution
//!
//! Every section carries defaults, so a missing or partial TOML file still
//! yields a usable configuration. Command-line overrides are applied by the
//! binary after loading.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PCS_CONFIG";

/// Longest accepted percentage cache lifetime (one year)
pub const MAX_CACHE_EXPIRATION_MINUTES: u64 = 525_600;

/// Service configuration (pcs-calc.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub percentage_source: PercentageSourceConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir().join("pcs.db"),
        }
    }
}

/// Percentage cache sizing and expiry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live of a cached percentage, in minutes
    pub expiration_minutes: u64,
    /// Upper bound on cached entries (only one key is ever used)
    pub maximum_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiration_minutes: 30,
            maximum_size: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    #[default]
    Mock,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PercentageSourceConfig {
    pub mode: SourceMode,
    /// Endpoint for `mode = "http"`
    pub url: Option<String>,
    /// Per-attempt timeout for the HTTP source
    pub timeout_ms: u64,
    pub mock: MockSourceConfig,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for PercentageSourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::Mock,
            url: None,
            timeout_ms: 2000,
            mock: MockSourceConfig::default(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MockSourceConfig {
    pub default_percentage: f64,
    /// Probability in [0, 1] that a fetch fails
    pub failure_rate: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            default_percentage: 15.0,
            failure_rate: 0.3,
            min_latency_ms: 100,
            max_latency_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per fetch, including the first one
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed fetches before the breaker opens
    pub failure_threshold: u32,
    pub open_duration_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration_secs: 30,
        }
    }
}

/// Audit worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    /// Worker task count; 0 means "available parallelism"
    pub workers: usize,
    pub queue_capacity: usize,
    pub shutdown_grace_secs: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: 100,
            shutdown_grace_secs: 60,
        }
    }
}

impl AuditConfig {
    /// Effective worker count, capped at twice the available parallelism
    pub fn effective_workers(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        match self.workers {
            0 => cpus,
            n => n.min(cpus * 2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file; a missing file yields defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file found, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check value ranges; reports the first offending field
    pub fn validate(&self) -> Result<()> {
        if self.cache.expiration_minutes < 1 {
            return Err(invalid("cache.expiration_minutes", "must be at least 1 minute"));
        }
        if self.cache.expiration_minutes > MAX_CACHE_EXPIRATION_MINUTES {
            return Err(invalid(
                "cache.expiration_minutes",
                "must not exceed 525600 minutes (one year)",
            ));
        }
        if self.cache.maximum_size < 1 {
            return Err(invalid("cache.maximum_size", "must be at least 1"));
        }

        let source = &self.percentage_source;
        if source.mode == SourceMode::Http
            && source.url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(invalid("percentage_source.url", "required when mode = \"http\""));
        }
        if !(0.0..=100.0).contains(&source.mock.default_percentage) {
            return Err(invalid(
                "percentage_source.mock.default_percentage",
                "must be between 0 and 100",
            ));
        }
        if !(0.0..=1.0).contains(&source.mock.failure_rate) {
            return Err(invalid(
                "percentage_source.mock.failure_rate",
                "must be between 0.0 and 1.0",
            ));
        }
        if source.mock.min_latency_ms > source.mock.max_latency_ms {
            return Err(invalid(
                "percentage_source.mock.min_latency_ms",
                "must not exceed max_latency_ms",
            ));
        }
        if source.retry.max_attempts < 1 {
            return Err(invalid("percentage_source.retry.max_attempts", "must be at least 1"));
        }
        if source.circuit_breaker.failure_threshold < 1 {
            return Err(invalid(
                "percentage_source.circuit_breaker.failure_threshold",
                "must be at least 1",
            ));
        }
        if self.audit.queue_capacity < 1 {
            return Err(invalid("audit.queue_capacity", "must be at least 1"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::Config(format!("{} {}", field, reason))
}

/// Resolve the config file path in priority order:
/// 1. Command-line argument
/// 2. `PCS_CONFIG` environment variable
/// 3. `<config_dir>/pcs/pcs-calc.toml` if it exists
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("pcs").join("pcs-calc.toml"))
        .filter(|p| p.exists())
}

/// OS-dependent default data folder
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pcs"))
        .unwrap_or_else(|| PathBuf::from("./pcs_data"))
}
