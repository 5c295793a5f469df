//! Configuration management for shelfscan.
//!
//! Provides TOML-based configuration in the platform config directory with
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// Loaded from `~/.config/shelfscan/config.toml` (or platform equivalent).
/// Missing files and missing sections fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Per-request scraping behaviour
    pub scraping: ScrapingConfig,
    /// Per-domain request spacing
    pub rate_limit: RateLimitConfig,
    /// robots.txt gate
    pub compliance: ComplianceConfig,
    /// Batch dispatch settings
    pub registry: RegistryConfig,
}

impl AppConfig {
    /// Load configuration from the default path, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if the config directory cannot be determined or the file
    /// exists but is unreadable or invalid.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults if absent.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `SHELFSCAN_MAX_CONCURRENT`: Override the batch worker pool size
    /// - `SHELFSCAN_SOURCE_TIMEOUT_SECS`: Override the per-source deadline
    /// - `SHELFSCAN_FAIL_POLICY`: `open` or `closed`
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SHELFSCAN_*` environment overrides in place.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("SHELFSCAN_MAX_CONCURRENT") {
            if let Ok(max) = val.parse() {
                self.registry.max_concurrent_sources = max;
                tracing::debug!("Override registry.max_concurrent_sources from env: {}", max);
            }
        }

        if let Ok(val) = std::env::var("SHELFSCAN_SOURCE_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.registry.source_timeout_secs = secs;
                tracing::debug!("Override registry.source_timeout_secs from env: {}", secs);
            }
        }

        if let Ok(val) = std::env::var("SHELFSCAN_FAIL_POLICY") {
            match val.to_ascii_lowercase().as_str() {
                "open" => self.compliance.fail_policy = FailPolicy::Open,
                "closed" => self.compliance.fail_policy = FailPolicy::Closed,
                other => tracing::warn!("Ignoring unknown SHELFSCAN_FAIL_POLICY value: {}", other),
            }
        }
    }

    /// Save configuration to the default path, creating the directory if needed.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        tracing::debug!("Saving config to {}", path.display());
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject combinations the scraper cannot honour.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.rate_limit.min_delay_ms > self.rate_limit.max_delay_ms {
            return Err(invalid(
                "rate_limit.min_delay_ms",
                "must not exceed rate_limit.max_delay_ms",
            ));
        }
        if self.rate_limit.cooldown_min_ms > self.rate_limit.cooldown_max_ms {
            return Err(invalid(
                "rate_limit.cooldown_min_ms",
                "must not exceed rate_limit.cooldown_max_ms",
            ));
        }
        if self.registry.max_concurrent_sources == 0 {
            return Err(invalid("registry.max_concurrent_sources", "must be at least 1"));
        }
        if self.registry.source_timeout_secs == 0 {
            return Err(invalid("registry.source_timeout_secs", "must be at least 1"));
        }
        if self.scraping.max_retries == 0 {
            return Err(invalid("scraping.max_retries", "must be at least 1"));
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "shelfscan", "shelfscan").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Per-request scraping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Timeout for a single HTTP request in seconds
    pub request_timeout_secs: u64,
    /// Attempts per request for transient network failures
    pub max_retries: u32,
    /// Base delay for exponential retry backoff in milliseconds
    pub retry_base_delay_ms: u64,
    /// Upper bound on records returned by one source per search
    pub max_results_per_source: usize,
    /// Result pages fetched per search
    pub max_pages: u32,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 2000,
            max_results_per_source: 10,
            max_pages: 1,
        }
    }
}

impl ScrapingConfig {
    /// Request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Per-domain request spacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Lower bound of the randomized inter-request interval
    pub min_delay_ms: u64,
    /// Upper bound of the randomized inter-request interval
    pub max_delay_ms: u64,
    /// Every N requests to a domain use the longer cooldown interval (0 = never)
    pub cooldown_every: u32,
    /// Lower bound of the cooldown interval
    pub cooldown_min_ms: u64,
    /// Upper bound of the cooldown interval
    pub cooldown_max_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 3000,
            cooldown_every: 10,
            cooldown_min_ms: 5000,
            cooldown_max_ms: 10_000,
        }
    }
}

/// What the compliance gate answers when robots.txt cannot be obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailPolicy {
    /// Deny every path of the domain
    #[default]
    Closed,
    /// Allow every path of the domain (logged)
    Open,
}

/// robots.txt gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// How long parsed rules stay valid
    pub cache_ttl_secs: u64,
    /// How long a failed fetch is remembered before retrying
    pub failure_ttl_secs: u64,
    /// Answer used when the rules cannot be fetched
    pub fail_policy: FailPolicy,
    /// Product token matched against `User-agent` groups
    pub user_agent_token: String,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 24 * 60 * 60,
            failure_ttl_secs: 600,
            fail_policy: FailPolicy::Closed,
            user_agent_token: "shelfscan".to_string(),
        }
    }
}

/// Batch dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Worker pool size for batch searches
    pub max_concurrent_sources: usize,
    /// Deadline for one source's search in seconds
    pub source_timeout_secs: u64,
    /// Sources registered but disabled at startup
    pub disabled_sources: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sources: 5,
            source_timeout_secs: 90,
            disabled_sources: Vec::new(),
        }
    }
}

impl RegistryConfig {
    /// Per-source deadline as a `Duration`.
    #[must_use]
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}
