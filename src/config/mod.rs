//! # Cadence Configuration System
//!
//! Explicit, validated configuration for every tunable the orchestrator
//! depends on. The sweep threshold, the provider's maximum call duration,
//! the retry ladder, and the driver's polling cadence are all configuration,
//! never inferred defaults buried in code.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cadence_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration (environment auto-detected, CADENCE_ env overrides)
//! let manager = ConfigManager::load()?;
//! let poll = manager.config().driver.poll_interval_seconds;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use loader::ConfigManager;

use crate::constants::{
    DEFAULT_CALL_TIMEOUT_SECONDS, DEFAULT_CLAIM_BATCH_SIZE, DEFAULT_MAX_CALL_DURATION_SECONDS,
    DEFAULT_MAX_CONCURRENT_DISPATCHES, DEFAULT_MAX_RETRY_COUNT, DEFAULT_POLL_INTERVAL_SECONDS,
    DEFAULT_RETRY_INTERVALS_SECONDS, DEFAULT_SWEEP_INTERVAL_SECONDS,
};
use crate::policy::RetryPolicy;

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("failed to read configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration for the engagement orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub database: DatabaseConfig,
    pub driver: DriverConfig,
    pub provider: ProviderConfig,
    pub sweep: SweepConfig,
    pub retry: RetryConfig,
    pub fallback: FallbackConfig,
    pub cache: CacheConfig,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            driver: DriverConfig::default(),
            provider: ProviderConfig::default(),
            sweep: SweepConfig::default(),
            retry: RetryConfig::default(),
            fallback: FallbackConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl CadenceConfig {
    /// Validate operational boundaries before anything is constructed from
    /// this configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.driver.poll_interval_seconds == 0 {
            return Err(ConfigurationError::Invalid(
                "driver.poll_interval_seconds must be positive".into(),
            ));
        }
        if self.driver.claim_batch_size == 0 {
            return Err(ConfigurationError::Invalid(
                "driver.claim_batch_size must be positive".into(),
            ));
        }
        if self.driver.max_concurrent_dispatches == 0 {
            return Err(ConfigurationError::Invalid(
                "driver.max_concurrent_dispatches must be positive".into(),
            ));
        }
        if self.provider.call_timeout_seconds == 0 {
            return Err(ConfigurationError::Invalid(
                "provider.call_timeout_seconds must be positive".into(),
            ));
        }
        if self.provider.max_call_duration_seconds == 0 {
            return Err(ConfigurationError::Invalid(
                "provider.max_call_duration_seconds must be positive".into(),
            ));
        }
        if self.sweep.interval_seconds == 0 {
            return Err(ConfigurationError::Invalid(
                "sweep.interval_seconds must be positive".into(),
            ));
        }
        if self.retry.intervals_seconds.is_empty() {
            return Err(ConfigurationError::Invalid(
                "retry.intervals_seconds must not be empty".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigurationError::Invalid(
                "retry.max_attempts must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Build the retry policy this configuration describes
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.intervals_seconds.clone(), self.retry.max_attempts)
    }
}

/// Durable store location for jobs and bulk schedules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. `sqlite:cadence.db`
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:cadence.db".to_string(),
        }
    }
}

/// Driver polling and dispatch boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub poll_interval_seconds: u64,
    pub claim_batch_size: u32,
    /// Parallel dispatch width, bounded by the provider's concurrency cap
    pub max_concurrent_dispatches: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECONDS,
            claim_batch_size: DEFAULT_CLAIM_BATCH_SIZE,
            max_concurrent_dispatches: DEFAULT_MAX_CONCURRENT_DISPATCHES,
        }
    }
}

impl DriverConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

/// Call provider gateway boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Bound on one `place_call` invocation; on expiry the attempt is
    /// treated as a synchronous failure
    pub call_timeout_seconds: u64,
    /// Provider-specific maximum call duration; a lead `Initiated` longer
    /// than this with no report is treated as a missed event by the sweep
    pub max_call_duration_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            call_timeout_seconds: DEFAULT_CALL_TIMEOUT_SECONDS,
            max_call_duration_seconds: DEFAULT_MAX_CALL_DURATION_SECONDS,
        }
    }
}

impl ProviderConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds)
    }

    pub fn max_call_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_call_duration_seconds as i64)
    }
}

/// Periodic reconciliation sweep cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub interval_seconds: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Retry ladder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Ordered interval ladder, in seconds (1h, 4h, 24h by default)
    pub intervals_seconds: Vec<u64>,
    /// Maximum call attempts before fallback
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            intervals_seconds: DEFAULT_RETRY_INTERVALS_SECONDS.to_vec(),
            max_attempts: DEFAULT_MAX_RETRY_COUNT,
        }
    }
}

/// Fallback channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Template sent over the secondary channel after exhaustion
    pub template_id: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            template_id: "missed-call-followup".to_string(),
        }
    }
}

/// Lead read-cache configuration (scoped to the lead store seam)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 30,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = CadenceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.intervals_seconds, vec![3_600, 14_400, 86_400]);
    }

    #[test]
    fn test_validation_rejects_zero_poll_interval() {
        let mut config = CadenceConfig::default();
        config.driver.poll_interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_retry_ladder() {
        let mut config = CadenceConfig::default();
        config.retry.intervals_seconds.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy_round_trip() {
        let config = CadenceConfig::default();
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts(), config.retry.max_attempts);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let parsed: CadenceConfig = toml_like(r#"{"driver": {"poll_interval_seconds": 1}}"#);
        assert_eq!(parsed.driver.poll_interval_seconds, 1);
        assert_eq!(parsed.driver.claim_batch_size, DEFAULT_CLAIM_BATCH_SIZE);
        assert_eq!(parsed.sweep.interval_seconds, DEFAULT_SWEEP_INTERVAL_SECONDS);
    }

    fn toml_like(json: &str) -> CadenceConfig {
        serde_json::from_str(json).unwrap()
    }
}
