//! Configuration Loader
//!
//! Environment-aware configuration loading: an optional base TOML file, an
//! optional environment-specific overlay, then `CADENCE_`-prefixed
//! environment variables, validated before use.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use config::{Config, Environment, File};
use tracing::debug;

use super::{CadenceConfig, ConfigurationError};

/// Loaded, validated configuration plus the environment it was loaded for
pub struct ConfigManager {
    config: CadenceConfig,
    environment: String,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Arc<ConfigManager>, ConfigurationError> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory (defaults to `config/`
    /// under the working directory)
    pub fn load_from_directory(
        config_dir: Option<PathBuf>,
    ) -> Result<Arc<ConfigManager>, ConfigurationError> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load with an explicit environment. Useful for tests that must not
    /// mutate process-global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>, ConfigurationError> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let base = config_directory.join("cadence");
        let overlay = config_directory.join(format!("cadence.{environment}"));

        let config: CadenceConfig = Config::builder()
            .add_source(File::from(base).required(false))
            .add_source(File::from(overlay).required(false))
            .add_source(Environment::with_prefix("CADENCE").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
        }))
    }

    /// Detect the current environment (development when unset)
    fn detect_environment() -> String {
        env::var("CADENCE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    pub fn config(&self) -> &CadenceConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }
}
