//! Configuration loading and validation.
//!
//! Configuration is read from a TOML file. Every section has defaults, so an
//! empty file is a valid configuration.
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "json"
//!
//! [engine]
//! simulated = true
//!
//! [execution.package_limits]
//! place = 50
//! ```

mod engine;
mod execution;
mod logging;

pub use engine::EngineConfig;
pub use execution::{ExecutionConfig, PackageLimits};
pub use logging::LoggingConfig;

use std::path::Path;

use serde::Deserialize;

use crate::domain::OrderPackageType;
use crate::error::{ConfigError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl Config {
    /// Parse and validate configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.engine.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "queue_capacity",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.engine.max_publish_latency_secs < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "max_publish_latency_secs",
                reason: "must be 0 or greater".to_string(),
            }
            .into());
        }
        if self.execution.order_separator.chars().count() != 1 {
            return Err(ConfigError::InvalidValue {
                field: "order_separator",
                reason: "must be a single character".to_string(),
            }
            .into());
        }
        if self.execution.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.execution.worker_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker_queue_capacity",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if OrderPackageType::ALL
            .iter()
            .any(|kind| self.execution.limit(*kind) == 0)
        {
            return Err(ConfigError::InvalidValue {
                field: "package_limits",
                reason: "every package limit must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize the tracing subscriber from the logging section.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
