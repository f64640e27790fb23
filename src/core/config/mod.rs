//! Configuration types and management for outlier-rs.
//!
//! The configuration holds the documented, user-tunable defaults of every
//! detection method and the size limits guarding the pairwise Sn estimator.
//! It round-trips through YAML.

pub mod defaults;
pub mod validation;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{OutlierError, Result};

pub use defaults::MethodDefaults;
pub use validation::{
    validate_finite, validate_open_range, validate_ordered_usize, validate_positive_f64,
    validate_positive_usize,
};

/// Main configuration for outlier detection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OutlierConfig {
    /// Default parameters used when a caller does not pass one explicitly
    #[serde(default)]
    pub defaults: MethodDefaults,

    /// Resource limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl OutlierConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            OutlierError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content).map_err(|e| {
            OutlierError::io(
                format!("Failed to write config file: {}", path.display()),
                e,
            )
        })
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        self.defaults
            .validate()
            .map_err(|e| OutlierError::config_field(format!("{e}"), "defaults"))?;
        self.limits
            .validate()
            .map_err(|e| OutlierError::config_field(format!("{e}"), "limits"))?;
        Ok(())
    }
}

/// Limits on the quadratic Sn computation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitsConfig {
    /// Row count above which Sn logs a cost warning
    #[serde(default = "LimitsConfig::default_pairwise_warn_rows")]
    pub pairwise_warn_rows: usize,

    /// Row count above which Sn refuses to run
    #[serde(default = "LimitsConfig::default_pairwise_max_rows")]
    pub pairwise_max_rows: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            pairwise_warn_rows: Self::default_pairwise_warn_rows(),
            pairwise_max_rows: Self::default_pairwise_max_rows(),
        }
    }
}

impl LimitsConfig {
    const fn default_pairwise_warn_rows() -> usize {
        2_000
    }

    const fn default_pairwise_max_rows() -> usize {
        20_000
    }

    /// Validate limit settings
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(self.pairwise_warn_rows, "pairwise_warn_rows")?;
        validate_positive_usize(self.pairwise_max_rows, "pairwise_max_rows")?;
        validate_ordered_usize(
            self.pairwise_warn_rows,
            self.pairwise_max_rows,
            "pairwise_warn_rows",
            "pairwise_max_rows",
        )
    }
}
