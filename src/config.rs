//! Estimation pass configuration
//!
//! Loaded from TOML; every field has a default so a file only needs the
//! values it changes:
//!
//! ```toml
//! optimize = true
//! resource_demand_threshold = 0.05
//!
//! [optimization]
//! mode = "log-exp"
//! generations = 500
//! seed = 7
//! ```

use crate::estimator::FitOptions;
use crate::optimizer::OptimizationConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Switches and thresholds of one estimation pass
///
/// # Example
/// ```
/// use pardep::config::EstimationConfig;
///
/// let config = EstimationConfig::from_toml_str("optimize = true").unwrap();
/// assert!(config.optimize);
/// assert_eq!(config.resource_demand_threshold, 0.01);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    /// Refine expressions by symbolic regression
    pub optimize: bool,

    /// Best-first attribute selection before fitting argument models
    pub feature_selection: bool,

    /// Use return values of earlier external calls as argument features
    pub return_value_features: bool,

    /// Estimate external call arguments
    pub external_call_estimation: bool,

    /// Minimum model error that triggers optimization, per entity kind
    pub loop_threshold: f64,
    pub branch_threshold: f64,
    pub resource_demand_threshold: f64,
    pub argument_threshold: f64,

    pub max_tree_depth: usize,

    pub optimization: OptimizationConfig,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl EstimationConfig {
    pub fn standard() -> Self {
        Self {
            optimize: false,
            feature_selection: false,
            return_value_features: false,
            external_call_estimation: false,
            loop_threshold: 0.1,
            branch_threshold: 0.1,
            resource_demand_threshold: 0.01,
            argument_threshold: 0.1,
            max_tree_depth: FitOptions::default().max_tree_depth,
            optimization: OptimizationConfig::standard(),
        }
    }

    /// Everything enabled with a short optimizer budget
    pub fn fast() -> Self {
        Self {
            optimize: true,
            return_value_features: true,
            external_call_estimation: true,
            optimization: OptimizationConfig::fast(),
            ..Self::standard()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load config: {}", path.as_ref().display()))
    }

    /// Fit options for argument models, the only kind that selects attributes
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            feature_selection: self.feature_selection,
            max_tree_depth: self.max_tree_depth,
            ..FitOptions::default()
        }
    }

    /// Fit options for loops, branches and resource demands
    pub fn entity_fit_options(&self) -> FitOptions {
        self.fit_options().with_feature_selection(false)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, threshold) in [
            ("loop_threshold", self.loop_threshold),
            ("branch_threshold", self.branch_threshold),
            ("resource_demand_threshold", self.resource_demand_threshold),
            ("argument_threshold", self.argument_threshold),
        ] {
            if threshold < 0.0 || threshold.is_nan() {
                return Err(format!("{} must be non-negative, got {}", name, threshold));
            }
        }

        if self.max_tree_depth == 0 {
            return Err("max_tree_depth must be at least 1".to_string());
        }

        self.optimization
            .validate()
            .map_err(|e| format!("optimization: {}", e))
    }
}
