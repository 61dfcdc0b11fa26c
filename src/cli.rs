//! CLI argument parsing for pardep

use crate::config::EstimationConfig;
use crate::optimizer::OptimizationMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Operator set of the symbolic regression search
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// add, sub, mul, div, pow
    Basic,
    /// Basic plus log, log10, exp, sqrt
    LogExp,
    /// Basic plus sin, cos, tan
    Trigonometric,
}

impl From<ModeArg> for OptimizationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Basic => OptimizationMode::Basic,
            ModeArg::LogExp => OptimizationMode::LogExp,
            ModeArg::Trigonometric => OptimizationMode::Trigonometric,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pardep")]
#[command(version)]
#[command(about = "Estimate parametric dependencies of performance models from monitoring data", long_about = None)]
pub struct Cli {
    /// Monitoring data (JSON dump of service calls, loops, branches, ...)
    #[arg(short, long, value_name = "FILE")]
    pub monitoring: PathBuf,

    /// Architecture model to fill in (JSON)
    #[arg(long = "model", value_name = "FILE")]
    pub model: PathBuf,

    /// TOML configuration file; flags below override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the updated model here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Refine expressions by symbolic regression
    #[arg(long = "optimize")]
    pub optimize: bool,

    /// Select attributes before fitting argument models
    #[arg(long = "feature-selection")]
    pub feature_selection: bool,

    /// Use return values of earlier external calls as argument features
    #[arg(long = "return-values")]
    pub return_values: bool,

    /// Estimate external call arguments
    #[arg(long = "external-calls")]
    pub external_calls: bool,

    /// Operator set of the optimizer
    #[arg(long = "mode", value_enum)]
    pub mode: Option<ModeArg>,

    /// Fixed seed for reproducible optimizer runs
    #[arg(long = "seed", value_name = "N")]
    pub seed: Option<u64>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Apply flag overrides on top of a base configuration
    pub fn apply_overrides(&self, mut config: EstimationConfig) -> EstimationConfig {
        config.optimize |= self.optimize;
        config.feature_selection |= self.feature_selection;
        config.return_value_features |= self.return_values;
        config.external_call_estimation |= self.external_calls;
        if let Some(mode) = self.mode {
            config.optimization.mode = mode.into();
        }
        if let Some(seed) = self.seed {
            config.optimization.seed = Some(seed);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_inputs() {
        assert!(Cli::try_parse_from(["pardep"]).is_err());
        assert!(Cli::try_parse_from(["pardep", "--monitoring", "m.json"]).is_err());
    }

    #[test]
    fn test_cli_parses_paths() {
        let cli = Cli::parse_from(["pardep", "-m", "data.json", "--model", "model.json"]);
        assert_eq!(cli.monitoring, PathBuf::from("data.json"));
        assert_eq!(cli.model, PathBuf::from("model.json"));
        assert!(cli.config.is_none());
        assert!(cli.output.is_none());
    }

    #[test]
    fn test_cli_flags_default_false() {
        let cli = Cli::parse_from(["pardep", "-m", "d.json", "--model", "m.json"]);
        assert!(!cli.optimize);
        assert!(!cli.feature_selection);
        assert!(!cli.return_values);
        assert!(!cli.external_calls);
        assert!(!cli.debug);
        assert!(cli.mode.is_none());
    }

    #[test]
    fn test_cli_mode_values() {
        let cli = Cli::parse_from([
            "pardep", "-m", "d.json", "--model", "m.json", "--mode", "log-exp",
        ]);
        assert_eq!(cli.mode, Some(ModeArg::LogExp));
        assert!(Cli::try_parse_from([
            "pardep", "-m", "d.json", "--model", "m.json", "--mode", "cubic",
        ])
        .is_err());
    }

    #[test]
    fn test_overrides_only_enable() {
        let cli = Cli::parse_from([
            "pardep",
            "-m",
            "d.json",
            "--model",
            "m.json",
            "--optimize",
            "--external-calls",
            "--mode",
            "trigonometric",
            "--seed",
            "9",
        ]);
        let base = EstimationConfig {
            feature_selection: true,
            ..EstimationConfig::default()
        };
        let config = cli.apply_overrides(base);
        assert!(config.optimize);
        assert!(config.external_call_estimation);
        assert!(config.feature_selection);
        assert!(!config.return_value_features);
        assert_eq!(config.optimization.mode, OptimizationMode::Trigonometric);
        assert_eq!(config.optimization.seed, Some(9));
    }
}
