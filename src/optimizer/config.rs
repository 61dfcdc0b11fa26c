// Configuration for the symbolic regression search

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operator vocabulary of the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizationMode {
    /// add, sub, mul, div, pow
    #[default]
    Basic,
    /// Basic plus log, log10, exp, sqrt
    LogExp,
    /// Basic plus sin, cos, tan
    Trigonometric,
}

/// Limits and rates of the evolutionary search
///
/// # Example
/// ```
/// use pardep::optimizer::OptimizationConfig;
///
/// let config = OptimizationConfig::default();
/// assert_eq!(config.generations, 10_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Generation budget
    pub generations: usize,

    /// Wall-clock budget in seconds
    pub time_limit_secs: u64,

    /// Node count at which the complexity penalty saturates
    pub complexity: usize,

    pub mode: OptimizationMode,

    /// Maximum depth of randomly generated trees
    pub expression_depth: usize,

    /// Stop as soon as the best fitness drops to this value
    pub fitness_threshold: f64,

    /// Seed the population with the parsed base expression
    pub with_initial_individual: bool,

    pub population_size: usize,
    pub tournament_size: usize,
    pub crossover_probability: f64,
    pub mutation_probability: f64,

    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl OptimizationConfig {
    /// Full-length search: 10000 generations, two minutes
    pub fn standard() -> Self {
        Self {
            generations: 10_000,
            time_limit_secs: 120,
            complexity: 25,
            mode: OptimizationMode::Basic,
            expression_depth: 5,
            fitness_threshold: 0.1,
            with_initial_individual: false,
            population_size: 50,
            tournament_size: 3,
            crossover_probability: 0.15,
            mutation_probability: 0.15,
            seed: None,
        }
    }

    /// Short search for interactive runs and tests
    pub fn fast() -> Self {
        Self {
            generations: 200,
            time_limit_secs: 5,
            with_initial_individual: true,
            ..Self::standard()
        }
    }

    pub fn with_mode(mut self, mode: OptimizationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.generations == 0 {
            return Err("generations must be at least 1".to_string());
        }

        if self.complexity == 0 {
            return Err("complexity must be at least 1".to_string());
        }

        if self.expression_depth == 0 {
            return Err("expression_depth must be at least 1".to_string());
        }

        if self.population_size < 2 {
            return Err(format!(
                "population_size must be >= 2, got {}",
                self.population_size
            ));
        }

        if self.tournament_size == 0 {
            return Err("tournament_size must be at least 1".to_string());
        }

        for (name, p) in [
            ("crossover_probability", self.crossover_probability),
            ("mutation_probability", self.mutation_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("{} must be in [0, 1], got {}", name, p));
            }
        }

        if self.fitness_threshold < 0.0 {
            return Err(format!(
                "fitness_threshold must be non-negative, got {}",
                self.fitness_threshold
            ));
        }

        Ok(())
    }
}
