//! Symbolic regression refinement of fitted expressions
//!
//! A generational genetic-programming search over expression trees. The
//! population may be seeded with the synthesized expression of a fitted
//! model; the best individual ever seen is simplified and returned.

mod config;
mod engine;

pub use config::{OptimizationConfig, OptimizationMode};
pub use engine::{
    complexity_penalty, fitness, mean_squared_error, OptimizationOutcome, Optimizer, StopReason,
    EPHEMERAL_LIMIT, MAX_TREE_DEPTH,
};

use crate::expression::ExpressionError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("Invalid seed expression: {0}")]
    InvalidSeed(#[from] ExpressionError),

    #[error("No samples to optimize over")]
    NoSamples,

    #[error("Invalid optimization config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests;
