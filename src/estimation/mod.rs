//! Per-entity estimation drivers
//!
//! Each orchestrator groups monitored records by the entity they belong to,
//! fits one model per entity and caches it under the entity id. Applying an
//! orchestrator to an [`ArchitectureModel`](crate::architecture::ArchitectureModel)
//! synthesizes the cached model's expression, optionally refines it by
//! symbolic regression, post-processes it and writes it into the entity's
//! slot. Entities without a cached model are left untouched.

mod arguments;
mod branches;
mod loops;
mod pipeline;
mod resource_demand;

pub use arguments::ArgumentEstimation;
pub use branches::BranchEstimation;
pub use loops::LoopEstimation;
pub use pipeline::{EstimationSummary, SeffParameterEstimation};
pub use resource_demand::{attribute_demands, DemandSample, ResourceDemandEstimation};

use crate::config::EstimationConfig;
use crate::dataset::DatasetError;
use crate::estimator::{FitError, FitOptions, FittedModel};
use crate::optimizer::Optimizer;
use crate::stoex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    #[error("No monitoring records for {0}")]
    NoRecords(String),

    #[error("Failed to fit model for {id}: {source}")]
    Fit {
        id: String,
        #[source]
        source: FitError,
    },

    #[error("Failed to build dataset for {id}: {source}")]
    Dataset {
        id: String,
        #[source]
        source: DatasetError,
    },
}

pub type Result<T> = std::result::Result<T, EstimationError>;

/// Slots written and entities skipped by one apply step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub set: usize,
    pub skipped: Vec<String>,
}

impl ApplyReport {
    fn absorb(&mut self, other: ApplyReport) {
        self.set += other.set;
        self.skipped.extend(other.skipped);
    }
}

/// Build, fit and wrap both failure kinds with the entity id
fn fit_builder(
    id: &str,
    builder: &crate::dataset::DatasetBuilder,
    options: &FitOptions,
) -> Result<FittedModel> {
    if builder.is_empty() {
        return Err(EstimationError::NoRecords(id.to_string()));
    }
    let table = builder.build().map_err(|source| EstimationError::Dataset {
        id: id.to_string(),
        source,
    })?;
    FittedModel::fit(table, options).map_err(|source| EstimationError::Fit {
        id: id.to_string(),
        source,
    })
}

/// Expression of a model, refined by symbolic regression when worthwhile
///
/// The search runs only when optimization is enabled, the model is numeric,
/// its error reaches `threshold` and it has more than one numeric
/// attribute to search over. The refined text replaces the model's own expression only if
/// its error is not higher.
fn refined_expression(
    id: &str,
    model: &FittedModel,
    threshold: f64,
    config: &EstimationConfig,
) -> String {
    let base = model.to_expression();
    if !config.optimize || !model.is_numeric() || model.error() < threshold {
        return base;
    }
    let Some(samples) = model.table().numeric_samples() else {
        return base;
    };
    if samples.variables.len() <= 1 {
        return base;
    }

    let mut optimizer = Optimizer::new(config.optimization.clone());
    match optimizer.optimize(&samples, Some(&base)) {
        Ok(outcome) if stoex::round3(outcome.error) <= model.error() => {
            tracing::info!(
                entity = id,
                before = model.error(),
                after = outcome.error,
                generations = outcome.generations,
                stop_reason = %outcome.stop_reason,
                "Optimized expression"
            );
            outcome.expression
        }
        Ok(outcome) => {
            tracing::debug!(
                entity = id,
                error = outcome.error,
                "Optimized expression is worse, keeping fitted one"
            );
            base
        }
        Err(e) => {
            tracing::warn!(entity = id, error = %e, "Optimization failed, keeping fitted expression");
            base
        }
    }
}

#[cfg(test)]
mod tests;
