use super::{fit_builder, refined_expression, ApplyReport, EstimationError, Result};
use crate::architecture::ArchitectureModel;
use crate::config::EstimationConfig;
use crate::dataset::{DatasetBuilder, DatasetMode};
use crate::estimator::FittedModel;
use crate::monitoring::MonitoringDataSet;
use crate::parameters::ServiceParameters;
use crate::records::LoopRecord;
use crate::stoex;
use std::collections::BTreeMap;

/// Iteration count models, one per loop id
#[derive(Debug, Clone)]
pub struct LoopEstimation {
    config: EstimationConfig,
    models: BTreeMap<String, FittedModel>,
}

impl LoopEstimation {
    pub fn new(config: EstimationConfig) -> Self {
        Self {
            config,
            models: BTreeMap::new(),
        }
    }

    /// Refit every loop that has records in `dataset`
    pub fn update(&mut self, dataset: &MonitoringDataSet) {
        for (loop_id, records) in dataset.loops_by_id() {
            match self.estimate(dataset, loop_id, &records) {
                Ok(model) => {
                    tracing::debug!(loop_id, kind = model.kind(), error = model.error(), "Loop model fitted");
                    self.models.insert(loop_id.to_string(), model);
                }
                Err(e) => tracing::warn!(loop_id, error = %e, "Loop estimation failed"),
            }
        }
    }

    /// Fit the iteration count of one loop against its executions' parameters
    pub fn estimate(
        &self,
        dataset: &MonitoringDataSet,
        loop_id: &str,
        records: &[&LoopRecord],
    ) -> Result<FittedModel> {
        if records.is_empty() {
            return Err(EstimationError::NoRecords(loop_id.to_string()));
        }
        let mut builder = DatasetBuilder::new(DatasetMode::IntegerOnly);
        for record in records {
            builder.add_instance(
                dataset.parameters_of(&record.service_execution_id),
                record.loop_iteration_count,
            );
        }
        fit_builder(loop_id, &builder, &self.config.entity_fit_options())
    }

    pub fn model(&self, loop_id: &str) -> Option<&FittedModel> {
        self.models.get(loop_id)
    }

    /// Predicted iteration count of a loop for an unseen call
    pub fn predict_iterations(&self, loop_id: &str, parameters: &ServiceParameters) -> Option<f64> {
        self.models
            .get(loop_id)
            .and_then(|m| m.predict_parameters(parameters).as_f64())
    }

    /// Write the iteration count expression of every modelled loop
    pub fn apply(&self, architecture: &mut ArchitectureModel) -> ApplyReport {
        let mut report = ApplyReport::default();
        for action in &mut architecture.loops {
            let Some(model) = self.models.get(&action.id) else {
                tracing::warn!(loop_id = %action.id, "No model for loop, leaving it unset");
                report.skipped.push(action.id.clone());
                continue;
            };
            let expression =
                refined_expression(&action.id, model, self.config.loop_threshold, &self.config);
            let expression =
                stoex::replace_underscores_with_dots(&stoex::replace_fractions_with_pmf(&expression));
            action.iteration_count = Some(expression);
            report.set += 1;
        }
        report
    }
}
