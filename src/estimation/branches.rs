use super::{fit_builder, ApplyReport, EstimationError, Result};
use crate::architecture::ArchitectureModel;
use crate::config::EstimationConfig;
use crate::dataset::{DatasetBuilder, DatasetMode};
use crate::estimator::FittedModel;
use crate::monitoring::MonitoringDataSet;
use crate::parameters::ServiceParameters;
use crate::records::BranchRecord;
use crate::stoex;
use std::collections::BTreeMap;

/// Executed-transition models, one per branch id
#[derive(Debug, Clone)]
pub struct BranchEstimation {
    config: EstimationConfig,
    models: BTreeMap<String, FittedModel>,
}

impl BranchEstimation {
    pub fn new(config: EstimationConfig) -> Self {
        Self {
            config,
            models: BTreeMap::new(),
        }
    }

    pub fn update(&mut self, dataset: &MonitoringDataSet) {
        for (branch_id, records) in dataset.branches_by_id() {
            match self.estimate(dataset, branch_id, &records) {
                Ok(model) => {
                    tracing::debug!(branch_id, kind = model.kind(), error = model.error(), "Branch model fitted");
                    self.models.insert(branch_id.to_string(), model);
                }
                Err(e) => tracing::warn!(branch_id, error = %e, "Branch estimation failed"),
            }
        }
    }

    /// Fit the executed transition of one branch; "not taken" is its own label
    pub fn estimate(
        &self,
        dataset: &MonitoringDataSet,
        branch_id: &str,
        records: &[&BranchRecord],
    ) -> Result<FittedModel> {
        if records.is_empty() {
            return Err(EstimationError::NoRecords(branch_id.to_string()));
        }
        let mut builder = DatasetBuilder::new(DatasetMode::NoTransformations);
        for record in records {
            builder.add_instance(
                dataset.parameters_of(&record.service_execution_id),
                record.executed_transition(),
            );
        }
        fit_builder(branch_id, &builder, &self.config.entity_fit_options())
    }

    pub fn model(&self, branch_id: &str) -> Option<&FittedModel> {
        self.models.get(branch_id)
    }

    /// Transition id the branch most likely takes for an unseen call
    pub fn predict_transition(&self, branch_id: &str, parameters: &ServiceParameters) -> Option<String> {
        self.models
            .get(branch_id)
            .map(|m| m.predict_parameters(parameters).label())
    }

    /// Write a probability expression onto every transition of modelled branches
    pub fn apply(&self, architecture: &mut ArchitectureModel) -> ApplyReport {
        let mut report = ApplyReport::default();
        for branch in &mut architecture.branches {
            let Some(model) = self.models.get(&branch.id) else {
                tracing::warn!(branch_id = %branch.id, "No model for branch, leaving it unset");
                report.skipped.push(branch.id.clone());
                continue;
            };
            if model.error() >= self.config.branch_threshold {
                // transition models are nominal, so only the fitted tree is used
                tracing::debug!(
                    branch_id = %branch.id,
                    error = model.error(),
                    "Branch model error above threshold"
                );
            }
            for transition in &mut branch.transitions {
                match model.probability_expression(&transition.id) {
                    Some(expression) => {
                        transition.probability =
                            Some(stoex::replace_underscores_with_dots(&expression));
                        report.set += 1;
                    }
                    None => report.skipped.push(format!("{}/{}", branch.id, transition.id)),
                }
            }
        }
        report
    }
}
