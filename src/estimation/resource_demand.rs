// Resource demand estimation
//
// Utilization samples split time into windows (previous sample, sample].
// The busy time of a window, minus what the unmonitored internal actions
// with constant demands are predicted to have consumed in it, is shared by
// the monitored executions ending in that window in proportion to their
// response times. No execution is charged more than its response time.
// Executions outside every window are charged their response time.

use super::{fit_builder, refined_expression, ApplyReport, BranchEstimation, LoopEstimation};
use super::{EstimationError, Result};
use crate::architecture::{ArchitectureModel, InternalAction};
use crate::config::EstimationConfig;
use crate::dataset::{DatasetBuilder, DatasetMode};
use crate::estimator::FittedModel;
use crate::monitoring::MonitoringDataSet;
use crate::parameters::ServiceParameters;
use crate::records::{ResponseTimeRecord, ServiceCallRecord};
use crate::stoex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Demand attributed to one monitored execution of an internal action
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSample {
    pub internal_action_id: String,
    pub resource_id: String,
    pub parameters: ServiceParameters,
    pub demand: f64,
}

/// Demand models keyed by internal action id and resource id
#[derive(Debug, Clone)]
pub struct ResourceDemandEstimation {
    config: EstimationConfig,
    models: BTreeMap<(String, String), FittedModel>,
}

impl ResourceDemandEstimation {
    pub fn new(config: EstimationConfig) -> Self {
        Self {
            config,
            models: BTreeMap::new(),
        }
    }

    /// Refit demands; loop and branch models must already be up to date
    pub fn update(
        &mut self,
        dataset: &MonitoringDataSet,
        loops: &LoopEstimation,
        branches: &BranchEstimation,
        architecture: &ArchitectureModel,
    ) {
        let mut grouped: BTreeMap<(String, String), Vec<(ServiceParameters, f64)>> =
            BTreeMap::new();
        for sample in attribute_demands(dataset, loops, branches, architecture) {
            grouped
                .entry((sample.internal_action_id, sample.resource_id))
                .or_default()
                .push((sample.parameters, sample.demand));
        }

        for (key, samples) in grouped {
            let id = format!("{}@{}", key.0, key.1);
            match self.estimate(&id, &samples) {
                Ok(model) => {
                    tracing::debug!(entity = %id, kind = model.kind(), error = model.error(), "Demand model fitted");
                    self.models.insert(key, model);
                }
                Err(e) => tracing::warn!(entity = %id, error = %e, "Resource demand estimation failed"),
            }
        }
    }

    /// Fit demand against parameters, averaging repeated parameter sets
    pub fn estimate(&self, id: &str, samples: &[(ServiceParameters, f64)]) -> Result<FittedModel> {
        if samples.is_empty() {
            return Err(EstimationError::NoRecords(id.to_string()));
        }

        let mut order: Vec<&ServiceParameters> = Vec::new();
        let mut sums: HashMap<&ServiceParameters, (f64, usize)> = HashMap::new();
        for (parameters, demand) in samples {
            let entry = sums.entry(parameters).or_insert_with(|| {
                order.push(parameters);
                (0.0, 0)
            });
            entry.0 += demand;
            entry.1 += 1;
        }

        let mut builder = DatasetBuilder::new(DatasetMode::NumericOnly);
        for parameters in order {
            let (sum, count) = sums[parameters];
            builder.add_instance(parameters.clone(), sum / count as f64);
        }
        fit_builder(id, &builder, &self.config.entity_fit_options())
    }

    pub fn model(&self, internal_action_id: &str, resource_id: &str) -> Option<&FittedModel> {
        self.models
            .get(&(internal_action_id.to_string(), resource_id.to_string()))
    }

    /// Write the demand expression of every modelled action and resource
    pub fn apply(&self, architecture: &mut ArchitectureModel) -> ApplyReport {
        let mut report = ApplyReport::default();
        for action in &mut architecture.internal_actions {
            for slot in &mut action.resource_demands {
                let key = (action.id.clone(), slot.resource_id.clone());
                let Some(model) = self.models.get(&key) else {
                    tracing::warn!(
                        internal_action_id = %action.id,
                        resource_id = %slot.resource_id,
                        "No model for resource demand, leaving it unchanged"
                    );
                    report.skipped.push(format!("{}@{}", key.0, key.1));
                    continue;
                };
                let id = format!("{}@{}", key.0, key.1);
                let expression = refined_expression(
                    &id,
                    model,
                    self.config.resource_demand_threshold,
                    &self.config,
                );
                slot.specification = Some(stoex::replace_underscores_with_dots(&expression));
                report.set += 1;
            }
        }
        report
    }
}

/// Attribute utilization to the monitored executions of internal actions
pub fn attribute_demands(
    dataset: &MonitoringDataSet,
    loops: &LoopEstimation,
    branches: &BranchEstimation,
    architecture: &ArchitectureModel,
) -> Vec<DemandSample> {
    let monitored = dataset.monitored_internal_actions();
    let unmonitored: Vec<&InternalAction> = architecture
        .internal_actions
        .iter()
        .filter(|a| !monitored.contains(a.id.as_str()) && a.service_id.is_some())
        .collect();

    let mut by_resource: BTreeMap<&str, Vec<&ResponseTimeRecord>> = BTreeMap::new();
    for record in dataset.response_times() {
        by_resource
            .entry(record.resource_id.as_str())
            .or_default()
            .push(record);
    }

    let mut samples = Vec::new();
    for (resource_id, records) in by_resource {
        let utilization = dataset.utilization_of(resource_id);
        let mut charged: BTreeSet<usize> = BTreeSet::new();

        for window in utilization.windows(2) {
            let (start, end) = (window[0].timestamp, window[1].timestamp);
            let busy = window[1].utilization.clamp(0.0, 1.0) * end.saturating_sub(start) as f64;

            let unmonitored_busy: f64 = dataset
                .service_calls()
                .calls()
                .iter()
                .filter(|c| c.entry_time > start && c.entry_time <= end)
                .map(|c| unmonitored_demand(c, resource_id, &unmonitored, loops, branches))
                .sum();
            let residual = (busy - unmonitored_busy).max(0.0);

            let inside: Vec<usize> = records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.stop_time > start && r.stop_time <= end)
                .map(|(i, _)| i)
                .collect();
            let total: f64 = inside
                .iter()
                .map(|&i| records[i].response_time() as f64)
                .sum();

            for i in inside {
                let response_time = records[i].response_time() as f64;
                let share = if total > 0.0 {
                    residual * response_time / total
                } else {
                    0.0
                };
                samples.push(sample(dataset, records[i], share.min(response_time)));
                charged.insert(i);
            }
        }

        for (i, record) in records.iter().enumerate() {
            if !charged.contains(&i) {
                samples.push(sample(dataset, record, record.response_time() as f64));
            }
        }
    }
    samples
}

fn sample(dataset: &MonitoringDataSet, record: &ResponseTimeRecord, demand: f64) -> DemandSample {
    DemandSample {
        internal_action_id: record.internal_action_id.clone(),
        resource_id: record.resource_id.clone(),
        parameters: dataset.parameters_of(&record.service_execution_id),
        demand,
    }
}

/// Predicted busy time of unmonitored constant demands during one call
fn unmonitored_demand(
    call: &ServiceCallRecord,
    resource_id: &str,
    unmonitored: &[&InternalAction],
    loops: &LoopEstimation,
    branches: &BranchEstimation,
) -> f64 {
    unmonitored
        .iter()
        .filter(|a| a.service_id.as_deref() == Some(call.service_id.as_str()))
        .map(|action| {
            let demand: f64 = action
                .resource_demands
                .iter()
                .filter(|d| d.resource_id == resource_id)
                .filter_map(|d| d.constant_value())
                .sum();
            demand * executions_per_call(action, &call.parameters, loops, branches)
        })
        .sum()
}

/// How often an action runs in one call, from its enclosing loop and branch
fn executions_per_call(
    action: &InternalAction,
    parameters: &ServiceParameters,
    loops: &LoopEstimation,
    branches: &BranchEstimation,
) -> f64 {
    let iterations = action
        .enclosing_loop
        .as_deref()
        .and_then(|id| loops.predict_iterations(id, parameters))
        .map_or(1.0, |n| n.max(0.0));

    let taken = match &action.enclosing_branch {
        Some(context) => match branches.predict_transition(&context.branch_id, parameters) {
            Some(transition) if transition != context.transition_id => 0.0,
            _ => 1.0,
        },
        None => 1.0,
    };

    iterations * taken
}
