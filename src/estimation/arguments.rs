// External call argument estimation
//
// For each external call action, every callee parameter gets its own model
// over the caller execution's parameters. The dataset mode of a parameter is
// fixed by the type of its first observed value.

use super::{fit_builder, refined_expression, ApplyReport, EstimationError, Result};
use crate::architecture::{ArchitectureModel, ExternalCallAction};
use crate::config::EstimationConfig;
use crate::dataset::{DatasetBuilder, DatasetMode};
use crate::estimator::FittedModel;
use crate::monitoring::MonitoringDataSet;
use crate::parameters::ServiceParameters;
use crate::records::ServiceCallRecord;
use crate::stoex;
use std::collections::BTreeMap;

/// Argument models keyed by external call id and callee parameter name
#[derive(Debug, Clone)]
pub struct ArgumentEstimation {
    config: EstimationConfig,
    models: BTreeMap<(String, String), FittedModel>,
}

impl ArgumentEstimation {
    pub fn new(config: EstimationConfig) -> Self {
        Self {
            config,
            models: BTreeMap::new(),
        }
    }

    pub fn update(&mut self, dataset: &MonitoringDataSet, architecture: &ArchitectureModel) {
        for call in &architecture.external_calls {
            let records = dataset
                .external_calls()
                .calls_by_caller(&call.called_service_id, &call.id);
            if records.is_empty() {
                let e = EstimationError::NoRecords(call.id.clone());
                tracing::warn!(external_call_id = %call.id, error = %e, "Argument estimation skipped");
                continue;
            }

            for (parameter, result) in self.estimate(dataset, call, &records) {
                match result {
                    Ok(model) => {
                        tracing::debug!(
                            external_call_id = %call.id,
                            parameter = %parameter,
                            kind = model.kind(),
                            "Argument model fitted"
                        );
                        self.models.insert((call.id.clone(), parameter), model);
                    }
                    Err(e) => tracing::warn!(
                        external_call_id = %call.id,
                        parameter = %parameter,
                        error = %e,
                        "Argument estimation failed"
                    ),
                }
            }
        }
    }

    /// One model per callee parameter name
    pub fn estimate(
        &self,
        dataset: &MonitoringDataSet,
        call: &ExternalCallAction,
        records: &[&ServiceCallRecord],
    ) -> BTreeMap<String, Result<FittedModel>> {
        let mut builders: BTreeMap<String, DatasetBuilder> = BTreeMap::new();

        for record in records {
            let features = record
                .caller_service_execution_id
                .as_deref()
                .map(|id| dataset.parameters_of(id))
                .unwrap_or_default();
            let return_values = if self.config.return_value_features {
                predecessor_return_values(dataset, call, record)
            } else {
                ServiceParameters::new()
            };

            for (name, value) in record.parameters.iter() {
                builders
                    .entry(name.clone())
                    .or_insert_with(|| DatasetBuilder::new(DatasetMode::for_value(value)))
                    .add_instance_with_return_values(features.clone(), &return_values, value);
            }
        }

        builders
            .into_iter()
            .map(|(name, builder)| {
                let id = format!("{}/{}", call.id, name);
                let result = fit_builder(&id, &builder, &self.config.fit_options());
                (name, result)
            })
            .collect()
    }

    pub fn model(&self, external_call_id: &str, parameter: &str) -> Option<&FittedModel> {
        self.models
            .get(&(external_call_id.to_string(), parameter.to_string()))
    }

    /// Write one variable usage per modelled callee parameter
    pub fn apply(&self, architecture: &mut ArchitectureModel) -> ApplyReport {
        let mut report = ApplyReport::default();
        for call in &mut architecture.external_calls {
            let models: Vec<(&String, &FittedModel)> = self
                .models
                .range((call.id.clone(), String::new())..)
                .take_while(|((id, _), _)| *id == call.id)
                .map(|((_, parameter), model)| (parameter, model))
                .collect();
            if models.is_empty() {
                tracing::warn!(external_call_id = %call.id, "No argument models for external call");
                report.skipped.push(call.id.clone());
                continue;
            }

            for (parameter, model) in models {
                let id = format!("{}/{}", call.id, parameter);
                let mut expression =
                    refined_expression(&id, model, self.config.argument_threshold, &self.config);
                if model.table().mode() == DatasetMode::IntegerOnly {
                    expression = stoex::replace_fractions_with_pmf(&expression);
                }
                call.set_variable_usage(
                    &stoex::replace_underscores_with_dots(parameter),
                    stoex::replace_underscores_with_dots(&expression),
                );
                report.set += 1;
            }
        }
        report
    }
}

/// Return values of earlier calls to predecessor services in the same caller execution
fn predecessor_return_values(
    dataset: &MonitoringDataSet,
    call: &ExternalCallAction,
    record: &ServiceCallRecord,
) -> ServiceParameters {
    let Some(caller_execution) = record.caller_service_execution_id.as_deref() else {
        return ServiceParameters::new();
    };
    dataset
        .external_calls()
        .calls_in_execution(caller_execution)
        .into_iter()
        .filter(|c| {
            c.service_execution_id != record.service_execution_id
                && c.entry_time <= record.entry_time
                && call.predecessor_service_ids.contains(&c.service_id)
        })
        .fold(ServiceParameters::new(), |merged, c| merged.merge(&c.return_value))
}
