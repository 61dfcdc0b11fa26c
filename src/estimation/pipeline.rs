use super::{
    ApplyReport, ArgumentEstimation, BranchEstimation, LoopEstimation, ResourceDemandEstimation,
};
use crate::architecture::ArchitectureModel;
use crate::config::EstimationConfig;
use crate::monitoring::MonitoringDataSet;
use std::fmt;

/// Outcome of one estimation pass, per entity kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimationSummary {
    pub loops: ApplyReport,
    pub branches: ApplyReport,
    pub resource_demands: ApplyReport,
    /// `None` when external call estimation is disabled
    pub arguments: Option<ApplyReport>,
}

impl EstimationSummary {
    pub fn total(&self) -> ApplyReport {
        let mut total = ApplyReport::default();
        total.absorb(self.loops.clone());
        total.absorb(self.branches.clone());
        total.absorb(self.resource_demands.clone());
        if let Some(arguments) = &self.arguments {
            total.absorb(arguments.clone());
        }
        total
    }
}

impl fmt::Display for EstimationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        line(f, "loops", &self.loops)?;
        line(f, "branches", &self.branches)?;
        line(f, "resource demands", &self.resource_demands)?;
        match &self.arguments {
            Some(report) => line(f, "arguments", report),
            None => writeln!(f, "{:<18} disabled", "arguments"),
        }
    }
}

fn line(f: &mut fmt::Formatter<'_>, kind: &str, report: &ApplyReport) -> fmt::Result {
    writeln!(
        f,
        "{:<18} {:>4} set {:>4} skipped",
        kind,
        report.set,
        report.skipped.len()
    )
}

/// Runs every orchestrator over one monitoring dataset, in dependency order
///
/// Resource demands are estimated after loops and branches, because the
/// contribution of unmonitored actions is scaled by loop and branch
/// predictions.
#[derive(Debug, Clone)]
pub struct SeffParameterEstimation {
    config: EstimationConfig,
    loops: LoopEstimation,
    branches: BranchEstimation,
    resource_demands: ResourceDemandEstimation,
    arguments: ArgumentEstimation,
}

impl SeffParameterEstimation {
    pub fn new(config: EstimationConfig) -> Self {
        Self {
            loops: LoopEstimation::new(config.clone()),
            branches: BranchEstimation::new(config.clone()),
            resource_demands: ResourceDemandEstimation::new(config.clone()),
            arguments: ArgumentEstimation::new(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EstimationConfig {
        &self.config
    }

    pub fn loops(&self) -> &LoopEstimation {
        &self.loops
    }

    pub fn branches(&self) -> &BranchEstimation {
        &self.branches
    }

    pub fn resource_demands(&self) -> &ResourceDemandEstimation {
        &self.resource_demands
    }

    pub fn arguments(&self) -> &ArgumentEstimation {
        &self.arguments
    }

    /// Refit from `dataset` and write all expressions into `architecture`
    pub fn update(
        &mut self,
        dataset: &MonitoringDataSet,
        architecture: &mut ArchitectureModel,
    ) -> EstimationSummary {
        self.loops.update(dataset);
        let loops = self.loops.apply(architecture);

        self.branches.update(dataset);
        let branches = self.branches.apply(architecture);

        self.resource_demands
            .update(dataset, &self.loops, &self.branches, architecture);
        let resource_demands = self.resource_demands.apply(architecture);

        let arguments = if self.config.external_call_estimation {
            self.arguments.update(dataset, architecture);
            Some(self.arguments.apply(architecture))
        } else {
            None
        };

        let summary = EstimationSummary {
            loops,
            branches,
            resource_demands,
            arguments,
        };
        let total = summary.total();
        tracing::info!(set = total.set, skipped = total.skipped.len(), "Estimation pass finished");
        summary
    }
}
