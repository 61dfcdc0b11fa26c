// Tests for the per-entity orchestrators and the estimation pipeline

use super::*;
use crate::architecture::{
    ArchitectureModel, BranchAction, ExternalCallAction, InternalAction, LoopAction,
};
use crate::dataset::{DatasetBuilder, DatasetMode};
use crate::estimator::{FitOptions, FittedModel};
use crate::expression::ExpressionTree;
use crate::monitoring::MonitoringDataSet;
use crate::optimizer::OptimizationConfig;
use crate::parameters::{ParameterValue, ServiceParameters};
use crate::records::{
    BranchRecord, LoopRecord, MonitoredRecord, ResourceUtilizationRecord, ResponseTimeRecord,
    ServiceCallRecord, BRANCH_NOT_TAKEN,
};

fn size(value: i64) -> ServiceParameters {
    let mut p = ServiceParameters::new();
    p.add_int("size", value);
    p
}

fn call(execution: &str, service: &str, parameters: ServiceParameters) -> MonitoredRecord {
    MonitoredRecord::ServiceCall(ServiceCallRecord::new(execution, service, parameters))
}

fn response_time(execution: &str, action: &str, start: u64, stop: u64) -> MonitoredRecord {
    MonitoredRecord::ResponseTime(ResponseTimeRecord {
        session_id: String::new(),
        service_execution_id: execution.to_string(),
        internal_action_id: action.to_string(),
        resource_id: "cpu".to_string(),
        start_time: start,
        stop_time: stop,
    })
}

fn utilization(timestamp: u64, value: f64) -> MonitoredRecord {
    MonitoredRecord::ResourceUtilization(ResourceUtilizationRecord {
        resource_id: "cpu".to_string(),
        timestamp,
        utilization: value,
    })
}

/// Loop L1 runs 2, 4 and 6 times for size 1, 2 and 3
fn loop_dataset() -> MonitoringDataSet {
    let mut records = Vec::new();
    for i in 1..=3 {
        let execution = format!("e{}", i);
        records.push(call(&execution, "S1", size(i)));
        records.push(MonitoredRecord::Loop(LoopRecord::new(&execution, "L1", 2 * i)));
    }
    MonitoringDataSet::from_records(records)
}

#[test]
fn test_loop_scenario_sets_l1_and_skips_l2() {
    let dataset = loop_dataset();
    let mut architecture = ArchitectureModel {
        loops: vec![LoopAction::new("L1"), LoopAction::new("L2")],
        ..Default::default()
    };

    let mut loops = LoopEstimation::new(EstimationConfig::default());
    loops.update(&dataset);
    let report = loops.apply(&mut architecture);

    let model = loops.model("L1").unwrap();
    assert_eq!(model.error(), 0.0);
    assert_eq!(
        architecture.loops[0].iteration_count.as_deref(),
        Some("2 * size.VALUE + (0)")
    );
    assert!(architecture.loops[1].iteration_count.is_none());
    assert_eq!(report.set, 1);
    assert_eq!(report.skipped, vec!["L2".to_string()]);

    let predicted = loops.predict_iterations("L1", &size(10)).unwrap();
    assert!((predicted - 20.0).abs() < 1e-6);
    assert!(loops.predict_iterations("L2", &size(10)).is_none());
}

#[test]
fn test_loop_without_records_is_no_records_error() {
    let loops = LoopEstimation::new(EstimationConfig::default());
    let result = loops.estimate(&MonitoringDataSet::default(), "L9", &[]);
    assert_eq!(result, Err(EstimationError::NoRecords("L9".to_string())));
}

#[test]
fn test_conflicting_parameter_types_is_dataset_error() {
    let mut text = ServiceParameters::new();
    text.add_string("size", Some("big"));
    let dataset = MonitoringDataSet::from_records(vec![
        call("e1", "S1", size(1)),
        call("e2", "S1", text),
        MonitoredRecord::Loop(LoopRecord::new("e1", "L1", 1)),
        MonitoredRecord::Loop(LoopRecord::new("e2", "L1", 3)),
    ]);
    let loops = LoopEstimation::new(EstimationConfig::default());
    let records = dataset.loops_by_id().remove("L1").unwrap();
    assert!(matches!(
        loops.estimate(&dataset, "L1", &records),
        Err(EstimationError::Dataset { .. })
    ));
}

#[test]
fn test_update_replaces_cached_model() {
    let mut loops = LoopEstimation::new(EstimationConfig::default());
    loops.update(&loop_dataset());
    assert_eq!(loops.model("L1").unwrap().kind(), "regression");

    let constant = MonitoringDataSet::from_records(vec![
        call("e1", "S1", size(1)),
        call("e2", "S1", size(5)),
        MonitoredRecord::Loop(LoopRecord::new("e1", "L1", 7)),
        MonitoredRecord::Loop(LoopRecord::new("e2", "L1", 7)),
    ]);
    loops.update(&constant);
    assert_eq!(loops.model("L1").unwrap().kind(), "constant");
    assert_eq!(loops.predict_iterations("L1", &size(100)), Some(7.0));
}

#[test]
fn test_feature_selection_leaves_loop_attributes_alone() {
    let mut records = Vec::new();
    for a in 1..=9 {
        let execution = format!("e{}", a);
        let mut parameters = ServiceParameters::new();
        parameters.add_int("a", a);
        parameters.add_int("b", (a * 7) % 4);
        records.push(call(&execution, "S1", parameters));
        records.push(MonitoredRecord::Loop(LoopRecord::new(&execution, "L1", 2 * a)));
    }
    let dataset = MonitoringDataSet::from_records(records);
    let config = EstimationConfig {
        feature_selection: true,
        ..EstimationConfig::default()
    };

    let mut loops = LoopEstimation::new(config);
    loops.update(&dataset);
    assert_eq!(
        loops.model("L1").unwrap().table().attribute_names(),
        vec!["a_VALUE", "b_VALUE"]
    );
}

/// A branch whose executed id is always the not-taken sentinel
#[test]
fn test_branch_always_not_taken() {
    let mut records = Vec::new();
    for i in 1..=4 {
        let execution = format!("e{}", i);
        records.push(call(&execution, "S1", size(i)));
        let executed = if i % 2 == 0 { "" } else { BRANCH_NOT_TAKEN };
        records.push(MonitoredRecord::Branch(BranchRecord::new(&execution, "B1", executed)));
    }
    let dataset = MonitoringDataSet::from_records(records);

    let mut branches = BranchEstimation::new(EstimationConfig::default());
    branches.update(&dataset);
    let model = branches.model("B1").unwrap();
    assert_eq!(model.to_expression(), BRANCH_NOT_TAKEN);
    for i in [0, 3, 50] {
        assert_eq!(
            branches.predict_transition("B1", &size(i)).as_deref(),
            Some(BRANCH_NOT_TAKEN)
        );
    }

    let mut architecture = ArchitectureModel {
        branches: vec![BranchAction::new("B1", ["t1", "t2"])],
        ..Default::default()
    };
    let report = branches.apply(&mut architecture);
    assert_eq!(report.set, 2);
    for transition in &architecture.branches[0].transitions {
        assert_eq!(transition.probability.as_deref(), Some("0.0"));
    }
}

#[test]
fn test_branch_probabilities_follow_tree() {
    let mut records = Vec::new();
    for i in 1..=6 {
        let execution = format!("e{}", i);
        records.push(call(&execution, "S1", size(i)));
        let executed = if i <= 3 { "t1" } else { "t2" };
        records.push(MonitoredRecord::Branch(BranchRecord::new(&execution, "B1", executed)));
    }
    let dataset = MonitoringDataSet::from_records(records);
    let mut branches = BranchEstimation::new(EstimationConfig::default());
    branches.update(&dataset);

    let mut architecture = ArchitectureModel {
        branches: vec![BranchAction::new("B1", ["t1", "t2"])],
        ..Default::default()
    };
    branches.apply(&mut architecture);
    let transitions = &architecture.branches[0].transitions;
    assert_eq!(
        transitions[0].probability.as_deref(),
        Some("((size.VALUE <= 3.5) ? 1.0 : 0.0)")
    );
    assert_eq!(
        transitions[1].probability.as_deref(),
        Some("((size.VALUE <= 3.5) ? 0.0 : 1.0)")
    );
    assert_eq!(branches.predict_transition("B1", &size(5)).as_deref(), Some("t2"));
}

#[test]
fn test_demand_is_response_time_without_utilization() {
    let dataset = MonitoringDataSet::from_records(vec![
        call("e1", "S1", size(1)),
        call("e2", "S1", size(2)),
        call("e3", "S1", size(2)),
        response_time("e1", "IA1", 0, 10),
        response_time("e2", "IA1", 0, 18),
        response_time("e3", "IA1", 0, 22),
    ]);
    let mut architecture = ArchitectureModel {
        internal_actions: vec![InternalAction::new("IA1", ["cpu"]).in_service("S1")],
        ..Default::default()
    };
    let config = EstimationConfig::default();
    let loops = LoopEstimation::new(config.clone());
    let branches = BranchEstimation::new(config.clone());

    let samples = attribute_demands(&dataset, &loops, &branches, &architecture);
    let demands: Vec<f64> = samples.iter().map(|s| s.demand).collect();
    assert_eq!(demands, vec![10.0, 18.0, 22.0]);

    let mut demands = ResourceDemandEstimation::new(config);
    demands.update(&dataset, &loops, &branches, &architecture);
    let model = demands.model("IA1", "cpu").unwrap();
    // two distinct parameter sets: averages 10 and 20
    assert_eq!(model.kind(), "regression");
    assert!((model.predict_parameters(&size(3)).as_f64().unwrap() - 30.0).abs() < 1e-6);

    demands.apply(&mut architecture);
    let specification = architecture.internal_actions[0].resource_demands[0]
        .specification
        .clone()
        .unwrap();
    assert_eq!(specification, "10.0 * size.VALUE + (0.0)");
}

#[test]
fn test_single_parameter_set_gives_constant_demand() {
    let config = EstimationConfig::default();
    let demands = ResourceDemandEstimation::new(config);
    let samples = vec![(size(1), 4.0), (size(1), 6.0)];
    let model = demands.estimate("IA1@cpu", &samples).unwrap();
    assert_eq!(model.kind(), "constant");
    assert_eq!(model.to_expression(), "5.0");
    assert_eq!(
        demands.estimate("IA1@cpu", &[]),
        Err(EstimationError::NoRecords("IA1@cpu".to_string()))
    );
}

/// Busy time 50 in (0, 100]; an unmonitored action consumes 5 per loop
/// iteration (2 iterations), leaving 40 for the monitored executions
#[test]
fn test_utilization_shared_after_unmonitored_demand() {
    let dataset = MonitoringDataSet::from_records(vec![
        MonitoredRecord::ServiceCall(
            ServiceCallRecord::new("e1", "S1", size(1)).with_times(10, 90),
        ),
        MonitoredRecord::Loop(LoopRecord::new("e1", "L1", 2)),
        MonitoredRecord::Branch(BranchRecord::new("e1", "B1", "t1")),
        utilization(0, 0.0),
        utilization(100, 0.5),
        response_time("e1", "IA1", 10, 40),
        response_time("e1", "IA1", 20, 70),
        response_time("e1", "IA1", 120, 150),
    ]);
    let architecture = ArchitectureModel {
        internal_actions: vec![
            InternalAction::new("IA1", ["cpu"]).in_service("S1"),
            InternalAction::new("IA2", ["cpu"])
                .in_service("S1")
                .in_loop("L1")
                .with_constant_demand("cpu", 5.0),
            // never taken according to the branch model
            InternalAction::new("IA3", ["cpu"])
                .in_service("S1")
                .in_branch("B1", "t2")
                .with_constant_demand("cpu", 100.0),
        ],
        ..Default::default()
    };

    let config = EstimationConfig::default();
    let mut loops = LoopEstimation::new(config.clone());
    loops.update(&dataset);
    let mut branches = BranchEstimation::new(config);
    branches.update(&dataset);

    let samples = attribute_demands(&dataset, &loops, &branches, &architecture);
    let demands: Vec<f64> = samples.iter().map(|s| s.demand).collect();
    assert_eq!(demands.len(), 3);
    assert!((demands[0] - 15.0).abs() < 1e-9);
    assert!((demands[1] - 25.0).abs() < 1e-9);
    // outside every window
    assert_eq!(demands[2], 30.0);
}

#[test]
fn test_share_capped_at_response_time() {
    let dataset = MonitoringDataSet::from_records(vec![
        call("e1", "S1", size(1)),
        utilization(0, 0.0),
        utilization(100, 1.0),
        response_time("e1", "IA1", 50, 60),
    ]);
    let config = EstimationConfig::default();
    let samples = attribute_demands(
        &dataset,
        &LoopEstimation::new(config.clone()),
        &BranchEstimation::new(config),
        &ArchitectureModel::default(),
    );
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].demand, 10.0);
}

fn external(execution: &str, caller: &str, service: &str, caller_id: &str) -> ServiceCallRecord {
    ServiceCallRecord::new(execution, service, ServiceParameters::new()).with_caller(caller, caller_id)
}

#[test]
fn test_argument_estimation_per_parameter() {
    let mut records = Vec::new();
    for i in 1..=3 {
        let caller = format!("e{}", i);
        records.push(call(&caller, "S1", size(i)));
        let mut parameters = ServiceParameters::new();
        parameters.add_int("n", 2 * i);
        parameters.add_string("mode", Some("fast"));
        let mut record = external(&format!("x{}", i), &caller, "S2", "EC1");
        record.parameters = parameters;
        records.push(MonitoredRecord::ExternalCall(record));
    }
    let dataset = MonitoringDataSet::from_records(records);
    let mut architecture = ArchitectureModel {
        external_calls: vec![
            ExternalCallAction::new("EC1", "S2"),
            ExternalCallAction::new("EC9", "S2"),
        ],
        ..Default::default()
    };

    let mut arguments = ArgumentEstimation::new(EstimationConfig::default());
    arguments.update(&dataset, &architecture);
    assert_eq!(
        arguments.model("EC1", "n_VALUE").unwrap().table().mode(),
        DatasetMode::IntegerOnly
    );
    assert_eq!(
        arguments.model("EC1", "mode_VALUE").unwrap().table().mode(),
        DatasetMode::NoTransformations
    );

    let report = arguments.apply(&mut architecture);
    assert_eq!(report.skipped, vec!["EC9".to_string()]);

    let usages = &architecture.external_calls[0].variable_usages;
    let spec = |name: &str| {
        usages
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.specification.clone())
    };
    assert_eq!(spec("n.VALUE").as_deref(), Some("2 * size.VALUE + (0)"));
    assert_eq!(spec("mode.VALUE").as_deref(), Some("fast"));
    assert_eq!(spec("mode.BYTESIZE").as_deref(), Some("4"));
}

#[test]
fn test_return_values_of_predecessors_become_features() {
    let mut records = Vec::new();
    for i in 1..=4 {
        let caller = format!("e{}", i);
        records.push(call(&caller, "S1", size(1)));

        let mut returned = ServiceParameters::new();
        returned.add_int("r", 3 * i);
        let predecessor = external(&format!("p{}", i), &caller, "S3", "EC0")
            .with_times(1, 2)
            .with_return_value(returned);
        records.push(MonitoredRecord::ExternalCall(predecessor));

        let mut record = external(&format!("x{}", i), &caller, "S2", "EC1").with_times(5, 6);
        record.parameters.add_int("n", 3 * i);
        records.push(MonitoredRecord::ExternalCall(record));
    }
    let dataset = MonitoringDataSet::from_records(records);
    let mut action = ExternalCallAction::new("EC1", "S2");
    action.predecessor_service_ids = vec!["S3".to_string()];
    let mut architecture = ArchitectureModel {
        external_calls: vec![action],
        ..Default::default()
    };

    let config = EstimationConfig {
        return_value_features: true,
        ..EstimationConfig::default()
    };
    let mut arguments = ArgumentEstimation::new(config);
    arguments.update(&dataset, &architecture);
    arguments.apply(&mut architecture);

    let usage = &architecture.external_calls[0].variable_usages[0];
    assert_eq!(usage.name, "n.VALUE");
    assert_eq!(usage.specification, "1 * r.VALUE + (0)");
}

fn two_attribute_model() -> FittedModel {
    let mut builder = DatasetBuilder::new(DatasetMode::NumericOnly);
    for a in 1..=4 {
        for b in 1..=3 {
            let mut p = ServiceParameters::new();
            p.insert("a_VALUE", ParameterValue::Integer(a));
            p.insert("b_VALUE", ParameterValue::Integer(b));
            builder.add_instance(p, (a * a * b) as f64);
        }
    }
    FittedModel::fit(builder.build().unwrap(), &FitOptions::default()).unwrap()
}

#[test]
fn test_refinement_policy() {
    let model = two_attribute_model();
    assert!(model.error() > 0.1);
    let base = model.to_expression();

    let disabled = EstimationConfig::default();
    assert_eq!(refined_expression("x", &model, 0.1, &disabled), base);

    let enabled = EstimationConfig {
        optimize: true,
        optimization: OptimizationConfig::fast().with_seed(17),
        ..EstimationConfig::default()
    };
    // error below threshold
    assert_eq!(refined_expression("x", &model, 1e9, &enabled), base);

    let refined = refined_expression("x", &model, 0.1, &enabled);
    let samples = model.table().numeric_samples().unwrap();
    let rmse = |text: &str| {
        let tree = ExpressionTree::parse(text, &samples.variables).unwrap();
        let sum: f64 = samples
            .rows
            .iter()
            .zip(&samples.targets)
            .map(|(row, y)| (tree.evaluate(row) - y).powi(2))
            .sum();
        (sum / samples.targets.len() as f64).sqrt()
    };
    assert!(rmse(&refined) <= rmse(&base) + 1e-9);
}

#[test]
fn test_single_attribute_model_is_not_optimized() {
    let mut builder = DatasetBuilder::new(DatasetMode::NumericOnly);
    for x in 1..=5 {
        builder.add_instance(size(x), (x * x) as f64);
    }
    let model = FittedModel::fit(builder.build().unwrap(), &FitOptions::default()).unwrap();
    let config = EstimationConfig::fast();
    assert_eq!(
        refined_expression("L1", &model, 0.0, &config),
        model.to_expression()
    );
}

#[test]
fn test_nominal_attributes_do_not_count_for_optimization() {
    let mut builder = DatasetBuilder::new(DatasetMode::NumericOnly);
    for x in 1..=6 {
        let mut p = size(x);
        let mode = if x % 2 == 0 { "fast" } else { "slow" };
        p.insert("mode_VALUE", ParameterValue::String(mode.to_string()));
        builder.add_instance(p, (x * x + x % 2) as f64);
    }
    let model = FittedModel::fit(builder.build().unwrap(), &FitOptions::default()).unwrap();
    assert!(model.table().num_attributes() > 1);
    assert_eq!(model.table().numeric_samples().unwrap().variables.len(), 1);

    let config = EstimationConfig {
        optimize: true,
        optimization: OptimizationConfig {
            with_initial_individual: false,
            ..OptimizationConfig::fast().with_seed(5)
        },
        ..EstimationConfig::default()
    };
    assert_eq!(
        refined_expression("L1", &model, 0.0, &config),
        model.to_expression()
    );
}

#[test]
fn test_pipeline_runs_all_kinds() {
    let mut records = Vec::new();
    for i in 1..=3 {
        let execution = format!("e{}", i);
        records.push(call(&execution, "S1", size(i)));
        records.push(MonitoredRecord::Loop(LoopRecord::new(&execution, "L1", 2 * i)));
        records.push(MonitoredRecord::Branch(BranchRecord::new(&execution, "B1", "t1")));
        records.push(response_time(&execution, "IA1", 0, 5));
    }
    let dataset = MonitoringDataSet::from_records(records);
    let mut architecture = ArchitectureModel {
        loops: vec![LoopAction::new("L1")],
        branches: vec![BranchAction::new("B1", ["t1", "t2"])],
        internal_actions: vec![InternalAction::new("IA1", ["cpu"]).in_service("S1")],
        external_calls: vec![ExternalCallAction::new("EC1", "S2")],
    };

    let mut pipeline = SeffParameterEstimation::new(EstimationConfig::default());
    let summary = pipeline.update(&dataset, &mut architecture);

    assert_eq!(summary.loops.set, 1);
    assert_eq!(summary.branches.set, 2);
    assert_eq!(summary.resource_demands.set, 1);
    assert!(summary.arguments.is_none());
    assert_eq!(summary.total().set, 4);
    assert!(summary.to_string().contains("disabled"));

    assert_eq!(
        architecture.branches[0].transitions[0].probability.as_deref(),
        Some("1.0")
    );
    assert_eq!(
        architecture.internal_actions[0].resource_demands[0]
            .specification
            .as_deref(),
        Some("5.0")
    );
    assert!(pipeline.loops().model("L1").is_some());
}
