// Tests for the symbolic regression search

use super::engine::{crossover, point_mutation, random_tree, Vocabulary};
use super::*;
use crate::dataset::NumericSamples;
use crate::expression::{BinaryOp, ExpressionTree, Node};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn samples(xs: &[f64], ys: &[f64]) -> NumericSamples {
    NumericSamples {
        variables: vec!["x_VALUE".to_string()],
        rows: xs.iter().map(|x| vec![*x]).collect(),
        targets: ys.to_vec(),
    }
}

fn quick(seed: u64) -> OptimizationConfig {
    OptimizationConfig {
        generations: 15,
        time_limit_secs: 60,
        fitness_threshold: 0.0,
        ..OptimizationConfig::fast()
    }
    .with_seed(seed)
}

#[test]
fn test_default_config() {
    let config = OptimizationConfig::default();
    assert_eq!(config.generations, 10_000);
    assert_eq!(config.time_limit_secs, 120);
    assert_eq!(config.complexity, 25);
    assert_eq!(config.mode, OptimizationMode::Basic);
    assert_eq!(config.expression_depth, 5);
    assert_eq!(config.fitness_threshold, 0.1);
    assert!(!config.with_initial_individual);
    assert_eq!(config.population_size, 50);
    assert!(config.validate().is_ok());
}

#[test]
fn test_fast_config() {
    let config = OptimizationConfig::fast();
    assert!(config.generations < OptimizationConfig::standard().generations);
    assert!(config.with_initial_individual);
    assert!(config.validate().is_ok());
}

#[test]
#[allow(clippy::field_reassign_with_default)]
fn test_validate_rejects_bad_values() {
    let mut config = OptimizationConfig::default();
    config.population_size = 1;
    assert!(config.validate().unwrap_err().contains("population_size"));

    let mut config = OptimizationConfig::default();
    config.crossover_probability = 1.5;
    assert!(config.validate().unwrap_err().contains("crossover_probability"));

    let mut config = OptimizationConfig::default();
    config.expression_depth = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_mode_serde_names() {
    let json = serde_json::to_string(&OptimizationMode::LogExp).unwrap();
    assert_eq!(json, "\"log-exp\"");
    let mode: OptimizationMode = serde_json::from_str("\"trigonometric\"").unwrap();
    assert_eq!(mode, OptimizationMode::Trigonometric);
}

#[test]
fn test_complexity_penalty_saturates() {
    assert_eq!(complexity_penalty(0, 25), 0.0);
    assert_eq!(complexity_penalty(25, 25), 1.0);
    assert_eq!(complexity_penalty(80, 25), 1.0);
    let small = complexity_penalty(5, 25);
    assert!(small > 0.0 && small < 0.05);
}

#[test]
fn test_non_finite_prediction_is_infinite_error() {
    let data = samples(&[1.0, 2.0], &[1.0, 2.0]);
    let huge = Node::binary(BinaryOp::Pow, Node::Const(10.0), Node::Const(400.0));
    assert_eq!(mean_squared_error(&huge, &data), f64::INFINITY);
    assert_eq!(fitness(&huge, &data, 25), f64::INFINITY);
    assert_eq!(mean_squared_error(&Node::Var(0), &data), 0.0);
}

/// A perfect seed stops the search before the first generation
#[test]
fn test_perfect_seed_hits_threshold() {
    let data = samples(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
    let mut optimizer = Optimizer::new(OptimizationConfig::fast().with_seed(1));
    let outcome = optimizer
        .optimize(&data, Some("2.0 * x_VALUE + (0.0)"))
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::FitnessThreshold);
    assert_eq!(outcome.generations, 0);
    assert_eq!(outcome.error, 0.0);
    assert_eq!(outcome.expression, "2.0 * x_VALUE");
}

#[test]
fn test_seeded_result_never_worse_than_seed() {
    let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let ys: Vec<f64> = xs.iter().map(|x| x * x + 0.5).collect();
    let data = samples(&xs, &ys);
    let seed = "7.0 * x_VALUE + (-9.8)";
    let seed_tree = ExpressionTree::parse(seed, &data.variables).unwrap();
    let seed_error = mean_squared_error(seed_tree.root(), &data).sqrt();

    let mut optimizer = Optimizer::new(quick(42));
    let outcome = optimizer.optimize(&data, Some(seed)).unwrap();
    assert!(outcome.error <= seed_error + 1e-9);

    // the text form evaluates to the reported error
    let reparsed = ExpressionTree::parse(&outcome.expression, &data.variables).unwrap();
    let rmse = mean_squared_error(reparsed.root(), &data).sqrt();
    assert!((rmse - outcome.error).abs() < 1e-6);
}

#[test]
fn test_unparsable_seed_is_error() {
    let data = samples(&[1.0, 2.0], &[1.0, 3.0]);
    let mut optimizer = Optimizer::new(quick(3));
    let result = optimizer.optimize(&data, Some("(mode_VALUE == \"a\" ? 1 : 0)"));
    assert!(matches!(result, Err(OptimizerError::InvalidSeed(_))));
}

#[test]
fn test_seed_ignored_without_initial_individual() {
    let data = samples(&[1.0, 2.0, 3.0], &[1.0, 3.0, 2.0]);
    let config = OptimizationConfig {
        with_initial_individual: false,
        ..quick(3)
    };
    let mut optimizer = Optimizer::new(config);
    assert!(optimizer.optimize(&data, Some("not an ( expression")).is_ok());
}

#[test]
fn test_no_samples() {
    let data = samples(&[], &[]);
    let mut optimizer = Optimizer::new(quick(3));
    assert_eq!(
        optimizer.optimize(&data, None),
        Err(OptimizerError::NoSamples)
    );
}

#[test]
fn test_invalid_config_rejected() {
    let data = samples(&[1.0], &[1.0]);
    let config = OptimizationConfig {
        population_size: 0,
        ..quick(3)
    };
    let mut optimizer = Optimizer::new(config);
    assert!(matches!(
        optimizer.optimize(&data, None),
        Err(OptimizerError::InvalidConfig(_))
    ));
}

#[test]
fn test_generation_and_time_limits() {
    let data = samples(&[1.0, 2.0, 3.0, 4.0], &[1.3, 7.9, 2.2, 5.5]);

    let config = OptimizationConfig {
        generations: 3,
        ..quick(11)
    };
    let outcome = Optimizer::new(config).optimize(&data, None).unwrap();
    assert_eq!(outcome.stop_reason, StopReason::GenerationLimit);
    assert_eq!(outcome.generations, 3);

    let config = OptimizationConfig {
        time_limit_secs: 0,
        ..quick(11)
    };
    let outcome = Optimizer::new(config).optimize(&data, None).unwrap();
    assert_eq!(outcome.stop_reason, StopReason::TimeLimit);
    assert_eq!(outcome.generations, 0);
}

#[test]
fn test_fixed_seed_is_reproducible() {
    let data = samples(&[1.0, 2.0, 3.0, 4.0, 5.0], &[3.0, 5.5, 6.0, 9.5, 11.0]);
    let first = Optimizer::new(quick(99)).optimize(&data, None).unwrap();
    let second = Optimizer::new(quick(99)).optimize(&data, None).unwrap();
    assert_eq!(first.expression, second.expression);
    assert_eq!(first.generations, second.generations);
}

#[test]
fn test_basic_mode_uses_no_functions() {
    let data = samples(&[1.0, 2.0, 3.0, 4.0], &[2.0, 3.0, 7.0, 4.0]);
    let outcome = Optimizer::new(quick(5)).optimize(&data, None).unwrap();
    for name in ["log", "exp", "sqrt", "sin", "cos", "tan"] {
        assert!(!outcome.expression.contains(name));
    }
}

#[test]
fn test_random_trees_respect_depth() {
    let mut rng = StdRng::seed_from_u64(8);
    let vocabulary = Vocabulary::new(OptimizationMode::LogExp, 2);
    for depth in 1..=5 {
        for _ in 0..20 {
            let tree = random_tree(&mut rng, &vocabulary, depth);
            assert!(tree.depth() <= depth);
        }
    }
    assert!(random_tree(&mut rng, &vocabulary, 1).is_terminal());
}

#[test]
fn test_variation_operators() {
    let mut rng = StdRng::seed_from_u64(21);
    let vocabulary = Vocabulary::new(OptimizationMode::Basic, 1);
    let a = Node::binary(BinaryOp::Add, Node::Var(0), Node::Const(1.0));
    let b = Node::binary(
        BinaryOp::Mul,
        Node::Const(3.0),
        Node::binary(BinaryOp::Sub, Node::Var(0), Node::Const(2.0)),
    );

    for _ in 0..20 {
        let child = crossover(&mut rng, &a, &b);
        assert!(child.node_count() >= 1);
        assert!(child.node_count() <= a.node_count() - 1 + b.node_count());

        let mut mutated = b.clone();
        point_mutation(&mut rng, &vocabulary, &mut mutated);
        assert_eq!(mutated.node_count(), b.node_count());
        assert_eq!(mutated.depth(), b.depth());
    }
}
