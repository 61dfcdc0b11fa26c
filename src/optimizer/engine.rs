// Generational genetic programming over expression trees

use super::config::{OptimizationConfig, OptimizationMode};
use super::{OptimizerError, Result};
use crate::dataset::NumericSamples;
use crate::expression::{BinaryOp, ExpressionTree, Node, UnaryOp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Offspring deeper than this are replaced by their first parent
pub const MAX_TREE_DEPTH: usize = 17;

/// Upper bound (exclusive) of ephemeral integer constants
pub const EPHEMERAL_LIMIT: i64 = 10;

const BINARY_OPS: [BinaryOp; 5] = [
    BinaryOp::Add,
    BinaryOp::Mul,
    BinaryOp::Pow,
    BinaryOp::Sub,
    BinaryOp::Div,
];

/// Why a search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    FitnessThreshold,
    TimeLimit,
    GenerationLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::FitnessThreshold => "fitness threshold reached",
            StopReason::TimeLimit => "time limit elapsed",
            StopReason::GenerationLimit => "generation limit exhausted",
        };
        write!(f, "{}", text)
    }
}

/// Best expression found by one search
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    pub tree: ExpressionTree,
    pub expression: String,
    /// Root mean squared error over the samples
    pub error: f64,
    pub fitness: f64,
    pub generations: usize,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone)]
struct Individual {
    node: Node,
    fitness: f64,
}

/// Symbolic regression driver holding the configuration and random source
pub struct Optimizer {
    config: OptimizationConfig,
    rng: StdRng,
}

impl Optimizer {
    pub fn new(config: OptimizationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &OptimizationConfig {
        &self.config
    }

    /// Search for an expression over `samples`
    ///
    /// With `with_initial_individual` set, `seed_expression` is parsed against
    /// the sample variables and placed in the first population. The returned
    /// expression then never has a larger error than the seed.
    pub fn optimize(
        &mut self,
        samples: &NumericSamples,
        seed_expression: Option<&str>,
    ) -> Result<OptimizationOutcome> {
        self.config
            .validate()
            .map_err(OptimizerError::InvalidConfig)?;
        if samples.targets.is_empty() {
            return Err(OptimizerError::NoSamples);
        }

        let seed = match seed_expression {
            Some(text) if self.config.with_initial_individual => {
                Some(ExpressionTree::parse(text, &samples.variables)?.into_root())
            }
            _ => None,
        };

        let vocabulary = Vocabulary::new(self.config.mode, samples.variables.len());
        let mut population = self.initial_population(&vocabulary, seed.clone(), samples);
        let mut best = fittest(&population).clone();

        let started = Instant::now();
        let time_limit = self.config.time_limit();
        let mut generations = 0;

        let stop_reason = loop {
            if best.fitness <= self.config.fitness_threshold {
                break StopReason::FitnessThreshold;
            }
            if generations >= self.config.generations {
                break StopReason::GenerationLimit;
            }
            if started.elapsed() >= time_limit {
                break StopReason::TimeLimit;
            }

            population = self.next_generation(&population, &vocabulary, samples);
            generations += 1;

            let candidate = fittest(&population);
            if candidate.fitness < best.fitness {
                best = candidate.clone();
            }
        };

        let mut result = best.node;
        let mut result_mse = mean_squared_error(&result, samples);

        if let Some(seed) = seed {
            let seed_mse = mean_squared_error(&seed, samples);
            if seed_mse < result_mse {
                result = seed;
                result_mse = seed_mse;
            }
        }

        let tree = ExpressionTree::new(result, samples.variables.clone());
        let simplified = tree.simplify();
        let simplified_mse = mean_squared_error(simplified.root(), samples);
        let (tree, mse) = if simplified_mse <= result_mse {
            (simplified, simplified_mse)
        } else {
            (tree, result_mse)
        };

        let fitness = penalized(mse, tree.node_count(), self.config.complexity);
        tracing::debug!(
            generations,
            fitness,
            stop_reason = %stop_reason,
            "Symbolic regression finished"
        );

        Ok(OptimizationOutcome {
            expression: tree.to_string(),
            error: mse.sqrt(),
            fitness,
            generations,
            stop_reason,
            tree,
        })
    }

    fn initial_population(
        &mut self,
        vocabulary: &Vocabulary,
        seed: Option<Node>,
        samples: &NumericSamples,
    ) -> Vec<Individual> {
        let size = self.config.population_size;
        let depth = self.config.expression_depth;
        let mut population = Vec::with_capacity(size);

        if let Some(node) = seed {
            population.push(self.evaluate(node, samples));
        }

        // ramped: depths cycle through 1..=depth
        let mut ramp = 0;
        while population.len() < size {
            let node = random_tree(&mut self.rng, vocabulary, ramp % depth + 1);
            population.push(self.evaluate(node, samples));
            ramp += 1;
        }
        population
    }

    fn next_generation(
        &mut self,
        population: &[Individual],
        vocabulary: &Vocabulary,
        samples: &NumericSamples,
    ) -> Vec<Individual> {
        let mut next = Vec::with_capacity(population.len());
        next.push(fittest(population).clone());

        while next.len() < population.len() {
            let first = self.tournament(population);
            let mut child = population[first].node.clone();

            if self.rng.gen_bool(self.config.crossover_probability) {
                let second = self.tournament(population);
                child = crossover(&mut self.rng, &child, &population[second].node);
            }
            if self.rng.gen_bool(self.config.mutation_probability) {
                point_mutation(&mut self.rng, vocabulary, &mut child);
            }
            if child.depth() > MAX_TREE_DEPTH {
                child = population[first].node.clone();
            }

            next.push(self.evaluate(child, samples));
        }
        next
    }

    fn tournament(&mut self, population: &[Individual]) -> usize {
        let mut winner = self.rng.gen_range(0..population.len());
        for _ in 1..self.config.tournament_size {
            let candidate = self.rng.gen_range(0..population.len());
            if population[candidate].fitness < population[winner].fitness {
                winner = candidate;
            }
        }
        winner
    }

    fn evaluate(&self, node: Node, samples: &NumericSamples) -> Individual {
        let fitness = fitness(&node, samples, self.config.complexity);
        Individual { node, fitness }
    }
}

// populations are never empty once the configuration validated
fn fittest(population: &[Individual]) -> &Individual {
    let mut best = &population[0];
    for candidate in &population[1..] {
        if candidate.fitness < best.fitness {
            best = candidate;
        }
    }
    best
}

/// Operators and terminals available to random generation and mutation
pub(super) struct Vocabulary {
    unary: &'static [UnaryOp],
    variables: usize,
}

impl Vocabulary {
    pub(super) fn new(mode: OptimizationMode, variables: usize) -> Self {
        let unary: &'static [UnaryOp] = match mode {
            OptimizationMode::Basic => &[],
            OptimizationMode::LogExp => &[UnaryOp::Log, UnaryOp::Log10, UnaryOp::Exp, UnaryOp::Sqrt],
            OptimizationMode::Trigonometric => &[UnaryOp::Sin, UnaryOp::Cos, UnaryOp::Tan],
        };
        Self { unary, variables }
    }

    fn operator_count(&self) -> usize {
        BINARY_OPS.len() + self.unary.len()
    }

    fn terminal_count(&self) -> usize {
        self.variables + 1
    }

    fn terminal<R: Rng>(&self, rng: &mut R) -> Node {
        let pick = rng.gen_range(0..self.terminal_count());
        if pick < self.variables {
            Node::Var(pick)
        } else {
            Node::Const(rng.gen_range(0..EPHEMERAL_LIMIT) as f64)
        }
    }
}

/// Grow a random tree no deeper than `depth`
pub(super) fn random_tree<R: Rng>(rng: &mut R, vocabulary: &Vocabulary, depth: usize) -> Node {
    let total = vocabulary.operator_count() + vocabulary.terminal_count();
    if depth <= 1 || rng.gen_range(0..total) < vocabulary.terminal_count() {
        return vocabulary.terminal(rng);
    }

    let pick = rng.gen_range(0..vocabulary.operator_count());
    if pick < BINARY_OPS.len() {
        Node::binary(
            BINARY_OPS[pick],
            random_tree(rng, vocabulary, depth - 1),
            random_tree(rng, vocabulary, depth - 1),
        )
    } else {
        Node::unary(
            vocabulary.unary[pick - BINARY_OPS.len()],
            random_tree(rng, vocabulary, depth - 1),
        )
    }
}

/// Replace a random subtree of `receiver` with a random subtree of `donor`
pub(super) fn crossover<R: Rng>(rng: &mut R, receiver: &Node, donor: &Node) -> Node {
    let mut child = receiver.clone();
    let at = rng.gen_range(0..receiver.node_count());
    let from = rng.gen_range(0..donor.node_count());
    if let Some(graft) = donor.subtree(from).cloned() {
        child.replace_subtree(at, graft);
    }
    child
}

/// Swap one node for another of the same arity
pub(super) fn point_mutation<R: Rng>(rng: &mut R, vocabulary: &Vocabulary, node: &mut Node) {
    let at = rng.gen_range(0..node.node_count());
    let Some(target) = node.subtree_mut(at) else {
        return;
    };
    if target.is_terminal() {
        *target = vocabulary.terminal(rng);
        return;
    }
    match target {
        Node::Const(_) | Node::Var(_) => {}
        Node::Unary(op, _) => {
            if !vocabulary.unary.is_empty() {
                *op = vocabulary.unary[rng.gen_range(0..vocabulary.unary.len())];
            }
        }
        Node::Binary(op, _, _) => {
            *op = BINARY_OPS[rng.gen_range(0..BINARY_OPS.len())];
        }
    }
}

/// Mean squared error; infinite when any prediction is not finite
pub fn mean_squared_error(node: &Node, samples: &NumericSamples) -> f64 {
    if samples.targets.is_empty() {
        return f64::INFINITY;
    }
    let mut sum = 0.0;
    for (row, target) in samples.rows.iter().zip(&samples.targets) {
        let predicted = node.evaluate(row);
        if !predicted.is_finite() {
            return f64::INFINITY;
        }
        sum += (predicted - target).powi(2);
    }
    let mse = sum / samples.targets.len() as f64;
    if mse.is_finite() {
        mse
    } else {
        f64::INFINITY
    }
}

/// Penalty in [0, 1] growing with node count until it saturates at `max`
pub fn complexity_penalty(nodes: usize, max: usize) -> f64 {
    if max == 0 {
        return 1.0;
    }
    let ratio = nodes.min(max) as f64 / max as f64;
    1.0 - (1.0 - ratio * ratio).sqrt()
}

fn penalized(mse: f64, nodes: usize, max: usize) -> f64 {
    mse * (1.0 + complexity_penalty(nodes, max))
}

/// Error scaled by the complexity penalty; lower is better
pub fn fitness(node: &Node, samples: &NumericSamples, max_nodes: usize) -> f64 {
    penalized(mean_squared_error(node, samples), node.node_count(), max_nodes)
}
