// Binary decision tree over a nominal class (C4.5-style gain ratio)
//
// Numeric attributes split on midpoint thresholds (`<=`), nominal attributes
// on equality with a single level. Rows with a missing split value are sent
// down the heavier branch, both when growing and when predicting.

use super::{FitError, Result};
use crate::dataset::{AttributeKind, FeatureTable, FeatureValue};
use crate::stoex;

/// Test at an internal node
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    LessOrEqual {
        index: usize,
        attribute: String,
        threshold: f64,
    },
    Equals {
        index: usize,
        attribute: String,
        level: String,
    },
}

impl Condition {
    /// `None` when the row has no usable value for the attribute
    pub fn test(&self, row: &[FeatureValue]) -> Option<bool> {
        match self {
            Condition::LessOrEqual {
                index, threshold, ..
            } => row.get(*index)?.as_f64().map(|v| v <= *threshold),
            Condition::Equals { index, level, .. } => {
                row.get(*index)?.as_label().map(|l| l == level.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// Weighted class counts, aligned with the model's labels
    Leaf { counts: Vec<f64> },
    Split {
        condition: Condition,
        then_branch: Box<TreeNode>,
        else_branch: Box<TreeNode>,
        then_weight: f64,
        else_weight: f64,
    },
}

impl TreeNode {
    fn leaf_for(&self, row: &[FeatureValue]) -> &[f64] {
        match self {
            TreeNode::Leaf { counts } => counts,
            TreeNode::Split {
                condition,
                then_branch,
                else_branch,
                then_weight,
                else_weight,
            } => {
                let take_then = condition
                    .test(row)
                    .unwrap_or(then_weight >= else_weight);
                if take_then {
                    then_branch.leaf_for(row)
                } else {
                    else_branch.leaf_for(row)
                }
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split {
                then_branch,
                else_branch,
                ..
            } => then_branch.leaf_count() + else_branch.leaf_count(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split {
                then_branch,
                else_branch,
                ..
            } => 1 + then_branch.depth().max(else_branch.depth()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTreeModel {
    table: FeatureTable,
    labels: Vec<String>,
    root: TreeNode,
    error: f64,
}

impl DecisionTreeModel {
    pub fn fit(table: FeatureTable, max_depth: usize, min_leaf: usize) -> Result<Self> {
        if table.is_empty() {
            return Err(FitError::EmptyTable);
        }
        let labels = table.class_levels();
        let classes: Vec<usize> = table
            .class_values()
            .map(|c| {
                let label = c.label();
                labels.iter().position(|l| *l == label).unwrap_or(0)
            })
            .collect();

        let grower = Grower {
            table: &table,
            classes: &classes,
            num_labels: labels.len(),
            max_depth: max_depth.max(1),
            min_leaf: min_leaf.max(1),
        };
        let rows: Vec<usize> = (0..table.len()).collect();
        let root = grower.grow(&rows, 1);

        let mut model = Self {
            table,
            labels,
            root,
            error: 0.0,
        };
        model.error = model.training_error();
        Ok(model)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn table(&self) -> &FeatureTable {
        &self.table
    }

    /// Majority label at the leaf reached by the row
    pub fn predict(&self, row: &[FeatureValue]) -> &str {
        let counts = self.root.leaf_for(row);
        majority_index(counts)
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Probability of a label at the leaf reached by the row
    pub fn probability(&self, row: &[FeatureValue], label: &str) -> f64 {
        let counts = self.root.leaf_for(row);
        let total: f64 = counts.iter().sum();
        match self.labels.iter().position(|l| l == label) {
            Some(i) if total > 0.0 => counts[i] / total,
            _ => 0.0,
        }
    }

    /// `sqrt(misclassified / n)` on the training table, rounded to three decimals
    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn to_expression(&self) -> String {
        stoex::tree_expression(&self.root, &self.labels)
    }

    pub fn probability_expression(&self, label: &str) -> String {
        stoex::tree_probability_expression(&self.root, &self.labels, label)
    }

    fn training_error(&self) -> f64 {
        let mut wrong = 0.0;
        let mut total = 0.0;
        for row in self.table.rows() {
            if self.predict(&row.values) != row.class.label() {
                wrong += row.weight;
            }
            total += row.weight;
        }
        if total > 0.0 {
            stoex::round3((wrong / total).sqrt())
        } else {
            0.0
        }
    }
}

struct Grower<'a> {
    table: &'a FeatureTable,
    classes: &'a [usize],
    num_labels: usize,
    max_depth: usize,
    min_leaf: usize,
}

struct Candidate {
    condition: Condition,
    gain_ratio: f64,
}

impl Grower<'_> {
    fn weight(&self, row: usize) -> f64 {
        self.table.rows()[row].weight
    }

    fn counts(&self, rows: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.num_labels];
        for &r in rows {
            counts[self.classes[r]] += self.weight(r);
        }
        counts
    }

    fn grow(&self, rows: &[usize], depth: usize) -> TreeNode {
        let counts = self.counts(rows);
        let pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;
        if pure || depth >= self.max_depth || rows.len() < 2 * self.min_leaf {
            return TreeNode::Leaf { counts };
        }

        let Some(best) = self.best_split(rows) else {
            return TreeNode::Leaf { counts };
        };

        let mut then_rows = Vec::new();
        let mut else_rows = Vec::new();
        let mut missing = Vec::new();
        for &r in rows {
            match best.condition.test(&self.table.rows()[r].values) {
                Some(true) => then_rows.push(r),
                Some(false) => else_rows.push(r),
                None => missing.push(r),
            }
        }
        let then_weight: f64 = then_rows.iter().map(|&r| self.weight(r)).sum();
        let else_weight: f64 = else_rows.iter().map(|&r| self.weight(r)).sum();
        if then_weight >= else_weight {
            then_rows.extend(missing);
        } else {
            else_rows.extend(missing);
        }

        TreeNode::Split {
            condition: best.condition,
            then_branch: Box::new(self.grow(&then_rows, depth + 1)),
            else_branch: Box::new(self.grow(&else_rows, depth + 1)),
            then_weight,
            else_weight,
        }
    }

    fn best_split(&self, rows: &[usize]) -> Option<Candidate> {
        let total_weight: f64 = rows.iter().map(|&r| self.weight(r)).sum();
        let mut best: Option<Candidate> = None;

        for (index, attr) in self.table.attributes().iter().enumerate() {
            let candidates = match attr.kind {
                AttributeKind::Nominal => self.nominal_candidates(rows, index, total_weight),
                AttributeKind::Numeric | AttributeKind::IntegerOnly => {
                    self.numeric_candidates(rows, index, total_weight)
                }
            };
            for candidate in candidates {
                let better = match &best {
                    None => true,
                    Some(b) => candidate.gain_ratio > b.gain_ratio + 1e-12,
                };
                if better {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn numeric_candidates(&self, rows: &[usize], index: usize, total_weight: f64) -> Vec<Candidate> {
        let name = &self.table.attributes()[index].name;
        let mut known: Vec<(f64, usize)> = rows
            .iter()
            .filter_map(|&r| self.table.rows()[r].values[index].as_f64().map(|v| (v, r)))
            .collect();
        if known.len() < 2 * self.min_leaf {
            return Vec::new();
        }
        known.sort_by(|a, b| a.0.total_cmp(&b.0));

        let known_rows: Vec<usize> = known.iter().map(|&(_, r)| r).collect();
        let known_counts = self.counts(&known_rows);
        let mut left = vec![0.0; self.num_labels];

        let mut out = Vec::new();
        for split in 1..known.len() {
            let (prev_value, prev_row) = known[split - 1];
            left[self.classes[prev_row]] += self.weight(prev_row);
            let value = known[split].0;
            if value <= prev_value || split < self.min_leaf || known.len() - split < self.min_leaf
            {
                continue;
            }
            let right: Vec<f64> = known_counts.iter().zip(&left).map(|(k, l)| k - l).collect();
            let threshold = (prev_value + value) / 2.0;
            if let Some(gain_ratio) = gain_ratio(&known_counts, &left, &right, total_weight) {
                out.push(Candidate {
                    condition: Condition::LessOrEqual {
                        index,
                        attribute: name.clone(),
                        threshold,
                    },
                    gain_ratio,
                });
            }
        }
        out
    }

    fn nominal_candidates(&self, rows: &[usize], index: usize, total_weight: f64) -> Vec<Candidate> {
        let attr = &self.table.attributes()[index];
        let known_rows: Vec<usize> = rows
            .iter()
            .copied()
            .filter(|&r| self.table.rows()[r].values[index].as_label().is_some())
            .collect();
        if known_rows.len() < 2 * self.min_leaf {
            return Vec::new();
        }
        let known_counts = self.counts(&known_rows);

        let mut out = Vec::new();
        for level in &attr.levels {
            let (matching, other): (Vec<usize>, Vec<usize>) = known_rows
                .iter()
                .copied()
                .partition(|&r| {
                    self.table.rows()[r].values[index].as_label() == Some(level.as_str())
                });
            if matching.len() < self.min_leaf || other.len() < self.min_leaf {
                continue;
            }
            let left = self.counts(&matching);
            let right = self.counts(&other);
            if let Some(gain_ratio) = gain_ratio(&known_counts, &left, &right, total_weight) {
                out.push(Candidate {
                    condition: Condition::Equals {
                        index,
                        attribute: attr.name.clone(),
                        level: level.clone(),
                    },
                    gain_ratio,
                });
            }
        }
        out
    }
}

fn entropy(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0.0)
        .map(|&c| {
            let p = c / total;
            -p * p.log2()
        })
        .sum()
}

/// Gain ratio of a binary split; the gain is scaled by the known fraction
fn gain_ratio(known: &[f64], left: &[f64], right: &[f64], total_weight: f64) -> Option<f64> {
    let known_weight: f64 = known.iter().sum();
    let left_weight: f64 = left.iter().sum();
    let right_weight: f64 = right.iter().sum();
    if known_weight <= 0.0 || total_weight <= 0.0 {
        return None;
    }

    let children = (left_weight * entropy(left) + right_weight * entropy(right)) / known_weight;
    let gain = (known_weight / total_weight) * (entropy(known) - children);
    let split_info = entropy(&[left_weight, right_weight, total_weight - known_weight]);
    (gain > 1e-9 && split_info > 1e-12).then(|| gain / split_info)
}

/// Index of the largest count, first one on ties
pub(crate) fn majority_index(counts: &[f64]) -> Option<usize> {
    counts
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &c)| match best {
            Some((_, b)) if b >= c => best,
            _ => Some((i, c)),
        })
        .map(|(i, _)| i)
}
