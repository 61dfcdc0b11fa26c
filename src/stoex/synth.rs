use super::{format_number, round3};
use crate::estimator::{majority_index, Condition, TreeNode};

const PLUS_PARENTHESIS: &str = " + (";
const MULTIPLICATION: &str = " * ";

/// Nested sum of `coefficient * term` with the intercept innermost
///
/// Coefficients are rounded to three decimals and zero ones are skipped:
/// `1.5 * a_VALUE + (2.0 * b_VALUE + (3.0))`.
pub fn regression_expression(terms: &[(f64, String)], intercept: f64) -> String {
    let mut out = String::new();
    let mut braces = 0;
    for (coefficient, term) in terms {
        let coefficient = round3(*coefficient);
        if coefficient == 0.0 {
            continue;
        }
        out.push_str(&format_number(coefficient));
        out.push_str(MULTIPLICATION);
        out.push_str(term);
        out.push_str(PLUS_PARENTHESIS);
        braces += 1;
    }
    out.push_str(&format_number(round3(intercept)));
    out.push_str(&")".repeat(braces));
    out
}

/// Ternary expression predicting the majority label at each leaf
pub fn tree_expression(root: &TreeNode, labels: &[String]) -> String {
    walk(root, &|counts: &[f64]| {
        majority_index(counts)
            .and_then(|i| labels.get(i).cloned())
            .unwrap_or_default()
    })
}

/// Ternary expression giving the probability of `label` at each leaf
pub fn tree_probability_expression(root: &TreeNode, labels: &[String], label: &str) -> String {
    let index = labels.iter().position(|l| l == label);
    walk(root, &|counts: &[f64]| {
        let p = index
            .and_then(|i| leaf_probabilities(counts).get(i).copied())
            .unwrap_or(0.0);
        format_number(p)
    })
}

/// Label probabilities at a leaf in thousandths, summing to exactly 1
///
/// Largest-remainder rounding: every label gets its floored share and the
/// leftover thousandths go to the largest remainders, earlier labels first.
fn leaf_probabilities(counts: &[f64]) -> Vec<f64> {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return vec![0.0; counts.len()];
    }
    let exact: Vec<f64> = counts.iter().map(|c| c / total * 1000.0).collect();
    let mut shares: Vec<u32> = exact.iter().map(|e| e.floor() as u32).collect();
    let leftover = 1000u32.saturating_sub(shares.iter().sum());

    let mut order: Vec<usize> = (0..exact.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &i in order.iter().take(leftover as usize) {
        shares[i] += 1;
    }
    shares.iter().map(|&s| round3(f64::from(s) / 1000.0)).collect()
}

fn walk(node: &TreeNode, leaf_text: &dyn Fn(&[f64]) -> String) -> String {
    match node {
        TreeNode::Leaf { counts } => leaf_text(counts),
        TreeNode::Split {
            condition,
            then_branch,
            else_branch,
            ..
        } => format!(
            "(({}) ? {} : {})",
            condition_text(condition),
            walk(then_branch, leaf_text),
            walk(else_branch, leaf_text)
        ),
    }
}

fn condition_text(condition: &Condition) -> String {
    match condition {
        Condition::LessOrEqual {
            attribute,
            threshold,
            ..
        } => format!("{} <= {}", attribute, format_number(*threshold)),
        Condition::Equals {
            attribute, level, ..
        } => format!("{} == \"{}\"", attribute, level),
    }
}
