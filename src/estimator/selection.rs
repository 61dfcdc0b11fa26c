// Best-first forward attribute subset search
//
// Subsets are scored by fitting on a training split and measuring on a
// held-out split (every third row once the table has at least
// HOLDOUT_MIN_ROWS rows, otherwise the training rows themselves).

use super::{FitOptions, FittedModel};
use crate::dataset::FeatureTable;
use std::collections::HashSet;

/// Expansions without improvement before the search stops
pub const STALE_LIMIT: usize = 5;

/// Smallest table for which rows are held out
pub const HOLDOUT_MIN_ROWS: usize = 6;

/// Indices of the attributes worth keeping, in ascending order
pub fn select_attributes(table: &FeatureTable, options: &FitOptions) -> Vec<usize> {
    let (train, test) = holdout_split(table);

    let evaluate = |subset: &[usize]| merit(&train.project(subset), &test.project(subset), options);

    let empty: Vec<usize> = Vec::new();
    let Some(empty_merit) = evaluate(&empty) else {
        return (0..table.num_attributes()).collect();
    };

    let mut best = (empty_merit, empty.clone());
    let mut open = vec![(empty_merit, empty.clone())];
    let mut visited: HashSet<Vec<usize>> = HashSet::from([empty]);
    let mut stale = 0;

    while let Some(position) = open
        .iter()
        .enumerate()
        .max_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
        .map(|(i, _)| i)
    {
        let (_, subset) = open.swap_remove(position);
        let mut improved = false;

        for attribute in 0..table.num_attributes() {
            if subset.contains(&attribute) {
                continue;
            }
            let mut child = subset.clone();
            child.push(attribute);
            child.sort_unstable();
            if !visited.insert(child.clone()) {
                continue;
            }
            if let Some(score) = evaluate(&child) {
                if score > best.0 + 1e-12 {
                    best = (score, child.clone());
                    improved = true;
                }
                open.push((score, child));
            }
        }

        if improved {
            stale = 0;
        } else {
            stale += 1;
            if stale >= STALE_LIMIT {
                break;
            }
        }
    }

    tracing::debug!(selected = ?best.1, merit = best.0, "Attribute subset selected");
    best.1
}

fn holdout_split(table: &FeatureTable) -> (FeatureTable, FeatureTable) {
    if table.len() < HOLDOUT_MIN_ROWS {
        return (table.clone(), table.clone());
    }
    let (test, train): (Vec<usize>, Vec<usize>) = (0..table.len()).partition(|i| i % 3 == 2);
    (table.select_rows(&train), table.select_rows(&test))
}

/// Negated RMSE for numeric classes, accuracy for nominal ones
fn merit(train: &FeatureTable, test: &FeatureTable, options: &FitOptions) -> Option<f64> {
    let model = FittedModel::fit_unselected(train.clone(), options).ok()?;
    if test.is_empty() {
        return None;
    }

    if test.has_numeric_class() {
        let sum: f64 = test
            .rows()
            .iter()
            .map(|row| {
                let predicted = model.predict(&row.values).as_f64().unwrap_or(0.0);
                let actual = row.class.as_f64().unwrap_or(0.0);
                (predicted - actual).powi(2)
            })
            .sum();
        Some(-(sum / test.len() as f64).sqrt())
    } else {
        let hits = test
            .rows()
            .iter()
            .filter(|row| model.predict(&row.values).label() == row.class.label())
            .count();
        Some(hits as f64 / test.len() as f64)
    }
}
