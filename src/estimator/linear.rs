use super::{FitError, Result};
use crate::dataset::{AttributeKind, FeatureTable, FeatureValue};
use crate::stoex;

/// Ridge term added to the normal equations of every non-intercept column
pub const RIDGE: f64 = 1e-8;

/// Pivots smaller than this make the system singular
const PIVOT_EPSILON: f64 = 1e-12;

/// One column of the design matrix
#[derive(Debug, Clone, PartialEq)]
pub enum RegressionTerm {
    /// Numeric attribute, missing cells imputed by the training mean
    Numeric {
        index: usize,
        name: String,
        mean: f64,
    },
    /// One-hot indicator of a nominal level
    Indicator {
        index: usize,
        name: String,
        level: String,
    },
}

impl RegressionTerm {
    pub fn value(&self, row: &[FeatureValue]) -> f64 {
        match self {
            RegressionTerm::Numeric { index, mean, .. } => row
                .get(*index)
                .and_then(FeatureValue::as_f64)
                .unwrap_or(*mean),
            RegressionTerm::Indicator { index, level, .. } => {
                match row.get(*index).and_then(FeatureValue::as_label) {
                    Some(label) if label == level => 1.0,
                    _ => 0.0,
                }
            }
        }
    }

    /// Expression text of the term
    pub fn text(&self) -> String {
        match self {
            RegressionTerm::Numeric { name, .. } => name.clone(),
            RegressionTerm::Indicator { name, level, .. } => {
                format!("({} == \"{}\" ? 1 : 0)", name, level)
            }
        }
    }
}

/// Weighted least-squares linear model
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionModel {
    table: FeatureTable,
    terms: Vec<RegressionTerm>,
    coefficients: Vec<f64>,
    intercept: f64,
    error: f64,
}

impl RegressionModel {
    pub fn fit(table: FeatureTable) -> Result<Self> {
        if table.is_empty() {
            return Err(FitError::EmptyTable);
        }
        if !table.has_numeric_class() {
            return Err(FitError::NonNumericClass);
        }

        let terms = design_terms(&table);
        let width = terms.len() + 1;

        let mut normal = vec![vec![0.0; width]; width];
        let mut rhs = vec![0.0; width];
        let mut x = vec![0.0; width];
        for row in table.rows() {
            let y = row.class.as_f64().unwrap_or(0.0);
            x[0] = 1.0;
            for (j, term) in terms.iter().enumerate() {
                x[j + 1] = term.value(&row.values);
            }
            for i in 0..width {
                rhs[i] += row.weight * x[i] * y;
                for j in 0..width {
                    normal[i][j] += row.weight * x[i] * x[j];
                }
            }
        }
        for (i, row) in normal.iter_mut().enumerate().skip(1) {
            row[i] += RIDGE;
        }

        let beta = solve_linear_system(normal, rhs).ok_or(FitError::Singular)?;

        let mut model = Self {
            table,
            terms,
            intercept: beta[0],
            coefficients: beta[1..].to_vec(),
            error: 0.0,
        };
        model.error = model.training_rmse();
        Ok(model)
    }

    pub fn predict(&self, row: &[FeatureValue]) -> f64 {
        self.terms
            .iter()
            .zip(&self.coefficients)
            .map(|(term, c)| c * term.value(row))
            .sum::<f64>()
            + self.intercept
    }

    /// Training RMSE rounded to three decimals
    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn table(&self) -> &FeatureTable {
        &self.table
    }

    pub fn terms(&self) -> &[RegressionTerm] {
        &self.terms
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn to_expression(&self) -> String {
        let terms: Vec<(f64, String)> = self
            .coefficients
            .iter()
            .zip(&self.terms)
            .map(|(c, t)| (*c, t.text()))
            .collect();
        stoex::regression_expression(&terms, self.intercept)
    }

    fn training_rmse(&self) -> f64 {
        let mut sum = 0.0;
        let mut weight = 0.0;
        for row in self.table.rows() {
            let y = row.class.as_f64().unwrap_or(0.0);
            let residual = y - self.predict(&row.values);
            sum += row.weight * residual * residual;
            weight += row.weight;
        }
        if weight > 0.0 {
            stoex::round3((sum / weight).sqrt())
        } else {
            0.0
        }
    }
}

/// Design columns of a table; attributes constant over the table are dropped
fn design_terms(table: &FeatureTable) -> Vec<RegressionTerm> {
    let mut terms = Vec::new();
    for (index, attr) in table.attributes().iter().enumerate() {
        match attr.kind {
            AttributeKind::Numeric | AttributeKind::IntegerOnly => {
                let Some(mean) = table.column_mean(index) else {
                    continue;
                };
                let varies = table.rows().iter().any(|row| {
                    let v = row.values[index].as_f64().unwrap_or(mean);
                    (v - mean).abs() > 1e-12
                });
                if varies {
                    terms.push(RegressionTerm::Numeric {
                        index,
                        name: attr.name.clone(),
                        mean,
                    });
                }
            }
            AttributeKind::Nominal => {
                let observed: Vec<&str> = attr
                    .levels
                    .iter()
                    .map(String::as_str)
                    .filter(|level| {
                        table
                            .rows()
                            .iter()
                            .any(|row| row.values[index].as_label() == Some(*level))
                    })
                    .collect();
                // first level is the baseline absorbed by the intercept
                for level in observed.iter().skip(1) {
                    terms.push(RegressionTerm::Indicator {
                        index,
                        name: attr.name.clone(),
                        level: level.to_string(),
                    });
                }
            }
        }
    }
    terms
}

/// Gaussian elimination with partial pivoting
pub(crate) fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if !a[pivot][col].is_finite() || a[pivot][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let pivot_row = a[col].clone();
        let pivot_rhs = b[col];
        for row in col + 1..n {
            let factor = a[row][col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for (cell, p) in a[row].iter_mut().zip(&pivot_row).skip(col) {
                *cell -= factor * p;
            }
            b[row] -= factor * pivot_rhs;
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
