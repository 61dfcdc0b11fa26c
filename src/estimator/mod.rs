//! Model estimation over feature tables
//!
//! A table with a single distinct class value collapses to a constant model.
//! Otherwise a numeric class fits a weighted linear regression and a nominal
//! class fits a binary decision tree. Every fitted model exposes prediction,
//! its training error and its stochastic expression.

mod linear;
mod selection;
mod tree;

pub use linear::{RegressionModel, RegressionTerm, RIDGE};
pub use selection::{select_attributes, HOLDOUT_MIN_ROWS, STALE_LIMIT};
pub(crate) use tree::majority_index;
pub use tree::{Condition, DecisionTreeModel, TreeNode};

use crate::dataset::{ClassValue, FeatureTable, FeatureValue};
use crate::parameters::ServiceParameters;
use crate::stoex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("Cannot fit a model on an empty table")]
    EmptyTable,

    #[error("Regression system is singular")]
    Singular,

    #[error("Regression requires a numeric class attribute")]
    NonNumericClass,
}

pub type Result<T> = std::result::Result<T, FitError>;

/// Knobs shared by all model families
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Narrow the table by best-first attribute selection before fitting
    pub feature_selection: bool,
    pub max_tree_depth: usize,
    pub min_leaf_size: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            feature_selection: false,
            max_tree_depth: 10,
            min_leaf_size: 2,
        }
    }
}

impl FitOptions {
    pub fn with_feature_selection(mut self, enabled: bool) -> Self {
        self.feature_selection = enabled;
        self
    }
}

/// Degenerate model for a table whose class never varies
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantModel {
    value: ClassValue,
    table: FeatureTable,
}

impl ConstantModel {
    pub fn new(value: ClassValue, table: FeatureTable) -> Self {
        Self { value, table }
    }

    pub fn value(&self) -> &ClassValue {
        &self.value
    }
}

/// A trained model together with the table it was trained on
#[derive(Debug, Clone, PartialEq)]
pub enum FittedModel {
    Constant(ConstantModel),
    Regression(RegressionModel),
    DecisionTree(DecisionTreeModel),
}

impl FittedModel {
    /// Fit the model family implied by the table's class
    pub fn fit(table: FeatureTable, options: &FitOptions) -> Result<Self> {
        if table.is_empty() {
            return Err(FitError::EmptyTable);
        }
        let table = if options.feature_selection && table.num_attributes() > 0 {
            let selected = select_attributes(&table, options);
            table.project(&selected)
        } else {
            table
        };
        Self::fit_unselected(table, options)
    }

    pub(crate) fn fit_unselected(table: FeatureTable, options: &FitOptions) -> Result<Self> {
        if table.is_empty() {
            return Err(FitError::EmptyTable);
        }
        if let Some(value) = table.constant_class().cloned() {
            return Ok(FittedModel::Constant(ConstantModel::new(value, table)));
        }
        if table.has_numeric_class() {
            RegressionModel::fit(table).map(FittedModel::Regression)
        } else {
            DecisionTreeModel::fit(table, options.max_tree_depth, options.min_leaf_size)
                .map(FittedModel::DecisionTree)
        }
    }

    pub fn table(&self) -> &FeatureTable {
        match self {
            FittedModel::Constant(m) => &m.table,
            FittedModel::Regression(m) => m.table(),
            FittedModel::DecisionTree(m) => m.table(),
        }
    }

    /// Whether predictions are numbers (constant models follow their value)
    pub fn is_numeric(&self) -> bool {
        match self {
            FittedModel::Constant(m) => matches!(m.value, ClassValue::Numeric(_)),
            FittedModel::Regression(_) => true,
            FittedModel::DecisionTree(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FittedModel::Constant(_) => "constant",
            FittedModel::Regression(_) => "regression",
            FittedModel::DecisionTree(_) => "decision-tree",
        }
    }

    pub fn predict(&self, row: &[FeatureValue]) -> ClassValue {
        match self {
            FittedModel::Constant(m) => m.value.clone(),
            FittedModel::Regression(m) => ClassValue::Numeric(m.predict(row)),
            FittedModel::DecisionTree(m) => ClassValue::Nominal(m.predict(row).to_string()),
        }
    }

    /// Predict for the parameters of an unseen call
    pub fn predict_parameters(&self, parameters: &ServiceParameters) -> ClassValue {
        self.predict(&self.table().test_row(parameters))
    }

    /// Probability that the prediction for `parameters` is `label`
    ///
    /// Regression and constant models are deterministic: 1 when the
    /// predicted label matches, else 0.
    pub fn probability_of(&self, parameters: &ServiceParameters, label: &str) -> f64 {
        match self {
            FittedModel::DecisionTree(m) => {
                m.probability(&self.table().test_row(parameters), label)
            }
            _ => {
                if self.predict_parameters(parameters).label() == label {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Training error; exactly 0 for constant models
    pub fn error(&self) -> f64 {
        match self {
            FittedModel::Constant(_) => 0.0,
            FittedModel::Regression(m) => m.error(),
            FittedModel::DecisionTree(m) => m.error(),
        }
    }

    pub fn to_expression(&self) -> String {
        match self {
            FittedModel::Constant(m) => m.value.label(),
            FittedModel::Regression(m) => m.to_expression(),
            FittedModel::DecisionTree(m) => m.to_expression(),
        }
    }

    /// Expression for the probability of one label, `None` for regressions
    pub fn probability_expression(&self, label: &str) -> Option<String> {
        match self {
            FittedModel::Constant(m) => {
                let p = if m.value.label() == label { 1.0 } else { 0.0 };
                Some(stoex::format_number(p))
            }
            FittedModel::Regression(_) => None,
            FittedModel::DecisionTree(m) => Some(m.probability_expression(label)),
        }
    }
}
