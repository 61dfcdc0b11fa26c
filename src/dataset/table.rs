use crate::parameters::{ParameterValue, ServiceParameters};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Name of the class column
pub const CLASS_ATTRIBUTE: &str = "class";

/// Closed set of column kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Floating point values
    Numeric,
    /// Strings and booleans, compared by label
    Nominal,
    /// Integers and collection sizes
    IntegerOnly,
}

impl AttributeKind {
    /// Kind implied by a single observed value
    pub fn of(value: &ParameterValue) -> Self {
        match value {
            ParameterValue::Float(_) => AttributeKind::Numeric,
            ParameterValue::Integer(_) | ParameterValue::CollectionSize(_) => {
                AttributeKind::IntegerOnly
            }
            ParameterValue::Boolean(_) | ParameterValue::String(_) => AttributeKind::Nominal,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, AttributeKind::Numeric | AttributeKind::IntegerOnly)
    }

    /// Numeric and integer-only values mix; nominal mixes with nothing else
    pub fn accepts(self, other: AttributeKind) -> bool {
        self.is_numeric() == other.is_numeric()
    }
}

/// How the class column of a dataset is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetMode {
    /// Real-valued class
    NumericOnly,
    /// Integer-valued class; fractions are kept at fixed width
    IntegerOnly,
    /// Nominal class, labels kept as observed
    NoTransformations,
}

impl DatasetMode {
    /// Mode implied by the first observed class value
    pub fn for_value(value: &ParameterValue) -> Self {
        match AttributeKind::of(value) {
            AttributeKind::Numeric => DatasetMode::NumericOnly,
            AttributeKind::IntegerOnly => DatasetMode::IntegerOnly,
            AttributeKind::Nominal => DatasetMode::NoTransformations,
        }
    }

    pub fn class_kind(self) -> AttributeKind {
        match self {
            DatasetMode::NumericOnly => AttributeKind::Numeric,
            DatasetMode::IntegerOnly => AttributeKind::IntegerOnly,
            DatasetMode::NoTransformations => AttributeKind::Nominal,
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
    /// Observed labels of a nominal column, in first-seen order
    pub levels: Vec<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            levels: Vec::new(),
        }
    }
}

/// One cell of a feature row
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Nominal(String),
    /// The parameter was absent from the call
    Missing,
}

impl FeatureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            FeatureValue::Nominal(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FeatureValue::Missing)
    }
}

/// Target value of a row
#[derive(Debug, Clone, PartialEq)]
pub enum ClassValue {
    Numeric(f64),
    Nominal(String),
}

impl ClassValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ClassValue::Numeric(v) => Some(*v),
            ClassValue::Nominal(_) => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ClassValue::Numeric(v) => crate::stoex::format_number(*v),
            ClassValue::Nominal(s) => s.clone(),
        }
    }
}

impl fmt::Display for ClassValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<f64> for ClassValue {
    fn from(v: f64) -> Self {
        ClassValue::Numeric(v)
    }
}

impl From<i64> for ClassValue {
    fn from(v: i64) -> Self {
        ClassValue::Numeric(v as f64)
    }
}

impl From<&str> for ClassValue {
    fn from(v: &str) -> Self {
        ClassValue::Nominal(v.to_string())
    }
}

impl From<String> for ClassValue {
    fn from(v: String) -> Self {
        ClassValue::Nominal(v)
    }
}

impl From<&ParameterValue> for ClassValue {
    fn from(v: &ParameterValue) -> Self {
        match v.as_f64() {
            Some(x) => ClassValue::Numeric(x),
            None => ClassValue::Nominal(v.as_label()),
        }
    }
}

/// One instance: feature cells aligned with the table's attributes
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub values: Vec<FeatureValue>,
    pub class: ClassValue,
    pub weight: f64,
}

/// Numeric view of a table used by the symbolic regression search
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSamples {
    pub variables: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

/// Immutable typed table of feature rows
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    attributes: Vec<Attribute>,
    rows: Vec<FeatureRow>,
    mode: DatasetMode,
}

impl FeatureTable {
    pub(crate) fn from_parts(
        attributes: Vec<Attribute>,
        rows: Vec<FeatureRow>,
        mode: DatasetMode,
    ) -> Self {
        Self {
            attributes,
            rows,
            mode,
        }
    }

    /// Predictive attributes, class excluded
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    /// Attribute names followed by the class attribute
    pub fn column_names(&self) -> Vec<&str> {
        let mut names = self.attribute_names();
        names.push(CLASS_ATTRIBUTE);
        names
    }

    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn mode(&self) -> DatasetMode {
        self.mode
    }

    pub fn class_kind(&self) -> AttributeKind {
        self.mode.class_kind()
    }

    pub fn has_numeric_class(&self) -> bool {
        self.class_kind().is_numeric()
    }

    pub fn class_values(&self) -> impl Iterator<Item = &ClassValue> {
        self.rows.iter().map(|r| &r.class)
    }

    /// Distinct class labels in first-seen order
    pub fn class_levels(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut levels = Vec::new();
        for class in self.class_values() {
            let label = class.label();
            if seen.insert(label.clone()) {
                levels.push(label);
            }
        }
        levels
    }

    /// The class value if every row shares it
    pub fn constant_class(&self) -> Option<&ClassValue> {
        let first = &self.rows.first()?.class;
        self.class_values()
            .all(|c| c == first)
            .then_some(first)
    }

    /// Weighted mean of the present values of a numeric column
    pub fn column_mean(&self, index: usize) -> Option<f64> {
        let mut sum = 0.0;
        let mut weight = 0.0;
        for row in &self.rows {
            if let Some(v) = row.values.get(index).and_then(FeatureValue::as_f64) {
                sum += v * row.weight;
                weight += row.weight;
            }
        }
        (weight > 0.0).then(|| sum / weight)
    }

    /// Table restricted to the given attribute indices (class kept)
    pub fn project(&self, indices: &[usize]) -> FeatureTable {
        let attributes = indices
            .iter()
            .filter_map(|&i| self.attributes.get(i).cloned())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| FeatureRow {
                values: indices
                    .iter()
                    .map(|&i| row.values.get(i).cloned().unwrap_or(FeatureValue::Missing))
                    .collect(),
                class: row.class.clone(),
                weight: row.weight,
            })
            .collect();
        FeatureTable {
            attributes,
            rows,
            mode: self.mode,
        }
    }

    /// Table keeping only the given rows
    pub fn select_rows(&self, indices: &[usize]) -> FeatureTable {
        FeatureTable {
            attributes: self.attributes.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
            mode: self.mode,
        }
    }

    /// Feature cells for an unseen call; unknown names are ignored
    pub fn test_row(&self, parameters: &ServiceParameters) -> Vec<FeatureValue> {
        self.attributes
            .iter()
            .map(|attr| match parameters.get(&attr.name) {
                None => FeatureValue::Missing,
                Some(value) => cell_for(attr, value).unwrap_or(FeatureValue::Missing),
            })
            .collect()
    }

    /// Numeric columns and targets, missing cells imputed by the column mean
    ///
    /// Returns `None` for nominal-class tables.
    pub fn numeric_samples(&self) -> Option<NumericSamples> {
        if !self.has_numeric_class() {
            return None;
        }
        let numeric: Vec<usize> = self
            .attributes
            .iter()
            .enumerate()
            .filter(|(_, a)| a.kind.is_numeric())
            .map(|(i, _)| i)
            .collect();
        let means: Vec<f64> = numeric
            .iter()
            .map(|&i| self.column_mean(i).unwrap_or(0.0))
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                numeric
                    .iter()
                    .zip(&means)
                    .map(|(&i, &mean)| row.values[i].as_f64().unwrap_or(mean))
                    .collect()
            })
            .collect();
        let targets = self
            .rows
            .iter()
            .map(|r| r.class.as_f64().unwrap_or(0.0))
            .collect();

        Some(NumericSamples {
            variables: numeric
                .iter()
                .map(|&i| self.attributes[i].name.clone())
                .collect(),
            rows,
            targets,
        })
    }
}

/// Cell for a value under an attribute's fixed kind, `None` on a kind clash
pub(crate) fn cell_for(attribute: &Attribute, value: &ParameterValue) -> Option<FeatureValue> {
    match attribute.kind {
        AttributeKind::Nominal => {
            (!value.is_numeric()).then(|| FeatureValue::Nominal(value.as_label()))
        }
        AttributeKind::Numeric => value.as_f64().map(FeatureValue::Numeric),
        AttributeKind::IntegerOnly => value.as_f64().map(|v| {
            if v.fract() == 0.0 {
                FeatureValue::Numeric(v)
            } else {
                FeatureValue::Numeric(super::truncate_fixed(v))
            }
        }),
    }
}
