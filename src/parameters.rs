//! Service call parameters
//!
//! A monitored call's arguments are flattened into named, typed values:
//!
//! - primitives contribute `<name>_VALUE`
//! - strings contribute `<name>_VALUE` and `<name>_BYTESIZE`
//! - collections contribute `<name>_NUMBER_OF_ELEMENTS`
//!
//! The flattened form is what every feature table is built from, and the
//! suffixes are rewritten into dot accessors (`size.VALUE`) when an
//! expression is handed to the architecture model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Suffix for the plain value of a parameter
pub const VALUE_SUFFIX: &str = "_VALUE";

/// Suffix for the byte length of a string parameter
pub const BYTESIZE_SUFFIX: &str = "_BYTESIZE";

/// Suffix for the element count of a collection parameter
pub const NUMBER_OF_ELEMENTS_SUFFIX: &str = "_NUMBER_OF_ELEMENTS";

/// A single typed parameter value
#[derive(Debug, Clone)]
pub enum ParameterValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    String(String),
    /// Number of elements of a collection argument
    CollectionSize(usize),
}

impl ParameterValue {
    /// Numeric view of the value, `None` for strings and booleans
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Integer(v) => Some(*v as f64),
            ParameterValue::CollectionSize(v) => Some(*v as f64),
            ParameterValue::Boolean(_) | ParameterValue::String(_) => None,
        }
    }

    /// Whether the value is numeric (float, integer, or collection size)
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Whether the value is integral by type (integer or collection size)
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            ParameterValue::Integer(_) | ParameterValue::CollectionSize(_)
        )
    }

    /// Label used when the value takes part in a nominal attribute
    pub fn as_label(&self) -> String {
        match self {
            ParameterValue::String(s) => s.clone(),
            ParameterValue::Boolean(b) => b.to_string(),
            ParameterValue::Float(v) => v.to_string(),
            ParameterValue::Integer(v) => v.to_string(),
            ParameterValue::CollectionSize(v) => v.to_string(),
        }
    }

    fn from_json(name: &str, value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(ParameterValue::Boolean(*b)),
            Value::String(s) => Some(ParameterValue::String(s.clone())),
            Value::Number(n) => {
                if name.ends_with(NUMBER_OF_ELEMENTS_SUFFIX) {
                    if let Some(size) = n.as_u64() {
                        return Some(ParameterValue::CollectionSize(size as usize));
                    }
                }
                if let Some(i) = n.as_i64() {
                    Some(ParameterValue::Integer(i))
                } else {
                    n.as_f64().map(ParameterValue::Float)
                }
            }
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            ParameterValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ParameterValue::Integer(v) => Value::from(*v),
            ParameterValue::Boolean(b) => Value::Bool(*b),
            ParameterValue::String(s) => Value::String(s.clone()),
            ParameterValue::CollectionSize(v) => Value::from(*v as u64),
        }
    }
}

impl PartialEq for ParameterValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ParameterValue::Float(a), ParameterValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ParameterValue::Integer(a), ParameterValue::Integer(b)) => a == b,
            (ParameterValue::Boolean(a), ParameterValue::Boolean(b)) => a == b,
            (ParameterValue::String(a), ParameterValue::String(b)) => a == b,
            (ParameterValue::CollectionSize(a), ParameterValue::CollectionSize(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ParameterValue {}

impl Hash for ParameterValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ParameterValue::Float(v) => v.to_bits().hash(state),
            ParameterValue::Integer(v) => v.hash(state),
            ParameterValue::Boolean(v) => v.hash(state),
            ParameterValue::String(v) => v.hash(state),
            ParameterValue::CollectionSize(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::String(s) => write!(f, "\"{}\"", s),
            other => write!(f, "{}", other.as_label()),
        }
    }
}

/// Flattened parameters of one service call, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct ServiceParameters {
    values: BTreeMap<String, ParameterValue>,
}

impl ServiceParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an already flattened map
    pub fn from_map(values: BTreeMap<String, ParameterValue>) -> Self {
        Self { values }
    }

    /// Parse the serialized JSON object form
    ///
    /// Trailing commas (as emitted by the monitoring probes) are tolerated.
    /// Anything unparsable degrades to empty parameters with a warning.
    pub fn from_json(serialized: &str) -> Self {
        let trimmed = serialized.trim();
        if trimmed.is_empty() {
            return Self::new();
        }
        let cleaned = strip_trailing_commas(trimmed);
        match serde_json::from_str::<BTreeMap<String, Value>>(&cleaned) {
            Ok(map) => Self::from(map),
            Err(e) => {
                tracing::warn!(parameters = %serialized, error = %e, "Could not parse parameters");
                Self::new()
            }
        }
    }

    pub fn add_float(&mut self, name: &str, value: f64) {
        self.insert(format!("{name}{VALUE_SUFFIX}"), ParameterValue::Float(value));
    }

    pub fn add_int(&mut self, name: &str, value: i64) {
        self.insert(format!("{name}{VALUE_SUFFIX}"), ParameterValue::Integer(value));
    }

    pub fn add_bool(&mut self, name: &str, value: bool) {
        self.insert(format!("{name}{VALUE_SUFFIX}"), ParameterValue::Boolean(value));
    }

    /// Add a string argument; a `None` string only records a zero byte size
    pub fn add_string(&mut self, name: &str, value: Option<&str>) {
        match value {
            Some(s) => {
                self.insert(
                    format!("{name}{VALUE_SUFFIX}"),
                    ParameterValue::String(s.to_string()),
                );
                self.insert(
                    format!("{name}{BYTESIZE_SUFFIX}"),
                    ParameterValue::Integer(s.len() as i64),
                );
            }
            None => {
                self.insert(format!("{name}{BYTESIZE_SUFFIX}"), ParameterValue::Integer(0));
            }
        }
    }

    pub fn add_collection(&mut self, name: &str, size: usize) {
        self.insert(
            format!("{name}{NUMBER_OF_ELEMENTS_SUFFIX}"),
            ParameterValue::CollectionSize(size),
        );
    }

    /// Insert an already flattened entry
    pub fn insert(&mut self, key: impl Into<String>, value: ParameterValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Left-biased union: on key collision `self` wins
    pub fn merge(&self, other: &ServiceParameters) -> ServiceParameters {
        let mut values = self.values.clone();
        for (key, value) in &other.values {
            values.entry(key.clone()).or_insert_with(|| value.clone());
        }
        ServiceParameters { values }
    }

    /// Serialized JSON object form
    pub fn to_json(&self) -> String {
        let map: BTreeMap<String, Value> = self.clone().into();
        serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_string())
    }
}

impl From<BTreeMap<String, Value>> for ServiceParameters {
    fn from(map: BTreeMap<String, Value>) -> Self {
        let values = map
            .iter()
            .filter_map(|(k, v)| ParameterValue::from_json(k, v).map(|pv| (k.clone(), pv)))
            .collect();
        Self { values }
    }
}

impl From<ServiceParameters> for BTreeMap<String, Value> {
    fn from(params: ServiceParameters) -> Self {
        params
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}

impl fmt::Display for ServiceParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn strip_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = input.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
            out.push(c);
            continue;
        }
        if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}
