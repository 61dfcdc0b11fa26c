// Feature datasets built from monitored parameters
//
// Every estimator works on a FeatureTable: one typed column per flattened
// parameter name plus a designated class column. Attribute kinds are resolved
// once, from the first observed value of each name, and never change for the
// lifetime of the table.

mod builder;
mod table;

pub use builder::{DatasetBuilder, LabeledParameters};
pub use table::{
    Attribute, AttributeKind, ClassValue, DatasetMode, FeatureRow, FeatureTable, FeatureValue,
    NumericSamples, CLASS_ATTRIBUTE,
};

use thiserror::Error;

/// Errors raised while assembling a feature table
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("No instances were added to the dataset")]
    Empty,

    #[error("Attribute '{name}' was first seen as {expected:?} but later holds a {found:?} value")]
    ConflictingAttributeType {
        name: String,
        expected: AttributeKind,
        found: AttributeKind,
    },

    #[error("Class value '{value}' does not fit a {mode:?} dataset")]
    ConflictingClassType { value: String, mode: DatasetMode },
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// Number of decimals kept for non-integral values in integer-only columns
pub const FIXED_DECIMALS: i32 = 3;

/// Truncate to the fixed-width representation used by integer-only columns
pub fn truncate_fixed(value: f64) -> f64 {
    let scale = 10f64.powi(FIXED_DECIMALS);
    (value * scale).trunc() / scale
}
