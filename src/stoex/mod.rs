//! Stochastic expression text
//!
//! Turns fitted models into the textual expression grammar understood by the
//! architecture model, and applies the post-processing rewrites:
//!
//! - `size_VALUE` becomes `size.VALUE` (same for `_BYTESIZE` and
//!   `_NUMBER_OF_ELEMENTS`)
//! - for integer-valued consumers, fractional literals become two-point
//!   integer distributions: `2.3` becomes `IntPMF[(2;0.70)(3;0.30)]`

mod rewrite;
mod synth;

pub use rewrite::{replace_fractions_with_pmf, replace_underscores_with_dots};
pub use synth::{regression_expression, tree_expression, tree_probability_expression};

/// Round to three decimals, normalizing negative zero
pub fn round3(value: f64) -> f64 {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Canonical number text: integral values as `N.0`, otherwise the shortest
/// decimal representation
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0.0".to_string();
    }
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests;
