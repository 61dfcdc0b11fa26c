use regex::{Captures, Regex};
use std::sync::OnceLock;

fn suffix_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"_(VALUE|BYTESIZE|NUMBER_OF_ELEMENTS)\b").ok())
        .as_ref()
}

// Strings and identifiers are matched too, so literals inside them are kept
fn token_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r#""(?:[^"\\]|\\.)*"|[A-Za-z_][A-Za-z0-9_.]*|(?P<num>\d+\.\d+)"#).ok()
        })
        .as_ref()
}

/// Rewrite flattened parameter suffixes into dot accessors
pub fn replace_underscores_with_dots(expression: &str) -> String {
    match suffix_pattern() {
        Some(pattern) => pattern.replace_all(expression, ".$1").into_owned(),
        None => expression.to_string(),
    }
}

/// Rewrite decimal literals for integer-valued consumers
///
/// Fractional literals become `IntPMF[(floor;1-f)(ceil;f)]` with two-decimal
/// probabilities; integral ones (`2.0`) drop the fraction. A leading minus
/// sign stays in front of the rewritten literal.
pub fn replace_fractions_with_pmf(expression: &str) -> String {
    let Some(pattern) = token_pattern() else {
        return expression.to_string();
    };
    pattern
        .replace_all(expression, |caps: &Captures| match caps.name("num") {
            Some(num) => literal_to_pmf(num.as_str()),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn literal_to_pmf(literal: &str) -> String {
    let (whole, fraction) = literal.split_once('.').unwrap_or((literal, ""));
    let Ok(lower) = whole.parse::<u64>() else {
        return literal.to_string();
    };
    if fraction.trim_end_matches('0').is_empty() {
        return lower.to_string();
    }
    let frac = format!("0.{}", fraction).parse::<f64>().unwrap_or(0.0);
    format!(
        "IntPMF[({};{:.2})({};{:.2})]",
        lower,
        1.0 - frac,
        lower + 1,
        frac
    )
}
