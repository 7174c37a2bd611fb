//! Scalar field lookup inside a single object-literal block.

use regex::Regex;

fn field_regex(name: &str, value: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b{}\s*:\s*{value}", regex::escape(name))).ok()
}

/// First quoted value of `name: '...'` or `name: "..."` in `block`.
pub fn string_field<'a>(block: &'a str, name: &str) -> Option<&'a str> {
    let re = field_regex(name, r#"['"]([^'"]+)['"]"#)?;
    re.captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// First bare decimal value of `name: 1.25` in `block`.
pub fn number_field(block: &str, name: &str) -> Option<f64> {
    let re = field_regex(name, r"(\d+(?:\.\d*)?|\.\d+)")?;
    re.captures(block)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
