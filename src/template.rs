//! Path template interpolation
//!
//! Handles `{{ field }}` interpolation in templated stream paths, e.g.
//! `Accounts/{{ account_sid }}/Usage/Records.json`. Values come from the
//! current slice.

use crate::error::{Error, Result};
use crate::streams::Slice;
use regex::Regex;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ field }}
static TEMPLATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}").unwrap());

/// Render a template string with values from the given slice
pub fn render(template: &str, slice: &Slice) -> Result<String> {
    let mut result = template.to_string();
    let mut missing = Vec::new();

    for cap in TEMPLATE_REGEX.captures_iter(template) {
        let full_match = cap.get(0).unwrap().as_str();
        let field = cap.get(1).unwrap().as_str();

        match slice.get(field) {
            Some(value) => {
                result = result.replace(full_match, value);
            }
            None => {
                missing.push(field.to_string());
            }
        }
    }

    if missing.is_empty() {
        Ok(result)
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap.get(1).unwrap().as_str().to_string())
        .collect()
}
