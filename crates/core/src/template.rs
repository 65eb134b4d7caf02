//! `{{var}}` placeholder substitution

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::warn;

use crate::variables::VariableSource;

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").ok());

/// Text form of a variable: strings bare, everything else as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Names of the placeholders referenced by `text`, in order of appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let Some(re) = PLACEHOLDER.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Replaces every known placeholder in `text`.
///
/// Unknown placeholders stay verbatim.
pub fn render(text: &str, vars: &dyn VariableSource) -> String {
    let Some(re) = PLACEHOLDER.as_ref() else {
        return text.to_string();
    };
    if !text.contains("{{") {
        return text.to_string();
    }
    re.replace_all(text, |caps: &Captures| match vars.resolve(&caps[1]) {
        Some(value) => value_to_text(value),
        None => {
            warn!(placeholder = &caps[1], "No variable for placeholder; leaving it as-is");
            caps[0].to_string()
        }
    })
    .into_owned()
}

/// If `text` is exactly one placeholder, returns its variable name.
fn sole_placeholder(text: &str) -> Option<&str> {
    let re = PLACEHOLDER.as_ref()?;
    let caps = re.captures(text)?;
    let whole = caps.get(0)?;
    if whole.start() == 0 && whole.end() == text.len() {
        caps.get(1).map(|m| m.as_str())
    } else {
        None
    }
}

/// Applies templating to every string inside a JSON tree.
///
/// A string consisting of a single placeholder takes the variable's JSON
/// value, so `"{{petId}}"` becomes the number `42` rather than `"42"`.
/// Object keys are not templated.
pub fn render_json(value: &Value, vars: &dyn VariableSource) -> Value {
    match value {
        Value::String(s) => {
            if let Some(typed) = sole_placeholder(s).and_then(|name| vars.resolve(name)) {
                return typed.clone();
            }
            Value::String(render(s, vars))
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| render_json(v, vars)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_json(v, vars)))
                .collect(),
        ),
        other => other.clone(),
    }
}
