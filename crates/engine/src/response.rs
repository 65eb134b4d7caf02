//! Captured responses and JSONPath extraction

use moxter_core::error::{Error, Result};
use serde_json::Value;
use serde_json_path::JsonPath;

use crate::executor::RawResponse;

/// Immutable capture of one response
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    status: u16,
    headers: Vec<(String, String)>,
    json: Option<Value>,
    body: String,
}

impl From<RawResponse> for ResponseEnvelope {
    fn from(raw: RawResponse) -> Self {
        let json = if raw.body.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&raw.body).ok()
        };
        Self {
            status: raw.status,
            headers: raw.headers,
            json,
            body: raw.body,
        }
    }
}

impl ResponseEnvelope {
    pub fn status(&self) -> u16 {
        self.status
    }

    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a header, matched case-insensitively
    pub fn headers(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn header_pairs(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Parsed body, when the body is JSON
    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Leading part of the body for diagnostics
    pub fn body_excerpt(&self, max_chars: usize) -> String {
        let mut excerpt: String = self.body.chars().take(max_chars).collect();
        if self.body.chars().count() > max_chars {
            excerpt.push_str("...");
        }
        excerpt
    }

    /// Evaluates a JSONPath expression against the body.
    ///
    /// A single match yields that value and several matches yield an array.
    /// No match is an error. Paths without a leading `$` are taken relative
    /// to the root, so `id` reads `$.id`.
    pub fn read(&self, expression: &str) -> Result<Value> {
        let normalized = normalize_path(expression);
        let path = JsonPath::parse(&normalized)
            .map_err(|e| Error::extraction(expression, format!("invalid JSONPath: {e}")))?;
        let json = self
            .json
            .as_ref()
            .ok_or_else(|| Error::extraction(expression, "response body is not JSON"))?;

        let nodes = path.query(json).all();
        match nodes.as_slice() {
            [] => Err(Error::extraction(expression, "no match in response body")),
            [single] => Ok((*single).clone()),
            many => Ok(Value::Array(many.iter().map(|v| (*v).clone()).collect())),
        }
    }
}

fn normalize_path(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.starts_with('$') {
        trimmed.to_string()
    } else if trimmed.starts_with('[') {
        format!("${trimmed}")
    } else {
        format!("$.{trimmed}")
    }
}
