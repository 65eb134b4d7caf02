//! Request payload resolution
//!
//! A fixture payload is either a YAML/JSON tree, a raw JSON string, plain
//! text, or a `classpath:` reference to a file under the fixtures root.

use moxter_core::error::{Error, Result};
use moxter_core::template::{render, render_json};
use moxter_core::variables::VariableSource;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::executor::RequestBody;

/// Prefix marking a payload stored in a file under the fixtures root
pub const CLASSPATH_PREFIX: &str = "classpath:";

/// Turns payload nodes into concrete request bodies
#[derive(Debug, Clone)]
pub struct PayloadResolver {
    root: PathBuf,
}

impl PayloadResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a `classpath:` reference onto a file below the root.
    pub fn classpath_file(&self, reference: &str) -> Result<PathBuf> {
        let relative = reference
            .strip_prefix(CLASSPATH_PREFIX)
            .unwrap_or(reference)
            .trim()
            .trim_start_matches('/');
        if relative.is_empty() {
            return Err(Error::invalid_input(format!(
                "empty classpath reference '{reference}'"
            )));
        }
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(Error::invalid_input(format!(
                "classpath reference must stay under the fixtures root: '{reference}'"
            )));
        }
        Ok(self.root.join(relative))
    }

    fn read_classpath(&self, reference: &str) -> Result<String> {
        let path = self.classpath_file(reference)?;
        debug!(path = %path.display(), "Reading classpath payload");
        std::fs::read_to_string(&path).map_err(|e| {
            Error::parse(
                path.display().to_string(),
                format!("Failed to read payload file: {e}"),
            )
        })
    }

    /// Parses a textual payload into a JSON tree, if it is JSON.
    ///
    /// `classpath:` references are read first. Text that does not parse as a
    /// JSON object or array yields `None`.
    pub fn load_textual(&self, text: &str) -> Result<Option<Value>> {
        let content = if text.trim_start().starts_with(CLASSPATH_PREFIX) {
            self.read_classpath(text.trim())?
        } else {
            text.to_string()
        };
        Ok(parse_structured(&content))
    }

    /// Resolves a payload node into a body, templating as it goes.
    pub fn resolve(
        &self,
        node: Option<&Value>,
        vars: &dyn VariableSource,
    ) -> Result<Option<RequestBody>> {
        let body = match node {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => {
                let raw = if text.trim_start().starts_with(CLASSPATH_PREFIX) {
                    self.read_classpath(text.trim())?
                } else {
                    text.clone()
                };
                let rendered = render(&raw, vars);
                match parse_structured(&rendered) {
                    Some(json) => Some(RequestBody::Json(json)),
                    None => Some(RequestBody::Text(rendered)),
                }
            }
            Some(tree) => Some(RequestBody::Json(render_json(tree, vars))),
        };
        Ok(body)
    }
}

fn parse_structured(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}
