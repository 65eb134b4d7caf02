//! Library interface for the moxter CLI
//!
//! Output formatting and argument parsing live here so integration tests can
//! drive them without spawning the binary.

use anyhow::{anyhow, Context, Result};
use moxter_core::config::EngineConfig;
use moxter_engine::{CallOutcome, CallReport, Moxter};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub use moxter_core::variables::VariableStore;

/// Parses a `--var key=value` argument.
///
/// The value is read as JSON when it parses (`id=5`, `tags=["a"]`), and as a
/// plain string otherwise.
pub fn parse_var(arg: &str) -> Result<(String, Value)> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid variable '{arg}'. Expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Invalid variable '{arg}'. Key cannot be empty");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Applies command-line overrides on top of the loaded configuration.
pub fn apply_overrides(
    config: &mut EngineConfig,
    root: Option<&Path>,
    base_url: Option<&str>,
    lax: bool,
) -> Result<()> {
    if let Some(root) = root {
        config.fixtures_root = root.display().to_string();
    }
    if let Some(base_url) = base_url {
        config.http.base_url = base_url.to_string();
    }
    if lax {
        config.strict = false;
    }
    config.validate().context("Invalid configuration")?;
    Ok(())
}

/// Builds an engine for `scope` using the live HTTP executor.
pub fn build_engine(scope: &str, config: EngineConfig) -> Result<Moxter> {
    Moxter::builder(scope)
        .config(config)
        .build()
        .with_context(|| format!("Failed to load fixtures for scope '{scope}'"))
}

/// One line per visible fixture: name and the file defining it
pub fn format_fixture_list(names: &[(String, PathBuf)]) -> String {
    let width = names.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (name, path) in names {
        let _ = writeln!(out, "{name:<width$}  {}", path.display());
    }
    out
}

/// The merged definition of `name` as YAML
pub fn render_materialized(moxter: &mut Moxter, name: &str) -> Result<String> {
    let materialized = moxter.materialized(name)?;
    let mut out = format!(
        "# {} ({})\n",
        materialized.lineage.join(" <- "),
        materialized.source.display()
    );
    out.push_str(&serde_yaml::to_string(&materialized.call).context("Failed to render fixture")?);
    Ok(out)
}

pub fn format_report(report: &CallReport) -> String {
    let mut out = String::new();
    for call in &report.calls {
        match &call.outcome {
            CallOutcome::Passed(response) => {
                let _ = writeln!(out, "  ok    {} ({})", call.name, response.status());
            }
            CallOutcome::Failed(reason) => {
                let _ = writeln!(out, "  FAIL  {}: {reason}", call.name);
            }
        }
    }
    out
}

pub fn format_vars(vars: &VariableStore) -> String {
    let mut out = String::new();
    for (key, value) in vars.iter() {
        let _ = writeln!(out, "  {key} = {value}");
    }
    out
}
