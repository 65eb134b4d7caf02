//! Moxter CLI - declarative HTTP fixtures
//!
//! This binary lists, inspects and runs fixtures against a live server.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use moxter::{
    apply_overrides, build_engine, format_fixture_list, format_report, format_vars, parse_var,
    render_materialized,
};
use moxter_core::config::EngineConfig;
use moxter_engine::{CallOptions, ExecutionMode};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "moxter")]
#[command(about = "Declarative HTTP fixtures from YAML")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the fixtures visible from a scope
    List {
        /// Scope to resolve from, e.g. api::pets::OwnerApiTest
        #[arg(short, long)]
        scope: String,

        /// Fixtures root directory (overrides configuration)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },
    /// Print the merged definition of a fixture
    Show {
        name: String,

        #[arg(short, long)]
        scope: String,

        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },
    /// Execute fixtures against a running server
    Run {
        /// Fixture names, executed in order with a shared variable store
        #[arg(required = true)]
        names: Vec<String>,

        #[arg(short, long)]
        scope: String,

        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Server base URL (overrides configuration)
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,

        /// Log failures and keep going instead of stopping
        #[arg(long)]
        lax: bool,

        /// Seed a variable, KEY=VALUE; repeatable
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    match cli.command {
        Some(Commands::List { scope, root }) => {
            list(cli.config.as_deref(), &scope, root.as_deref())
        }
        Some(Commands::Show { name, scope, root }) => {
            show(cli.config.as_deref(), &scope, root.as_deref(), &name)
        }
        Some(Commands::Run {
            names,
            scope,
            root,
            base_url,
            lax,
            vars,
        }) => {
            let config = load_config(cli.config.as_deref(), root.as_deref(), base_url.as_deref(), lax)?;
            run(config, &scope, &names, &vars).await
        }
        None => {
            println!("Run 'moxter run <NAME> --scope <SCOPE>' to execute fixtures, or --help for more options");
            Ok(())
        }
    }
}

/// Initialize logging system
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "moxter_core={level},moxter_engine={level},{}={level}",
            env!("CARGO_PKG_NAME")
        ))
        .init();

    Ok(())
}

fn load_config(
    config_path: Option<&Path>,
    root: Option<&Path>,
    base_url: Option<&str>,
    lax: bool,
) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(config_path).context("Failed to load configuration")?;
    apply_overrides(&mut config, root, base_url, lax)?;
    Ok(config)
}

fn list(config_path: Option<&Path>, scope: &str, root: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, root, None, false)?;
    let moxter = build_engine(scope, config)?;
    let names: Vec<_> = moxter.fixture_names().into_iter().collect();
    print!("{}", format_fixture_list(&names));
    Ok(())
}

fn show(config_path: Option<&Path>, scope: &str, root: Option<&Path>, name: &str) -> Result<()> {
    let config = load_config(config_path, root, None, false)?;
    let mut moxter = build_engine(scope, config)?;
    print!("{}", render_materialized(&mut moxter, name)?);
    Ok(())
}

async fn run(config: EngineConfig, scope: &str, names: &[String], vars: &[String]) -> Result<()> {
    let mut moxter = build_engine(scope, config)?;
    for arg in vars {
        let (key, value) = parse_var(arg)?;
        moxter.set_var(key, value)?;
    }

    let mut failed = 0usize;
    for name in names {
        info!("Running fixture '{name}'");
        match moxter.call_with(name, CallOptions::new()).await {
            Ok(report) => {
                println!("{name}");
                print!("{}", format_report(&report));
                failed += report.failures().len();
            }
            Err(e) => {
                if e.is_resolution() {
                    error!("Fixture '{name}' could not be resolved from scope '{scope}': {e}");
                } else {
                    error!("Fixture '{name}' failed: {e}");
                }
                println!("{name}\n  FAIL  {e}");
                failed += 1;
                if e.is_resolution() || moxter.mode() == ExecutionMode::Strict {
                    break;
                }
            }
        }
    }

    if !moxter.vars().is_empty() {
        println!("Variables:");
        print!("{}", format_vars(moxter.vars()));
    }

    if failed > 0 {
        anyhow::bail!("{failed} fixture call(s) failed");
    }
    Ok(())
}
