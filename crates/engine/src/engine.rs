//! The `Moxter` engine
//!
//! One engine is bound to one scope. It owns the file chain visible from
//! that scope, a cache of materialized fixtures and the variable store that
//! `save` clauses write into. Calls run one at a time through `&mut self`.

use moxter_core::config::EngineConfig;
use moxter_core::error::{Error, Result};
use moxter_core::scope::Scope;
use moxter_core::status::ExpectedStatus;
use moxter_core::variables::{VariableScope, VariableStore};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::executor::{HttpExecutor, ReqwestExecutor};
use crate::materializer::{Materialized, Materializer};
use crate::payload::PayloadResolver;
use crate::report::{CallOutcome, CallReport};
use crate::repository::FixtureRepository;
use crate::request::RequestBuilder;
use crate::resolver::Resolver;
use crate::response::ResponseEnvelope;

const BODY_EXCERPT_CHARS: usize = 500;

/// How failures during a call are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// The first failure is returned as an error
    #[default]
    Strict,
    /// Failures are logged, recorded in the report and skipped
    Lax,
}

impl ExecutionMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::Lax
        }
    }
}

/// Per-call overrides
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    mode: Option<ExecutionMode>,
    vars: BTreeMap<String, Value>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            mode: Some(ExecutionMode::Strict),
            ..Self::default()
        }
    }

    pub fn lax() -> Self {
        Self {
            mode: Some(ExecutionMode::Lax),
            ..Self::default()
        }
    }

    /// Adds a variable visible only to this call; it shadows the store.
    pub fn var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn mode(&self) -> Option<ExecutionMode> {
        self.mode
    }
}

enum Step {
    Call(Arc<Materialized>),
    /// A group member that failed to resolve in lax mode
    Unresolved { name: String, reason: String },
}

/// Builder for [`Moxter`]
pub struct MoxterBuilder {
    scope: String,
    config: Option<EngineConfig>,
    root: Option<PathBuf>,
    executor: Option<Arc<dyn HttpExecutor>>,
}

impl MoxterBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides `fixtures_root` from the configuration.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn executor(mut self, executor: Arc<dyn HttpExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Loads the file chain for the scope and wires the engine together.
    ///
    /// Fails when no definitions file exists anywhere along the chain.
    pub fn build(self) -> Result<Moxter> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let scope = Scope::parse(&self.scope)?;
        let root = self
            .root
            .unwrap_or_else(|| PathBuf::from(&config.fixtures_root));

        let mut repository = FixtureRepository::new(&root, config.file_names.clone());
        let resolver = Resolver::new(repository.chain(&scope)?);
        let defaults = resolver.defaults();
        let payloads = PayloadResolver::new(&root);

        let executor: Arc<dyn HttpExecutor> = match self.executor {
            Some(executor) => executor,
            None => Arc::new(ReqwestExecutor::new(&config.http)?),
        };

        info!(
            scope = %scope,
            root = %root.display(),
            files = resolver.levels().len(),
            "Fixture engine ready"
        );

        Ok(Moxter {
            mode: ExecutionMode::from_strict(config.strict),
            vars: VariableStore::new(config.overwrite_policy()),
            materializer: Materializer::new(resolver, payloads.clone()),
            scope,
            config,
            payloads,
            executor,
            defaults,
        })
    }
}

/// Resolves and executes fixtures for one scope
pub struct Moxter {
    scope: Scope,
    config: EngineConfig,
    mode: ExecutionMode,
    materializer: Materializer,
    payloads: PayloadResolver,
    executor: Arc<dyn HttpExecutor>,
    vars: VariableStore,
    defaults: BTreeMap<String, Value>,
}

impl std::fmt::Debug for Moxter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Moxter")
            .field("scope", &self.scope)
            .field("mode", &self.mode)
            .field("config", &self.config)
            .field("vars", &self.vars.len())
            .field("cached", &self.materializer.cached())
            .finish_non_exhaustive()
    }
}

impl Moxter {
    pub fn builder(scope: impl Into<String>) -> MoxterBuilder {
        MoxterBuilder {
            scope: scope.into(),
            config: None,
            root: None,
            executor: None,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ExecutionMode) {
        self.mode = mode;
    }

    pub fn vars(&self) -> &VariableStore {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut VariableStore {
        &mut self.vars
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Seeds a variable, subject to the overwrite policy.
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.vars.set(name, value.into())
    }

    /// Every visible fixture name and the file whose definition wins
    pub fn fixture_names(&self) -> BTreeMap<String, PathBuf> {
        self.materializer.resolver().names()
    }

    /// The merged definition of `name`, without executing it
    pub fn materialized(&mut self, name: &str) -> Result<Arc<Materialized>> {
        self.materializer.materialize(name)
    }

    /// Runs `name` with the engine's default mode.
    pub async fn call(&mut self, name: &str) -> Result<CallReport> {
        self.call_with(name, CallOptions::new()).await
    }

    /// Runs `name`; a group runs each member in order.
    ///
    /// Resolving the requested name itself fails in either mode. Past that
    /// point, lax mode records failures in the report and keeps going.
    pub async fn call_with(&mut self, name: &str, options: CallOptions) -> Result<CallReport> {
        let mode = options.mode.unwrap_or(self.mode);
        let root = self.materializer.materialize(name)?;

        let mut steps = Vec::new();
        self.expand(root, mode, &mut Vec::new(), &mut steps)?;
        debug!(fixture = name, steps = steps.len(), ?mode, "Running fixture");

        let mut report = CallReport::new(name);
        for step in steps {
            match step {
                Step::Call(fixture) => match self.execute_one(&fixture, &options.vars).await {
                    Ok(response) => report.record(fixture.name(), CallOutcome::Passed(response)),
                    Err(e) if mode == ExecutionMode::Lax => {
                        warn!(fixture = fixture.name(), error = %e, "Fixture failed, continuing");
                        report.record(fixture.name(), CallOutcome::Failed(e.to_string()));
                    }
                    Err(e) => return Err(e),
                },
                Step::Unresolved { name, reason } => {
                    report.record(name, CallOutcome::Failed(reason));
                }
            }
        }
        Ok(report)
    }

    /// Flattens groups into the calls they run, in order.
    fn expand(
        &mut self,
        fixture: Arc<Materialized>,
        mode: ExecutionMode,
        stack: &mut Vec<String>,
        steps: &mut Vec<Step>,
    ) -> Result<()> {
        let Some(members) = fixture.call.fixtures.clone() else {
            steps.push(Step::Call(fixture));
            return Ok(());
        };

        stack.push(fixture.name().to_string());
        for member in members {
            if stack.contains(&member) {
                let mut trace = stack.clone();
                trace.push(member);
                return Err(Error::CyclicBasedOn { trace });
            }
            match self.materializer.materialize(&member) {
                Ok(resolved) => self.expand(resolved, mode, stack, steps)?,
                Err(e) if mode == ExecutionMode::Lax => {
                    warn!(group = fixture.name(), member = %member, error = %e, "Group member did not resolve");
                    steps.push(Step::Unresolved {
                        name: member,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        stack.pop();
        Ok(())
    }

    async fn execute_one(
        &mut self,
        fixture: &Materialized,
        overlay: &BTreeMap<String, Value>,
    ) -> Result<ResponseEnvelope> {
        let request = {
            let vars = VariableScope::new()
                .layer(overlay)
                .layer(&self.vars)
                .layer(&self.defaults);
            RequestBuilder::new(&self.config, &self.payloads).build(&fixture.call, &vars)?
        };
        debug!(
            fixture = fixture.name(),
            method = %request.method,
            url = %request.url,
            "Executing fixture"
        );

        let response = ResponseEnvelope::from(self.executor.execute(request).await?);

        let expected = fixture
            .call
            .expected_status
            .clone()
            .unwrap_or_else(ExpectedStatus::any_success);
        if !expected.matches(response.status()) {
            return Err(Error::StatusMismatch {
                name: fixture.name().to_string(),
                expected: expected.to_string(),
                actual: response.status(),
                body: response.body_excerpt(BODY_EXCERPT_CHARS),
            });
        }

        if let Some(save) = &fixture.call.save {
            let extracted = save
                .iter()
                .map(|(key, path)| Ok((key.to_string(), response.read(path)?)))
                .collect::<Result<Vec<_>>>()?;
            self.vars.set_all(extracted)?;
        }

        info!(
            fixture = fixture.name(),
            status = response.status(),
            "Fixture passed"
        );
        Ok(response)
    }
}
