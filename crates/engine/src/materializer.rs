//! `basedOn` expansion
//!
//! Materializing a name resolves it, walks its `basedOn` ancestry to the
//! root definition, then folds the chain back down with the merge rules in
//! `moxter_core::merge`. Results are cached for the lifetime of the
//! materializer, which is bound to one scope.

use moxter_core::error::{Error, Result};
use moxter_core::model::FixtureCall;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::payload::PayloadResolver;
use crate::resolver::{Resolved, Resolver};

/// A fully merged fixture ready for execution
#[derive(Debug, Clone)]
pub struct Materialized {
    pub call: FixtureCall,
    /// File holding the requested definition
    pub source: PathBuf,
    /// Names from the requested row up to its root ancestor
    pub lineage: Vec<String>,
}

impl Materialized {
    pub fn name(&self) -> &str {
        &self.call.name
    }

    pub fn is_group(&self) -> bool {
        self.call.is_group()
    }
}

/// Expands and caches fixture definitions for one scope
#[derive(Debug)]
pub struct Materializer {
    resolver: Resolver,
    payloads: PayloadResolver,
    cache: HashMap<String, Arc<Materialized>>,
}

impl Materializer {
    pub fn new(resolver: Resolver, payloads: PayloadResolver) -> Self {
        Self {
            resolver,
            payloads,
            cache: HashMap::new(),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Returns the merged definition of `name`.
    pub fn materialize(&mut self, name: &str) -> Result<Arc<Materialized>> {
        if let Some(hit) = self.cache.get(name) {
            return Ok(Arc::clone(hit));
        }

        let ancestry = self.ancestry(name)?;
        let source = ancestry[0].suite.path.clone();
        let lineage: Vec<String> = ancestry.iter().map(|r| r.call.name.clone()).collect();

        // Fold from the root ancestor down to the requested row.
        let mut rows = ancestry.into_iter().rev().map(|r| r.call);
        let mut merged = rows
            .next()
            .ok_or_else(|| Error::invalid_input(format!("empty ancestry for '{name}'")))?;
        merged.based_on = None;
        for mut child in rows {
            self.prepare_payloads(&mut merged, &mut child)?;
            merged = child.merged_onto(&merged);
        }

        merged.validate_executable()?;
        debug!(
            fixture = name,
            lineage = %lineage.join(" <- "),
            "Materialized fixture"
        );

        let materialized = Arc::new(Materialized {
            call: merged,
            source,
            lineage,
        });
        self.cache
            .insert(name.to_string(), Arc::clone(&materialized));
        Ok(materialized)
    }

    /// The requested row followed by each `basedOn` ancestor.
    fn ancestry(&self, name: &str) -> Result<Vec<Resolved>> {
        let first = self.resolver.find(name)?;
        let mut seen = HashSet::from([(first.level, first.call.name.clone())]);
        let mut trace = vec![first.label()];
        let mut chain = vec![first];

        loop {
            let Some(current) = chain.last() else { break };
            let Some(parent) = self.resolver.find_parent(current)? else {
                break;
            };
            trace.push(parent.label());
            if !seen.insert((parent.level, parent.call.name.clone())) {
                return Err(Error::CyclicBasedOn { trace });
            }
            chain.push(parent);
        }
        Ok(chain)
    }

    /// Parses textual payloads when both sides carry one, so objects merge.
    fn prepare_payloads(&self, parent: &mut FixtureCall, child: &mut FixtureCall) -> Result<()> {
        if parent.payload.is_none() || child.payload.is_none() {
            return Ok(());
        }
        for payload in [&mut parent.payload, &mut child.payload] {
            let parsed = match payload.as_ref() {
                Some(Value::String(text)) => self.payloads.load_textual(text)?,
                _ => None,
            };
            if parsed.is_some() {
                *payload = parsed;
            }
        }
        Ok(())
    }
}
