//! Variable store and layered lookup
//!
//! Each engine owns one [`VariableStore`]. `save` clauses write into it;
//! templating reads through a [`VariableScope`], which stacks call-scoped
//! overrides above the store and file-level defaults below it.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// What happens when a write hits a key that is already set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Reject the write
    #[default]
    Strict,
    /// Log a warning and overwrite
    Warn,
}

impl OverwritePolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::Warn
        }
    }
}

/// Anything templating can read variables from
pub trait VariableSource {
    fn resolve(&self, name: &str) -> Option<&Value>;
}

impl VariableSource for BTreeMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// Flat, mutable, string-keyed variable map
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    values: BTreeMap<String, Value>,
    policy: OverwritePolicy,
}

impl VariableStore {
    pub fn new(policy: OverwritePolicy) -> Self {
        Self {
            values: BTreeMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> OverwritePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: OverwritePolicy) {
        self.policy = policy;
    }

    /// Stores `value` under `key`, honouring the overwrite policy.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        let key = key.into();
        if let Some(previous) = self.values.get(&key) {
            match self.policy {
                OverwritePolicy::Strict => return Err(Error::VariableOverwrite { key }),
                OverwritePolicy::Warn => {
                    warn!(variable = %key, previous = %previous, new = %value, "Overwriting variable");
                }
            }
        } else {
            debug!(variable = %key, value = %value, "Saving variable");
        }
        self.values.insert(key, value);
        Ok(())
    }

    /// Stores every entry or none of them.
    ///
    /// Under the strict policy the whole batch is rejected when any key is
    /// already set.
    pub fn set_all(&mut self, entries: Vec<(String, Value)>) -> Result<()> {
        if self.policy == OverwritePolicy::Strict {
            if let Some((key, _)) = entries.iter().find(|(key, _)| self.values.contains_key(key)) {
                return Err(Error::VariableOverwrite { key: key.clone() });
            }
        }
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

impl VariableSource for VariableStore {
    fn resolve(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Read-only stack of variable layers; the first layer holding a name wins.
#[derive(Default)]
pub struct VariableScope<'a> {
    layers: Vec<&'a dyn VariableSource>,
}

impl<'a> VariableScope<'a> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Adds a layer below every layer added so far.
    pub fn layer(mut self, source: &'a dyn VariableSource) -> Self {
        self.layers.push(source);
        self
    }
}

impl VariableSource for VariableScope<'_> {
    fn resolve(&self, name: &str) -> Option<&Value> {
        self.layers.iter().find_map(|layer| layer.resolve(name))
    }
}
