//! Hierarchical name lookup over a loaded file chain
//!
//! Level 0 is the file closest to the scope; higher levels are ancestors.
//! A lookup returns the first level defining the name. Definitions in
//! different files are never combined by a plain lookup.

use moxter_core::error::{Error, Result};
use moxter_core::model::FixtureCall;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::repository::LoadedSuite;

/// A row together with where it was found
#[derive(Debug, Clone)]
pub struct Resolved {
    pub level: usize,
    pub suite: Arc<LoadedSuite>,
    pub call: FixtureCall,
}

impl Resolved {
    /// `name@file`, used in cycle traces and logs
    pub fn label(&self) -> String {
        format!("{}@{}", self.call.name, self.suite.path.display())
    }
}

/// Name lookup over the chain of files visible from one scope
#[derive(Debug, Clone)]
pub struct Resolver {
    levels: Vec<Arc<LoadedSuite>>,
}

impl Resolver {
    pub fn new(levels: Vec<Arc<LoadedSuite>>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[Arc<LoadedSuite>] {
        &self.levels
    }

    fn searched_from(&self, from_level: usize) -> Vec<PathBuf> {
        self.levels
            .iter()
            .skip(from_level)
            .map(|l| l.path.clone())
            .collect()
    }

    /// Looks `name` up starting at the closest file.
    pub fn find(&self, name: &str) -> Result<Resolved> {
        self.find_from(name, 0)
    }

    /// Looks `name` up starting at `from_level`, climbing towards the root.
    pub fn find_from(&self, name: &str, from_level: usize) -> Result<Resolved> {
        self.levels
            .iter()
            .enumerate()
            .skip(from_level)
            .find_map(|(level, suite)| {
                suite.suite.get(name).map(|call| Resolved {
                    level,
                    suite: Arc::clone(suite),
                    call: call.clone(),
                })
            })
            .ok_or_else(|| Error::UnknownFixture {
                name: name.to_string(),
                searched: self.searched_from(from_level),
            })
    }

    /// Resolves the `basedOn` parent of `child`, if it has one.
    ///
    /// The search starts at the child's own file. A row based on its own name
    /// starts one level up instead, which lets a scope extend the inherited
    /// definition it shadows.
    pub fn find_parent(&self, child: &Resolved) -> Result<Option<Resolved>> {
        let Some(parent_name) = child.call.based_on.as_deref() else {
            return Ok(None);
        };
        let from_level = if parent_name == child.call.name {
            child.level + 1
        } else {
            child.level
        };
        self.find_from(parent_name, from_level).map(Some)
    }

    /// Every visible fixture name and the file whose definition wins.
    pub fn names(&self) -> BTreeMap<String, PathBuf> {
        let mut names = BTreeMap::new();
        for level in &self.levels {
            for name in level.suite.names() {
                names
                    .entry(name.to_string())
                    .or_insert_with(|| level.path.clone());
            }
        }
        names
    }

    /// File-level `vars` defaults flattened with the closest file winning.
    pub fn defaults(&self) -> BTreeMap<String, Value> {
        let mut defaults = BTreeMap::new();
        for level in &self.levels {
            for (key, value) in &level.suite.vars {
                defaults
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
        defaults
    }
}
