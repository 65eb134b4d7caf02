//! Fixture file discovery and loading
//!
//! Definitions live under a fixtures root (the stand-in for the classpath
//! root). A scope `api::pets::OwnerApiTest` is looked up in
//! `<root>/api/pets/OwnerApiTest/`, then `<root>/api/pets/`, `<root>/api/`
//! and finally `<root>/`. In each directory the configured file names are
//! tried in order and the first existing one is that level's file.

use moxter_core::config::EngineConfig;
use moxter_core::error::{Error, Result};
use moxter_core::model::FixtureSuite;
use moxter_core::scope::Scope;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Location of one definitions file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFile {
    pub path: PathBuf,
    pub base_dir: PathBuf,
}

/// A parsed and validated definitions file
#[derive(Debug)]
pub struct LoadedSuite {
    pub path: PathBuf,
    pub base_dir: PathBuf,
    pub suite: FixtureSuite,
}

/// Finds and loads definitions files along a scope's directory chain
#[derive(Debug)]
pub struct FixtureRepository {
    root: PathBuf,
    file_names: Vec<String>,
    cache: HashMap<PathBuf, Arc<LoadedSuite>>,
}

impl FixtureRepository {
    pub fn new(root: impl Into<PathBuf>, file_names: Vec<String>) -> Self {
        Self {
            root: root.into(),
            file_names,
            cache: HashMap::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.fixtures_root, config.file_names.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every candidate path for `scope`, in search order.
    pub fn candidates(&self, scope: &Scope) -> Vec<PathBuf> {
        scope
            .directory_chain()
            .iter()
            .flat_map(|dir| {
                let dir = self.root.join(dir);
                self.file_names
                    .iter()
                    .map(move |name| dir.join(name))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// The definitions file of each directory level that has one, closest first.
    fn existing_levels(&self, scope: &Scope) -> Vec<LocatedFile> {
        scope
            .directory_chain()
            .iter()
            .filter_map(|dir| {
                let base_dir = self.root.join(dir);
                self.file_names
                    .iter()
                    .map(|name| base_dir.join(name))
                    .find(|candidate| candidate.is_file())
                    .map(|path| LocatedFile {
                        path,
                        base_dir: base_dir.clone(),
                    })
            })
            .collect()
    }

    fn not_found(&self, scope: &Scope) -> Error {
        Error::FixtureFileNotFound {
            scope: scope.to_string(),
            searched: self.candidates(scope),
        }
    }

    /// Returns the most specific definitions file for `scope`.
    pub fn locate(&self, scope: &Scope) -> Result<LocatedFile> {
        self.existing_levels(scope)
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(scope))
    }

    /// Loads every definitions file along the chain, closest first.
    pub fn chain(&mut self, scope: &Scope) -> Result<Vec<Arc<LoadedSuite>>> {
        let levels = self.existing_levels(scope);
        if levels.is_empty() {
            return Err(self.not_found(scope));
        }
        debug!(
            scope = %scope,
            files = levels.len(),
            "Resolved fixture file chain"
        );
        levels.into_iter().map(|level| self.load(level)).collect()
    }

    /// Parses and validates one file, reusing a previous load of the same path.
    pub fn load(&mut self, located: LocatedFile) -> Result<Arc<LoadedSuite>> {
        if let Some(cached) = self.cache.get(&located.path) {
            return Ok(Arc::clone(cached));
        }

        let file = located.path.display().to_string();
        let content = std::fs::read_to_string(&located.path)
            .map_err(|e| Error::parse(&file, format!("Failed to read fixture file: {e}")))?;
        let suite = parse_suite(&content, &located.path)?;
        debug!(
            file = %file,
            fixtures = suite.fixtures.len(),
            "Loaded fixture file"
        );

        let loaded = Arc::new(LoadedSuite {
            path: located.path.clone(),
            base_dir: located.base_dir,
            suite,
        });
        self.cache.insert(located.path, Arc::clone(&loaded));
        Ok(loaded)
    }
}

/// Parses YAML text into a validated suite.
///
/// An empty document is an empty suite.
pub fn parse_suite(content: &str, path: &Path) -> Result<FixtureSuite> {
    let file = path.display().to_string();
    if content.trim().is_empty() {
        return Ok(FixtureSuite::default());
    }
    let suite: FixtureSuite =
        serde_yaml::from_str(content).map_err(|e| Error::parse(&file, e.to_string()))?;
    suite.validate(path)?;
    Ok(suite)
}
