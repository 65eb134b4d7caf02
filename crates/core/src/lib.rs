//! Core types for the moxter fixture engine
//!
//! This crate provides the building blocks the engine is assembled from:
//!
//! - **Model**: fixture files, rows and expected statuses
//! - **Merge**: the `basedOn` deep-merge rules
//! - **Templating**: `{{var}}` substitution over strings and JSON trees
//! - **Variables**: the per-engine store and layered lookup
//! - **Scopes**: qualified names mapped onto the fixture directory chain
//! - **Configuration** and **error handling**
//!

pub mod config;
pub mod error;
pub mod merge;
pub mod model;
pub mod scope;
pub mod status;
pub mod template;
pub mod variables;

// Re-export main types for convenience
pub use config::{AuthConfig, CsrfConfig, EngineConfig, HttpConfig};
pub use error::{Error, Result, ResultExt};
pub use merge::merge_json;
pub use model::{FixtureCall, FixtureSuite, HttpMethod, SaveClause, TextValue};
pub use scope::Scope;
pub use status::{ExpectedStatus, StatusMatcher};
pub use variables::{OverwritePolicy, VariableScope, VariableSource, VariableStore};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::error::{Result, ResultExt};
    pub use crate::model::{FixtureCall, FixtureSuite};
    pub use crate::scope::Scope;
}
