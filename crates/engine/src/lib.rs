//! Fixture resolution and execution for Moxter
//!
//! Definitions files are discovered along a scope's directory chain, names
//! are resolved closest-file-first, `basedOn` chains are merged, and the
//! resulting calls run through an [`HttpExecutor`] with their responses
//! checked and mined for variables.
//!
//! ```no_run
//! # async fn run() -> moxter_core::Result<()> {
//! use moxter_engine::Moxter;
//!
//! let mut moxter = Moxter::builder("api::pets::OwnerApiTest")
//!     .root("tests/fixtures")
//!     .build()?;
//! let report = moxter.call("create_owner").await?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod executor;
pub mod materializer;
pub mod payload;
pub mod report;
pub mod repository;
pub mod request;
pub mod resolver;
pub mod response;

pub use engine::{CallOptions, ExecutionMode, Moxter, MoxterBuilder};
pub use executor::{
    Credentials, HttpExecutor, HttpRequest, RawResponse, ReqwestExecutor, RequestBody,
    StubExecutor,
};
pub use materializer::{Materialized, Materializer};
pub use payload::PayloadResolver;
pub use report::{CallOutcome, CallReport, ExecutedCall};
pub use repository::{FixtureRepository, LoadedSuite, LocatedFile};
pub use resolver::{Resolved, Resolver};
pub use response::ResponseEnvelope;
