use std::path::PathBuf;

use thiserror::Error;

/// Result type for moxter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for moxter operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parsing errors when loading fixture files or payloads
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No definitions file exists anywhere along the scope chain
    #[error("No fixture file found for scope '{scope}'. Searched:\n{}", format_paths(.searched))]
    FixtureFileNotFound { scope: String, searched: Vec<PathBuf> },

    /// A referenced fixture name is not defined in any file of the chain
    #[error("Unknown fixture '{name}'. Searched:\n{}", format_paths(.searched))]
    UnknownFixture { name: String, searched: Vec<PathBuf> },

    /// Two rows with the same name in one file
    #[error("Duplicate fixture '{name}' in {}", .file.display())]
    DuplicateFixture { name: String, file: PathBuf },

    /// A row violates the fixture shape rules
    #[error("Invalid fixture '{name}': {message}")]
    InvalidFixture { name: String, message: String },

    /// `basedOn` (or group membership) loops back onto itself
    #[error("Cyclic fixture reference: {}", .trace.join(" -> "))]
    CyclicBasedOn { trace: Vec<String> },

    /// The response status did not satisfy the expected status
    #[error("Fixture '{name}' expected status {expected} but got {actual}. Body: {body}")]
    StatusMismatch {
        name: String,
        expected: String,
        actual: u16,
        body: String,
    },

    /// A variable write hit an existing key under the strict overwrite policy
    #[error("Variable '{key}' is already set; overwriting is disabled")]
    VariableOverwrite { key: String },

    /// A JSONPath extraction failed
    #[error("Extraction of '{path}' failed: {message}")]
    Extraction { path: String, message: String },

    /// HTTP execution errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a parse error
    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates an invalid fixture error
    pub fn invalid_fixture(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFixture {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an extraction error
    pub fn extraction(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Adds context to any error
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// True for errors raised while resolving names rather than executing calls.
    ///
    /// Lax mode never swallows these for the top-level name.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::FixtureFileNotFound { .. }
                | Self::UnknownFixture { .. }
                | Self::CyclicBasedOn { .. }
                | Self::DuplicateFixture { .. }
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::with_context(context, e))
    }
}
