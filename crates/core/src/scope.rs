//! Lookup scopes for fixture resolution.
//!
//! A scope is the qualified name that fixture lookup starts from, usually
//! the test that owns the fixtures (`api::pets::OwnerApiTest` or
//! `com.example.pets.OwnerApiTest`). Each segment maps to one directory
//! level under the fixtures root.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Path separator style for scope names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PathSeparator {
    /// `::` separator (Rust module paths)
    #[default]
    DoubleColon,
    /// `.` separator (package-style names)
    Dot,
}

impl PathSeparator {
    /// Get the string representation of this separator.
    pub fn as_str(&self) -> &'static str {
        match self {
            PathSeparator::DoubleColon => "::",
            PathSeparator::Dot => ".",
        }
    }
}

/// Structured scope name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    segments: Vec<String>,
    separator: PathSeparator,
}

impl Scope {
    /// Parse a scope name string into structured form.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is empty or has empty segments.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::invalid_input("scope name cannot be empty"));
        }

        let (segments, separator) = if s.contains("::") {
            (
                s.split("::").map(String::from).collect::<Vec<_>>(),
                PathSeparator::DoubleColon,
            )
        } else if s.contains('.') {
            (
                s.split('.').map(String::from).collect::<Vec<_>>(),
                PathSeparator::Dot,
            )
        } else {
            (vec![s.to_string()], PathSeparator::DoubleColon)
        };

        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(Error::invalid_input(format!(
                "scope name contains empty segment: {s}"
            )));
        }
        if segments
            .iter()
            .any(|seg| seg == ".." || seg.contains('/') || seg.contains('\\'))
        {
            return Err(Error::invalid_input(format!(
                "scope segment must not contain path components: {s}"
            )));
        }

        Ok(Self {
            segments,
            separator,
        })
    }

    /// Scope segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The innermost segment (the test identity itself).
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The enclosing scope, or `None` at a single-segment scope.
    pub fn parent(&self) -> Option<Scope> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
            separator: self.separator,
        })
    }

    /// Relative directories to search, most specific first.
    ///
    /// The final entry is the empty path, i.e. the fixtures root itself.
    pub fn directory_chain(&self) -> Vec<PathBuf> {
        (0..=self.segments.len())
            .rev()
            .map(|depth| self.segments[..depth].iter().collect::<PathBuf>())
            .collect()
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(self.separator.as_str()))
    }
}

impl std::str::FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Scope::parse(&s).map_err(serde::de::Error::custom)
    }
}
