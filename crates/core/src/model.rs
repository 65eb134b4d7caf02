//! Fixture file data model
//!
//! One definitions file deserializes into a [`FixtureSuite`]: an ordered list
//! of [`FixtureCall`] rows plus optional variable defaults. A row is either an
//! HTTP call or a group of other rows, never both.

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Display};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::status::ExpectedStatus;

/// Root of one definitions file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureSuite {
    /// Variable defaults visible to every fixture resolved through this file
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, Value>,

    /// Fixture rows in file order
    #[serde(default, alias = "moxtures")]
    pub fixtures: Vec<FixtureCall>,
}

impl FixtureSuite {
    /// Validates every row and rejects duplicate names.
    ///
    /// `file` is only used for diagnostics.
    pub fn validate(&self, file: &Path) -> Result<()> {
        let mut seen = HashSet::new();
        for call in &self.fixtures {
            call.validate_shape()?;
            if !seen.insert(call.name.as_str()) {
                return Err(Error::DuplicateFixture {
                    name: call.name.clone(),
                    file: file.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FixtureCall> {
        self.fixtures.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fixtures.iter().map(|c| c.name.as_str())
    }
}

/// Scalar accepted for header and query values.
///
/// YAML authors write `page: 1` or `verbose: true`; both are sent as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Display for TextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TextValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// `save` entries, variable name to JSONPath, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveClause(Vec<(String, String)>);

impl SaveClause {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, p)| (k.as_str(), p.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == key).map(|(_, p)| p)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, P: Into<String>> FromIterator<(K, P)> for SaveClause {
    /// A repeated key keeps its first position and takes the last path.
    fn from_iter<I: IntoIterator<Item = (K, P)>>(iter: I) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();
        for (key, path) in iter {
            let (key, path) = (key.into(), path.into());
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(existing) => existing.1 = path,
                None => entries.push((key, path)),
            }
        }
        Self(entries)
    }
}

impl Serialize for SaveClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, path) in &self.0 {
            map.serialize_entry(key, path)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SaveClause {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SaveVisitor;

        impl<'de> Visitor<'de> for SaveVisitor {
            type Value = SaveClause;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of variable names to JSONPath expressions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<SaveClause, A::Error> {
                let mut entries: Vec<(String, String)> = Vec::new();
                while let Some((key, path)) = map.next_entry::<String, String>()? {
                    if entries.iter().any(|(k, _)| *k == key) {
                        return Err(de::Error::custom(format!("duplicate save key '{key}'")));
                    }
                    entries.push((key, path));
                }
                Ok(SaveClause(entries))
            }
        }

        deserializer.deserialize_map(SaveVisitor)
    }
}

/// One fixture row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FixtureCall {
    pub name: String,

    /// Fixture this row inherits from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub based_on: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, TextValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<BTreeMap<String, TextValue>>,

    /// JSON tree, raw JSON text, or a `classpath:` reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<ExpectedStatus>,

    /// Variable name to JSONPath expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<SaveClause>,

    /// Group members, executed in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixtures: Option<Vec<String>>,
}

impl FixtureCall {
    pub fn is_group(&self) -> bool {
        self.fixtures.is_some()
    }

    pub fn has_http_fields(&self) -> bool {
        self.method.is_some()
            || self.endpoint.is_some()
            || self.headers.is_some()
            || self.query.is_some()
            || self.payload.is_some()
            || self.expected_status.is_some()
            || self.save.is_some()
    }

    /// Load-time checks that hold for every row, inherited or not.
    pub fn validate_shape(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_fixture("<unnamed>", "name cannot be empty"));
        }
        if self.is_group() && self.has_http_fields() {
            return Err(Error::invalid_fixture(
                &self.name,
                "a fixture cannot declare both HTTP fields and a group list",
            ));
        }
        if let Some(members) = &self.fixtures {
            if members.is_empty() {
                return Err(Error::invalid_fixture(&self.name, "group list cannot be empty"));
            }
            if members.iter().any(|m| m.trim().is_empty()) {
                return Err(Error::invalid_fixture(
                    &self.name,
                    "group list contains an empty name",
                ));
            }
        }
        if matches!(&self.based_on, Some(parent) if parent.trim().is_empty()) {
            return Err(Error::invalid_fixture(&self.name, "basedOn cannot be empty"));
        }
        Ok(())
    }

    /// Checks a fully materialized row is ready to execute.
    pub fn validate_executable(&self) -> Result<()> {
        self.validate_shape()?;
        if self.is_group() {
            return Ok(());
        }
        let method = self
            .method
            .as_deref()
            .ok_or_else(|| Error::invalid_fixture(&self.name, "missing method"))?;
        // Methods may be templated; only literal ones are checked here.
        if !method.contains("{{") {
            method
                .parse::<HttpMethod>()
                .map_err(|e| Error::invalid_fixture(&self.name, e.to_string()))?;
        }
        match self.endpoint.as_deref() {
            Some(endpoint) if !endpoint.trim().is_empty() => Ok(()),
            _ => Err(Error::invalid_fixture(&self.name, "missing endpoint")),
        }
    }
}

/// HTTP verbs a fixture can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Methods that carry a CSRF token when CSRF protection is configured
    pub fn is_state_changing(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch | Self::Delete)
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(Error::invalid_input(format!("unsupported HTTP method '{other}'"))),
        }
    }
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
