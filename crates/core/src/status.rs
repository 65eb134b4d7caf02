//! Expected response statuses.
//!
//! A fixture's `expectedStatus` accepts a literal code (`201`), a status
//! class (`2xx`), or a list of either; a response matches when any element
//! matches.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::error::{Error, Result};

/// One element of an expected status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusMatcher {
    /// Exact status code
    Exact(u16),
    /// Status class, the leading digit (`2` for `2xx`)
    Class(u8),
}

impl StatusMatcher {
    /// Parse a textual matcher: `404`, `2xx`, `4XX`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let bytes = text.as_bytes();
        if bytes.len() == 3
            && bytes[1].eq_ignore_ascii_case(&b'x')
            && bytes[2].eq_ignore_ascii_case(&b'x')
        {
            return match bytes[0] {
                b'1'..=b'5' => Ok(Self::Class(bytes[0] - b'0')),
                _ => Err(Error::invalid_input(format!(
                    "status class must match [1-5]xx, got '{text}'"
                ))),
            };
        }
        let code = text
            .parse::<u16>()
            .map_err(|_| Error::invalid_input(format!("invalid expected status '{text}'")))?;
        Self::exact(code)
    }

    /// Exact matcher for a code in the 100..=599 range.
    pub fn exact(code: u16) -> Result<Self> {
        if !(100..=599).contains(&code) {
            return Err(Error::invalid_input(format!(
                "status code out of range: {code}"
            )));
        }
        Ok(Self::Exact(code))
    }

    pub fn matches(&self, status: u16) -> bool {
        match *self {
            Self::Exact(code) => code == status,
            Self::Class(class) => status / 100 == u16::from(class),
        }
    }
}

impl Display for StatusMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(code) => write!(f, "{code}"),
            Self::Class(class) => write!(f, "{class}xx"),
        }
    }
}

/// Raw YAML shape of a single matcher
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMatcher {
    Code(u16),
    Text(String),
}

/// Raw YAML shape of a whole expectation
#[derive(Deserialize)]
#[serde(untagged)]
enum RawExpectedStatus {
    One(RawMatcher),
    Many(Vec<RawMatcher>),
}

impl TryFrom<RawMatcher> for StatusMatcher {
    type Error = Error;

    fn try_from(raw: RawMatcher) -> Result<Self> {
        match raw {
            RawMatcher::Code(code) => StatusMatcher::exact(code),
            RawMatcher::Text(text) => StatusMatcher::parse(&text),
        }
    }
}

/// Expected status with "any element matches" semantics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawExpectedStatus")]
pub struct ExpectedStatus(Vec<StatusMatcher>);

impl TryFrom<RawExpectedStatus> for ExpectedStatus {
    type Error = Error;

    fn try_from(raw: RawExpectedStatus) -> Result<Self> {
        let matchers = match raw {
            RawExpectedStatus::One(one) => vec![StatusMatcher::try_from(one)?],
            RawExpectedStatus::Many(many) => many
                .into_iter()
                .map(StatusMatcher::try_from)
                .collect::<Result<Vec<_>>>()?,
        };
        Self::new(matchers)
    }
}

impl ExpectedStatus {
    pub fn new(matchers: Vec<StatusMatcher>) -> Result<Self> {
        if matchers.is_empty() {
            return Err(Error::invalid_input("expected status list cannot be empty"));
        }
        Ok(Self(matchers))
    }

    /// The implicit expectation of a fixture without `expectedStatus`.
    pub fn any_success() -> Self {
        Self(vec![StatusMatcher::Class(2)])
    }

    pub fn matchers(&self) -> &[StatusMatcher] {
        &self.0
    }

    pub fn matches(&self, status: u16) -> bool {
        self.0.iter().any(|m| m.matches(status))
    }
}

impl Display for ExpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{single}"),
            many => {
                let parts: Vec<String> = many.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl Serialize for ExpectedStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;

        fn element(m: &StatusMatcher) -> serde_json::Value {
            match m {
                StatusMatcher::Exact(code) => serde_json::Value::from(*code),
                StatusMatcher::Class(_) => serde_json::Value::from(m.to_string()),
            }
        }

        match self.0.as_slice() {
            [single] => element(single).serialize(serializer),
            many => {
                let mut seq = serializer.serialize_seq(Some(many.len()))?;
                for m in many {
                    seq.serialize_element(&element(m))?;
                }
                seq.end()
            }
        }
    }
}
