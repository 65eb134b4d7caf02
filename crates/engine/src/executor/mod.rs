//! HTTP execution seam
//!
//! The engine hands a fully resolved [`HttpRequest`] to an [`HttpExecutor`]
//! and gets a [`RawResponse`] back. Two executors ship with the crate: a
//! `reqwest` client for live servers and an in-process stub for tests.

use async_trait::async_trait;
use moxter_core::error::Result;
use moxter_core::model::HttpMethod;
use serde_json::Value;

mod http;
mod stub;

pub use http::ReqwestExecutor;
pub use stub::StubExecutor;

/// Request body after payload resolution and templating
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
}

impl RequestBody {
    /// Body bytes as sent on the wire
    pub fn to_text(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

/// Credentials the executor attaches in its own wire format
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Basic { username: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(***REDACTED***)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***REDACTED***")
                .finish(),
        }
    }
}

/// A fully resolved request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Endpoint including the encoded query string; relative or absolute
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub credentials: Option<Credentials>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            credentials: None,
            body: None,
        }
    }

    /// First header value with a case-insensitive name match
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Path part of the URL, without scheme, host or query
    pub fn path(&self) -> &str {
        let without_query = self.url.split(['?', '#']).next().unwrap_or_default();
        match without_query.find("://") {
            Some(idx) => {
                let rest = &without_query[idx + 3..];
                rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
            }
            None => without_query,
        }
    }

    /// Decoded query parameters, in order
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        match self.url.split_once('?') {
            Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            None => Vec::new(),
        }
    }
}

/// What an executor returns: status, headers and body text
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// Executes resolved requests
///
/// Implementations only perform I/O; status checks, extraction and variable
/// handling stay in the engine.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse>;
}
