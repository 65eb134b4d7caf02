//! In-process executor with a fixed route table
//!
//! Routes match on method and path. A path segment `*` matches any single
//! segment, so `/api/pets/*` answers `/api/pets/42`. Unmatched requests get a
//! 404. Every request is recorded for later assertions.

use async_trait::async_trait;
use moxter_core::error::Result;
use moxter_core::model::HttpMethod;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use super::{HttpExecutor, HttpRequest, RawResponse};

type Handler = Box<dyn Fn(&HttpRequest) -> RawResponse + Send + Sync>;

struct Route {
    method: HttpMethod,
    segments: Vec<String>,
    handler: Handler,
}

impl Route {
    fn matches(&self, method: HttpMethod, path: &str) -> bool {
        if self.method != method {
            return false;
        }
        let actual = split_path(path);
        actual.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(&actual)
                .all(|(expected, got)| expected == "*" || expected == got)
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Route-table executor standing in for a server
#[derive(Default)]
pub struct StubExecutor {
    routes: Vec<Route>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler; earlier routes win when several match.
    pub fn route<F>(mut self, method: HttpMethod, path: &str, handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> RawResponse + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method,
            segments: split_path(path),
            handler: Box::new(handler),
        });
        self
    }

    /// Registers a route that always answers with the same JSON body.
    pub fn json(self, method: HttpMethod, path: &str, status: u16, body: Value) -> Self {
        self.route(method, path, move |_| RawResponse::json(status, &body))
    }

    /// Registers a route that always answers with an empty body.
    pub fn status(self, method: HttpMethod, path: &str, status: u16) -> Self {
        self.route(method, path, move |_| RawResponse::new(status))
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Most recent request whose path equals `path`
    pub fn last_request_to(&self, path: &str) -> Option<HttpRequest> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.path() == path)
    }
}

#[async_trait]
impl HttpExecutor for StubExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse> {
        let response = self
            .routes
            .iter()
            .find(|route| route.matches(request.method, request.path()))
            .map(|route| (route.handler)(&request))
            .unwrap_or_else(|| RawResponse::new(404).with_body("no stub route"));

        debug!(
            method = %request.method,
            path = request.path(),
            status = response.status,
            "Stub handled request"
        );
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        Ok(response)
    }
}
