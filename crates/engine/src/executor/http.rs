//! `reqwest`-backed executor for live servers

use async_trait::async_trait;
use moxter_core::config::HttpConfig;
use moxter_core::error::{Error, Result};
use moxter_core::model::HttpMethod;
use reqwest::{Client, Method};
use tracing::{debug, info};

use super::{Credentials, HttpExecutor, HttpRequest, RawResponse, RequestBody};

/// Sends requests to a running server
pub struct ReqwestExecutor {
    client: Client,
    base_url: String,
}

impl ReqwestExecutor {
    /// Create a new executor
    ///
    /// # Arguments
    /// * `config` - HTTP configuration carrying the base URL and timeout
    pub fn new(config: &HttpConfig) -> Result<Self> {
        info!("Initializing HTTP executor");
        info!("  Base URL: {}", config.base_url);
        info!("  Timeout: {}s", config.timeout_secs);

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins a relative endpoint onto the base URL; absolute URLs pass through.
    pub fn absolute_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse> {
        let url = self.absolute_url(&request.url);
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.credentials {
            Some(Credentials::Bearer(token)) => builder.bearer_auth(token),
            Some(Credentials::Basic { username, password }) => {
                builder.basic_auth(username, Some(password))
            }
            None => builder,
        };
        // Content-Type is already among the headers for JSON bodies
        if let Some(body) = request.body.as_ref().map(RequestBody::to_text) {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::http(format!("{} {url} failed: {e}", request.method)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response body from {url}: {e}")))?;

        debug!(status, bytes = body.len(), "Received response");
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
