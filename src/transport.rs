//! HTTP transport seam for the generative endpoint.
//!
//! The inference stage never talks to `reqwest` directly. It goes through the
//! [`Transport`] trait so tests can script exact response sequences (429, 429,
//! 200 …) and library users can add their own middleware (proxies, request
//! logging, recorded fixtures).
//!
//! A transport only moves bytes: it returns every HTTP response it receives,
//! whatever the status, and reports [`CallError::Transport`] only when no
//! response arrived at all. Status classification belongs to
//! [`crate::pipeline::retry`].

use crate::error::CallError;
use futures::future::BoxFuture;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// A raw HTTP response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one JSON POST to the endpoint.
pub trait Transport: Send + Sync {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        api_key: &'a str,
        body: &'a Value,
    ) -> BoxFuture<'a, Result<HttpReply, CallError>>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
///
/// The API key travels in the `x-goog-api-key` header rather than the query
/// string so it never appears in proxy or request logs.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `timeout_secs`.
    pub fn new(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool, custom TLS, …).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        api_key: &'a str,
        body: &'a Value,
    ) -> BoxFuture<'a, Result<HttpReply, CallError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(url)
                .header("x-goog-api-key", api_key)
                .json(body)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        CallError::Transport(format!("request timed out: {e}"))
                    } else {
                        CallError::Transport(e.to_string())
                    }
                })?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| CallError::Transport(format!("failed to read response body: {e}")))?;

            debug!("POST {} → HTTP {} ({} bytes)", url, status, body.len());
            Ok(HttpReply { status, body })
        })
    }
}
