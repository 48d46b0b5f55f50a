//! reqwest-backed transport
//!
//! Joins the configured base URL with each request path, applies the
//! per-request timeout, and returns the response verbatim (including error
//! status codes from the server).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::{ApiRequest, ApiResponse, Result, Transport, TransportError};

/// Transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a request path.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    #[instrument(skip_all, fields(method = %request.method, path = %request.route()))]
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request.path);

        let mut builder = self
            .client
            .request(request.method, &url)
            .headers(request.headers)
            .timeout(self.timeout);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(error = %e, timeout_secs = self.timeout.as_secs(), "request timed out");
                TransportError::Timeout(format!("{url} after {}s", self.timeout.as_secs()))
            } else if e.is_connect() {
                warn!(error = %e, "connection failed");
                TransportError::Connect(e.to_string())
            } else {
                warn!(error = %e, "request failed");
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(format!("reading body of {url}"))
            } else {
                TransportError::Body(e.to_string())
            }
        })?;

        debug!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + '_>> {
        Box::pin(self.execute(request))
    }
}
