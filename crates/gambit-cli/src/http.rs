//! HTTP client for the listing, snapshot and computation endpoints.

use std::time::Duration;

use async_trait::async_trait;
use gambit_core::{HttpClient, HttpError, HttpMethod, HttpRequest};
use reqwest::header::CONTENT_TYPE;
use tracing::trace;

/// [`HttpClient`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    /// Client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttp {
    async fn execute(&self, request: HttpRequest) -> Result<String, HttpError> {
        trace!(method = %request.method, url = %request.url, "http request");
        let builder = match request.method {
            HttpMethod::Get => self.client.get(request.url),
            HttpMethod::Post => self
                .client
                .post(request.url)
                .header(CONTENT_TYPE, "application/json")
                .body(request.body.unwrap_or_default()),
        };
        let response = builder.send().await.map_err(|e| HttpError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status(status.as_u16()));
        }
        response.text().await.map_err(|e| HttpError::Transport(e.to_string()))
    }
}
