//! HTTP client abstraction for testability.

use std::time::Duration;

use reqwest::Client;

use crate::error::{SyncError, SyncResult};
use crate::platform::BoxFuture;

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// URL of the final response, after redirects.
    pub url: String,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as lossy UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Trait for HTTP client operations.
///
/// Non-2xx statuses are returned as responses, not errors; only transport
/// failures are errors.
pub trait HttpClient: Send + Sync {
    /// Performs a GET request, following redirects.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, SyncResult<HttpResponse>>;

    /// Performs a POST with a JSON body.
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: &'a serde_json::Value,
    ) -> BoxFuture<'a, SyncResult<HttpResponse>>;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> SyncResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// The underlying reqwest client, for sharing its connection pool.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    async fn finish(url: &str, response: reqwest::Response) -> SyncResult<HttpResponse> {
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| SyncError::network(url, format!("failed to read response: {}", e)))?;

        Ok(HttpResponse {
            status,
            url: final_url,
            body: body.to_vec(),
        })
    }
}

impl HttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, SyncResult<HttpResponse>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| SyncError::network(url, e))?;
            Self::finish(url, response).await
        })
    }

    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: &'a serde_json::Value,
    ) -> BoxFuture<'a, SyncResult<HttpResponse>> {
        Box::pin(async move {
            let payload =
                serde_json::to_vec(body).map_err(|e| SyncError::network(url, e))?;
            let response = self
                .client
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload)
                .send()
                .await
                .map_err(|e| SyncError::network(url, e))?;
            Self::finish(url, response).await
        })
    }
}
