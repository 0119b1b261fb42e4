use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Serialize;

use crate::models::{
    IndexConfig, IndexSummary, ScanConfig, ScanResult, TestAtRequest, TestAtResult,
};

/// HTTP client backend that delegates scan and index operations to a
/// running `specscan` daemon.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a new HTTP backend targeting the given base URL
    /// (e.g. "http://127.0.0.1:7878").
    pub fn new<S: Into<String>>(base_url: S) -> Result<Self> {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Execute a scan via `POST /v1/scan`.
    pub fn scan(&self, config: ScanConfig) -> Result<ScanResult> {
        self.post_json("/v1/scan", &config)
    }

    /// Resolve a position via `POST /v1/test-at`.
    pub fn test_at(&self, request: TestAtRequest) -> Result<TestAtResult> {
        self.post_json("/v1/test-at", &request)
    }

    /// Execute an index operation via `POST /v1/index`.
    pub fn index(&self, config: IndexConfig) -> Result<IndexSummary> {
        self.post_json("/v1/index", &config)
    }

    /// Execute an index introspection via `POST /v1/index/info`.
    pub fn index_info(&self, config: IndexConfig) -> Result<IndexSummary> {
        self.post_json("/v1/index/info", &config)
    }

    fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize,
        R: serde::de::DeserializeOwned,
    {
        let url = self.url_for(path);
        tracing::debug!(%url, "delegating to server");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .with_context(|| format!("failed to send request to {url}"))?
            .error_for_status()
            .with_context(|| format!("server returned error for {url}"))?;

        response
            .json::<R>()
            .context("failed to decode JSON response from server")
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
