//! HTTP client implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, error};

use crate::errors::AgentError;
use crate::http::status::check_status;

/// Remote fetch channel
///
/// Gateway calls are relative to the configured base URL; artifact downloads
/// take absolute CDN URLs.
#[async_trait]
pub trait RemoteFetch: Send + Sync {
    /// GET a gateway endpoint and return the raw body text
    async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String, AgentError>;

    /// Download a text artifact
    async fn fetch_text(&self, url: &str) -> Result<String, AgentError>;

    /// Download a binary artifact
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, AgentError>;
}

/// HTTP client for gateway and CDN communication
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("signage-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, AgentError> {
        let response = request.send().await?;
        let status = response.status();

        if let Err(e) = check_status(Some(status.as_u16()), context) {
            let body = response.text().await.unwrap_or_default();
            error!("{} failed: {} - {}", context, status, body);
            return Err(e);
        }

        Ok(response)
    }
}

#[async_trait]
impl RemoteFetch for HttpClient {
    async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String, AgentError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let request = self.client.get(&url).query(query);
        let response = self.send(request, &format!("GET {}", path)).await?;
        Ok(response.text().await?)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, AgentError> {
        debug!("GET {} (text)", url);

        let response = self.send(self.client.get(url), &format!("GET {}", url)).await?;
        Ok(response.text().await?)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, AgentError> {
        debug!("GET {} (binary)", url);

        let response = self.send(self.client.get(url), &format!("GET {}", url)).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
