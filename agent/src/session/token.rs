//! Session token minting

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::errors::AgentError;
use crate::http::client::RemoteFetch;
use crate::http::gateway;

/// Mints a fresh session token for every connect
#[async_trait]
pub trait SessionTokenSource: Send + Sync {
    async fn mint(&self) -> Result<SecretString, AgentError>;
}

/// Mints tokens from the gateway, keyed by device serial
pub struct GatewayTokenSource {
    fetch: Arc<dyn RemoteFetch>,
    serial: String,
}

impl GatewayTokenSource {
    pub fn new(fetch: Arc<dyn RemoteFetch>, serial: String) -> Self {
        Self { fetch, serial }
    }
}

#[async_trait]
impl SessionTokenSource for GatewayTokenSource {
    async fn mint(&self) -> Result<SecretString, AgentError> {
        gateway::fetch_ws_token(self.fetch.as_ref(), &self.serial).await
    }
}
