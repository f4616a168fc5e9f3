//! Local, CDN, bundled-default cascade
//!
//! Content artifacts are served from the local cache when present, otherwise
//! fetched from the CDN, otherwise taken from the bundled defaults. Each tier
//! is tried once; whatever a remote tier yields becomes the new local copy.

use tracing::{debug, info, warn};

use crate::errors::AgentError;
use crate::http::client::RemoteFetch;
use crate::storage::artifacts::ArtifactStore;

/// Tier that produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSource {
    Local,
    Cdn,
    Bundled,
}

/// One artifact to resolve
#[derive(Debug, Clone)]
pub struct CascadeRequest {
    /// Name of the artifact on the CDN and in the bundled defaults
    pub file_name: String,

    /// Key of the local copy
    pub local_key: String,

    /// CDN location, if the configuration provides one
    pub cdn_url: Option<String>,
}

/// Sources consulted by the cascade
pub struct Cascade<'a> {
    pub local: &'a dyn ArtifactStore,
    pub bundled: &'a dyn ArtifactStore,
    pub fetch: &'a dyn RemoteFetch,
}

impl Cascade<'_> {
    /// Resolve an artifact, accepting content only if `accept` passes
    pub async fn resolve<F>(
        &self,
        request: &CascadeRequest,
        accept: F,
    ) -> Result<(String, ArtifactSource), AgentError>
    where
        F: Fn(&str) -> Result<(), AgentError>,
    {
        match self.local.read_string(&request.local_key).await {
            Ok(text) => match accept(&text) {
                Ok(()) => return Ok((text, ArtifactSource::Local)),
                Err(e) => warn!("Cached {} is unusable: {}", request.local_key, e),
            },
            Err(e) => debug!("{} not cached: {}", request.local_key, e),
        }

        match &request.cdn_url {
            Some(url) => match self.fetch.fetch_text(url).await {
                Ok(text) => match accept(&text) {
                    Ok(()) => {
                        self.cache(&request.local_key, &text).await;
                        info!("Fetched {} from CDN", request.file_name);
                        return Ok((text, ArtifactSource::Cdn));
                    }
                    Err(e) => warn!("CDN copy of {} is unusable: {}", request.file_name, e),
                },
                Err(e) => warn!("CDN fetch of {} failed: {}", url, e),
            },
            None => warn!("No CDN location for {}", request.file_name),
        }

        let text = self
            .bundled
            .read_string(&request.file_name)
            .await
            .map_err(|e| {
                AgentError::NotFound(format!(
                    "{} is not cached, not on the CDN, and not bundled: {}",
                    request.file_name, e
                ))
            })?;
        accept(&text)?;

        self.cache(&request.local_key, &text).await;
        info!("Using bundled default for {}", request.file_name);
        Ok((text, ArtifactSource::Bundled))
    }

    async fn cache(&self, key: &str, text: &str) {
        if let Err(e) = self.local.write(key, text.as_bytes()).await {
            warn!("Failed to cache {}: {}", key, e);
        }
    }
}

/// Accept only text that parses as JSON
pub fn accept_json(text: &str) -> Result<(), AgentError> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|_| ())
        .map_err(|e| AgentError::ParseError(e.to_string()))
}

/// Accept any text
pub fn accept_any(_text: &str) -> Result<(), AgentError> {
    Ok(())
}
