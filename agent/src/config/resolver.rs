//! Configuration resolution at startup

use std::sync::Arc;

use gateway_api::models::SystemConfiguration;
use tracing::{info, warn};

use crate::config::cascade::{accept_any, accept_json, ArtifactSource, Cascade, CascadeRequest};
use crate::config::store::ConfigStore;
use crate::errors::AgentError;
use crate::http::client::RemoteFetch;
use crate::http::gateway;
use crate::storage::artifacts::ArtifactStore;
use crate::storage::layout::ArtifactKeys;

/// Loads the installed configuration and the content it points at
pub struct ConfigResolver {
    artifacts: Arc<dyn ArtifactStore>,
    bundled: Arc<dyn ArtifactStore>,
    fetch: Arc<dyn RemoteFetch>,
    config: Arc<ConfigStore>,
}

impl ConfigResolver {
    pub fn new(
        artifacts: Arc<dyn ArtifactStore>,
        bundled: Arc<dyn ArtifactStore>,
        fetch: Arc<dyn RemoteFetch>,
        config: Arc<ConfigStore>,
    ) -> Self {
        Self {
            artifacts,
            bundled,
            fetch,
            config,
        }
    }

    /// Load the device configuration from the local copy, or from the
    /// gateway when the local copy is missing or unreadable.
    ///
    /// A gateway failure is returned as is; there is no retry at this layer.
    pub async fn load_configuration(&self, serial: &str) -> Result<SystemConfiguration, AgentError> {
        let key = ArtifactKeys::system_config(serial);

        match self.read_local(&key).await {
            Ok(config) => {
                info!("Loaded configuration from {}", key);
                self.config.install(config.clone()).await;
                return Ok(config);
            }
            Err(e) => warn!("Local configuration unavailable ({}), asking the gateway", e),
        }

        let config = gateway::fetch_device_setting(self.fetch.as_ref(), serial).await?;

        let body = serde_json::to_vec_pretty(&config)?;
        self.artifacts.write(&key, &body).await?;
        info!("Configuration for {} fetched and saved", serial);

        self.config.install(config.clone()).await;
        Ok(config)
    }

    async fn read_local(&self, key: &str) -> Result<SystemConfiguration, AgentError> {
        let text = self.artifacts.read_string(key).await?;
        serde_json::from_str(&text).map_err(|e| AgentError::ParseError(format!("{}: {}", key, e)))
    }

    /// Resolve the CMS document named by the configuration
    pub async fn load_cms(
        &self,
        config: &SystemConfiguration,
    ) -> Result<(serde_json::Value, ArtifactSource), AgentError> {
        let file_name = required(config.cms_info.cms_file_name.as_deref(), "cmsFileName")?;
        let request = CascadeRequest {
            file_name: file_name.to_string(),
            local_key: ArtifactKeys::cms(file_name),
            cdn_url: config.cms_url(),
        };

        let (text, source) = self.cascade().resolve(&request, accept_json).await?;
        let cms: serde_json::Value = serde_json::from_str(&text)?;
        self.config.set_cms(cms.clone()).await;

        Ok((cms, source))
    }

    /// Resolve the stylesheet named by the configuration
    pub async fn load_css(
        &self,
        config: &SystemConfiguration,
    ) -> Result<(String, ArtifactSource), AgentError> {
        let file_name = required(config.cms_info.css_file_name.as_deref(), "cssFileName")?;
        let request = CascadeRequest {
            file_name: file_name.to_string(),
            local_key: ArtifactKeys::css(file_name),
            cdn_url: config.css_url(),
        };

        let (css, source) = self.cascade().resolve(&request, accept_any).await?;
        self.config.set_css(css.clone()).await;

        Ok((css, source))
    }

    fn cascade(&self) -> Cascade<'_> {
        Cascade {
            local: self.artifacts.as_ref(),
            bundled: self.bundled.as_ref(),
            fetch: self.fetch.as_ref(),
        }
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AgentError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AgentError::ConfigError(format!("configuration has no {}", field)))
}
