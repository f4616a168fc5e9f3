//! Update orchestration
//!
//! One cycle fetches the candidate configuration, applies the content floor,
//! compares it with the installed configuration and, once the update is
//! accepted, walks the stages in order. Stage failures other than writing the
//! configuration file are logged and the chain moves on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gateway_api::models::SystemConfiguration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::store::ConfigStore;
use crate::errors::AgentError;
use crate::http::client::RemoteFetch;
use crate::http::gateway;
use crate::storage::artifacts::ArtifactStore;
use crate::storage::layout::ArtifactKeys;
use crate::update::changes::{app_changed, changed_fields, cms_changed, css_changed};
use crate::update::confirm::Confirm;
use crate::update::installer::Installer;
use crate::update::stage::{CycleOutcome, Step, UpdateStage};
use crate::update::version::apply_content_floor;
use crate::utils::sha256_hash;

/// Prompt shown before any stage runs
pub const UPDATE_PROMPT: &str = "A new configuration is available. Update now?";

/// Prompt shown before the configuration file is replaced
pub const SYSTEM_CONFIG_PROMPT: &str = "Replace the saved device configuration?";

/// Orchestrator options
#[derive(Debug, Clone)]
pub struct Options {
    /// Version of the installed app, used for the content floor
    pub installed_app_version: String,

    /// Ask again before writing the configuration file
    pub confirm_system_config: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            installed_app_version: env!("CARGO_PKG_VERSION").to_string(),
            confirm_system_config: false,
        }
    }
}

/// Last finished cycle
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub outcome: Option<CycleOutcome>,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl UpdateReport {
    /// Report for a cycle that just finished
    pub fn from_result(result: &Result<CycleOutcome, AgentError>) -> Self {
        Self {
            outcome: result.as_ref().ok().copied(),
            error: result.as_ref().err().map(|e| e.to_string()),
            checked_at: Utc::now(),
        }
    }
}

/// Runs update cycles for one device
pub struct UpdateOrchestrator {
    serial: String,
    options: Options,
    fetch: Arc<dyn RemoteFetch>,
    artifacts: Arc<dyn ArtifactStore>,
    config: Arc<ConfigStore>,
    confirm: Arc<dyn Confirm>,
    installer: Arc<dyn Installer>,
    in_flight: AtomicBool,
    last_report: RwLock<Option<UpdateReport>>,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl UpdateOrchestrator {
    pub fn new(
        serial: String,
        options: Options,
        fetch: Arc<dyn RemoteFetch>,
        artifacts: Arc<dyn ArtifactStore>,
        config: Arc<ConfigStore>,
        confirm: Arc<dyn Confirm>,
        installer: Arc<dyn Installer>,
    ) -> Self {
        Self {
            serial,
            options,
            fetch,
            artifacts,
            config,
            confirm,
            installer,
            in_flight: AtomicBool::new(false),
            last_report: RwLock::new(None),
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Most recent cycle, if any has finished
    pub async fn last_report(&self) -> Option<UpdateReport> {
        self.last_report.read().await.clone()
    }

    /// Run one update cycle.
    ///
    /// Returns `AlreadyRunning` without side effects while another cycle is
    /// in progress. A candidate that cannot be fetched or decoded aborts the
    /// cycle with an error; so does a failure to persist the configuration.
    pub async fn run_update_check(&self) -> Result<CycleOutcome, AgentError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            info!("Update check already in progress");
            return Ok(CycleOutcome::AlreadyRunning);
        }
        let _guard = InFlight(&self.in_flight);

        let result = self.run_cycle().await;
        match &result {
            Ok(outcome) => info!("Update check finished: {}", outcome),
            Err(e) => error!("Update check aborted: {}", e),
        }

        *self.last_report.write().await = Some(UpdateReport::from_result(&result));
        result
    }

    async fn run_cycle(&self) -> Result<CycleOutcome, AgentError> {
        let mut candidate = gateway::fetch_device_setting(self.fetch.as_ref(), &self.serial).await?;
        apply_content_floor(&self.options.installed_app_version, &mut candidate.cms_info);

        let installed = self.config.current().await.unwrap_or_default();
        let changed = changed_fields(&candidate, &installed);
        if changed.is_empty() {
            debug!("Configuration is up to date");
            return Ok(CycleOutcome::UpToDate);
        }

        let names: Vec<String> = changed.iter().map(|f| f.to_string()).collect();
        info!("Configuration changed: {}", names.join(", "));

        if !self.confirm.confirm(UPDATE_PROMPT).await {
            info!("Update declined");
            return Ok(CycleOutcome::Declined);
        }

        let mut step = Step::Next(UpdateStage::SystemConfig);
        loop {
            match step {
                Step::Next(stage) => {
                    debug!("Running stage {}", stage);
                    step = self.run_stage(stage, &candidate, &installed).await?;
                }
                Step::Done(outcome) => return Ok(outcome),
            }
        }
    }

    async fn run_stage(
        &self,
        stage: UpdateStage,
        candidate: &SystemConfiguration,
        installed: &SystemConfiguration,
    ) -> Result<Step, AgentError> {
        match stage {
            UpdateStage::SystemConfig => {
                self.save_system_config(candidate).await?;
            }
            UpdateStage::CmsData => {
                if cms_changed(candidate, installed) {
                    if let Err(e) = self.refresh_cms(candidate).await {
                        warn!("CMS refresh failed, continuing: {}", e);
                    }
                }
            }
            UpdateStage::StyleCss => {
                if css_changed(candidate, installed) {
                    if let Err(e) = self.refresh_css(candidate).await {
                        warn!("Stylesheet refresh failed, continuing: {}", e);
                    }
                }
            }
            UpdateStage::App => {
                if app_changed(candidate, installed) {
                    return Ok(Step::Done(self.refresh_app(candidate).await));
                }
                self.config.promote(candidate.clone()).await;
            }
        }
        Ok(Step::after(stage))
    }

    async fn save_system_config(&self, candidate: &SystemConfiguration) -> Result<(), AgentError> {
        if self.options.confirm_system_config && !self.confirm.confirm(SYSTEM_CONFIG_PROMPT).await {
            info!("Keeping the saved configuration file");
            return Ok(());
        }

        let key = ArtifactKeys::system_config(&self.serial);
        let body = serde_json::to_vec_pretty(candidate)?;
        self.artifacts.write(&key, &body).await?;
        info!("Saved configuration to {}", key);
        Ok(())
    }

    async fn refresh_cms(&self, candidate: &SystemConfiguration) -> Result<(), AgentError> {
        let (file_name, url) = locate(
            candidate.cms_info.cms_file_name.as_deref(),
            candidate.cms_url(),
            "CMS document",
        )?;

        let text = self.fetch.fetch_text(&url).await?;
        let cms: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| AgentError::ParseError(format!("{}: {}", file_name, e)))?;

        self.artifacts
            .write(&ArtifactKeys::cms(file_name), text.as_bytes())
            .await?;
        self.config.set_cms(cms).await;

        info!("CMS document {} updated", file_name);
        Ok(())
    }

    async fn refresh_css(&self, candidate: &SystemConfiguration) -> Result<(), AgentError> {
        let (file_name, url) = locate(
            candidate.cms_info.css_file_name.as_deref(),
            candidate.css_url(),
            "stylesheet",
        )?;

        let css = self.fetch.fetch_text(&url).await?;
        let key = ArtifactKeys::css(file_name);
        self.artifacts.write(&key, css.as_bytes()).await?;

        if !self.artifacts.exists(&key).await {
            return Err(AgentError::StorageError(format!("{} missing after write", key)));
        }
        self.config.set_css(css).await;

        info!("Stylesheet {} updated", file_name);
        Ok(())
    }

    async fn refresh_app(&self, candidate: &SystemConfiguration) -> CycleOutcome {
        match self.download_and_install(candidate).await {
            Ok(()) => CycleOutcome::InstallTriggered,
            Err(e) => {
                warn!("App update failed: {}", e);
                CycleOutcome::AppDownloadFailed
            }
        }
    }

    async fn download_and_install(&self, candidate: &SystemConfiguration) -> Result<(), AgentError> {
        let (file_name, url) = locate(
            candidate.app_info.app_file_name.as_deref(),
            candidate.app_url(),
            "app binary",
        )?;

        let bytes = self.fetch.fetch_bytes(&url).await?;
        let key = ArtifactKeys::app(file_name);
        self.artifacts.write(&key, &bytes).await?;
        info!(
            "Downloaded {} ({} bytes, sha256 {})",
            file_name,
            bytes.len(),
            sha256_hash(&bytes)
        );

        let installed = self.installer.install(&self.artifacts.locate(&key)).await;

        if let Err(e) = self.artifacts.remove(&key).await {
            warn!("Failed to remove {}: {}", key, e);
        }
        installed
    }
}

fn locate<'a>(
    file_name: Option<&'a str>,
    url: Option<String>,
    what: &str,
) -> Result<(&'a str, String), AgentError> {
    match (file_name.filter(|f| !f.is_empty()), url) {
        (Some(file_name), Some(url)) => Ok((file_name, url)),
        _ => Err(AgentError::ConfigError(format!("no CDN location for the {}", what))),
    }
}
