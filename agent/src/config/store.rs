//! Configuration store
//!
//! Owns the installed configuration and the content derived from it. The
//! orchestrator and resolvers receive it by `Arc`; whole-document
//! replacement goes through [`ConfigStore::promote`], which also announces a
//! reload to subscribers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use gateway_api::models::SystemConfiguration;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::info;

/// Why subscribers should reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadReason {
    /// An update cycle finished and its candidate is now installed
    ConfigurationApplied,
}

impl fmt::Display for ReloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadReason::ConfigurationApplied => write!(f, "configuration_applied"),
        }
    }
}

/// Reload signal
#[derive(Debug, Clone)]
pub struct ReloadEvent {
    pub generation: u64,
    pub reason: ReloadReason,
}

#[derive(Default)]
struct ConfigState {
    system: Option<SystemConfiguration>,
    cms: Option<Value>,
    css: Option<String>,
}

/// Installed configuration and content
pub struct ConfigStore {
    state: RwLock<ConfigState>,
    reload_tx: broadcast::Sender<ReloadEvent>,
    generation: AtomicU64,
}

impl ConfigStore {
    pub fn new() -> Self {
        let (reload_tx, _) = broadcast::channel(8);
        Self {
            state: RwLock::new(ConfigState::default()),
            reload_tx,
            generation: AtomicU64::new(0),
        }
    }

    /// Installed configuration, if one has been loaded
    pub async fn current(&self) -> Option<SystemConfiguration> {
        self.state.read().await.system.clone()
    }

    /// Set the configuration loaded at startup; no reload is announced
    pub async fn install(&self, config: SystemConfiguration) {
        self.state.write().await.system = Some(config);
    }

    /// Replace the installed configuration and announce a reload
    pub async fn promote(&self, config: SystemConfiguration) -> u64 {
        self.state.write().await.system = Some(config);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let event = ReloadEvent {
            generation,
            reason: ReloadReason::ConfigurationApplied,
        };
        // No subscribers is fine; the UI may not be attached yet.
        let _ = self.reload_tx.send(event);
        info!("Configuration promoted, reload generation {}", generation);
        generation
    }

    pub async fn cms(&self) -> Option<Value> {
        self.state.read().await.cms.clone()
    }

    pub async fn set_cms(&self, cms: Value) {
        self.state.write().await.cms = Some(cms);
    }

    pub async fn css(&self) -> Option<String> {
        self.state.read().await.css.clone()
    }

    pub async fn set_css(&self, css: String) {
        self.state.write().await.css = Some(css);
    }

    /// Number of reloads announced so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.reload_tx.subscribe()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
