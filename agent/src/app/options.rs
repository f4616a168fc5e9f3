//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::session::client;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::update::orchestrator;
use crate::utils::CooldownOptions;
use crate::workers::updater;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Gateway base URL
    pub gateway_base_url: String,

    /// Timeout applied to every HTTP call
    pub request_timeout: Duration,

    /// Storage configuration
    pub storage: StorageOptions,

    /// Enable local HTTP server
    pub enable_server: bool,

    /// Enable periodic update checks
    pub enable_updater: bool,

    /// Enable the live session
    pub enable_session: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Updater worker options
    pub updater: updater::Options,

    /// Update orchestration options
    pub orchestrator: orchestrator::Options,

    /// Answer to the update prompt when unattended
    pub auto_accept: bool,

    /// Installer invoked with the downloaded app path appended
    pub installer_command: Vec<String>,

    /// Live session options
    pub session: SessionOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            gateway_base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            storage: StorageOptions::default(),
            enable_server: true,
            enable_updater: true,
            enable_session: true,
            server: ServerOptions::default(),
            updater: updater::Options::default(),
            orchestrator: orchestrator::Options::default(),
            auto_accept: true,
            installer_command: vec!["signage-install".to_string()],
            session: SessionOptions::default(),
        }
    }
}

impl AppOptions {
    /// Build options from the settings file
    pub fn from_settings(layout: StorageLayout, settings: &Settings) -> Self {
        let defaults = orchestrator::Options::default();

        Self {
            lifecycle: LifecycleOptions::default(),
            gateway_base_url: settings.gateway.base_url.clone(),
            request_timeout: Duration::from_secs(settings.gateway.request_timeout_secs),
            storage: StorageOptions {
                layout,
                app_folder: settings.storage.app_folder.clone(),
                bundled_dir: settings.storage.bundled_dir.clone(),
            },
            enable_server: settings.server.enabled,
            enable_updater: settings.updater.enabled,
            enable_session: settings.session.enabled,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            updater: updater::Options {
                interval: Duration::from_secs(settings.updater.interval_secs),
                initial_delay: Duration::from_secs(settings.updater.initial_delay_secs),
            },
            orchestrator: orchestrator::Options {
                installed_app_version: settings
                    .updater
                    .installed_app_version
                    .clone()
                    .unwrap_or(defaults.installed_app_version),
                confirm_system_config: settings.updater.confirm_system_config,
            },
            auto_accept: settings.updater.auto_accept,
            installer_command: settings.updater.installer_command.clone(),
            session: SessionOptions {
                ws_url: settings.session.ws_url.clone(),
                primary_id: settings.session.primary_id.clone(),
                secondary_id: settings.session.secondary_id.clone(),
                heartbeat_interval: Duration::from_secs(settings.session.heartbeat_secs),
                client: client::Options {
                    backoff: CooldownOptions {
                        base_delay: Duration::from_millis(settings.session.base_delay_ms),
                        max_delay: Duration::from_millis(settings.session.max_delay_ms),
                        multiplier: 2,
                    },
                    connect_timeout: Duration::from_secs(settings.session.connect_timeout_secs),
                    ..Default::default()
                },
            },
        }
    }
}

/// Lifecycle options for the agent
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Storage configuration options
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Storage layout paths
    pub layout: StorageLayout,

    /// Folder holding synchronized artifacts
    pub app_folder: String,

    /// Bundled defaults, when not under the storage root
    pub bundled_dir: Option<PathBuf>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            layout: StorageLayout::default(),
            app_folder: "kiosk".to_string(),
            bundled_dir: None,
        }
    }
}

/// Live session options
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// WebSocket endpoint; derived from the gateway URL when absent
    pub ws_url: Option<String>,

    /// Attendance identifier, defaults to the device serial
    pub primary_id: Option<String>,

    pub secondary_id: Option<String>,

    pub heartbeat_interval: Duration,

    pub client: client::Options,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ws_url: None,
            primary_id: None,
            secondary_id: None,
            heartbeat_interval: Duration::from_secs(60),
            client: client::Options::default(),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
