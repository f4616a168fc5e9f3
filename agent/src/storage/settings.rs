//! Settings file management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AgentError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Agent settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Also write a daily-rolling log file under the storage root
    #[serde(default)]
    pub log_to_file: bool,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Artifact storage configuration
    #[serde(default)]
    pub storage: StorageSettings,

    /// Update orchestration
    #[serde(default)]
    pub updater: UpdaterSettings,

    /// Live session
    #[serde(default)]
    pub session: SessionSettings,

    /// Local HTTP server
    #[serde(default)]
    pub server: ServerSettings,
}

impl Settings {
    /// Read settings, falling back to defaults when the file does not exist
    pub async fn load(file: &File) -> Result<Self, AgentError> {
        if !file.exists().await {
            info!("No settings at {:?}, using defaults", file.path());
            return Ok(Self::default());
        }
        file.read_json().await
    }
}

fn default_true() -> bool {
    true
}

/// Gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Base URL for gateway endpoints
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    /// Timeout applied to every HTTP call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_gateway_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Folder under the storage root holding synchronized artifacts
    #[serde(default = "default_app_folder")]
    pub app_folder: String,

    /// Directory of bundled default artifacts
    #[serde(default)]
    pub bundled_dir: Option<PathBuf>,
}

fn default_app_folder() -> String {
    "kiosk".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            app_folder: default_app_folder(),
            bundled_dir: None,
        }
    }
}

/// Updater settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterSettings {
    /// Run the periodic update check
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interval between checks in seconds
    #[serde(default = "default_update_interval")]
    pub interval_secs: u64,

    /// Delay before the first check in seconds
    #[serde(default = "default_update_initial_delay")]
    pub initial_delay_secs: u64,

    /// Answer to the "update now?" prompt when running unattended
    #[serde(default = "default_true")]
    pub auto_accept: bool,

    /// Ask again before overwriting the configuration file
    #[serde(default)]
    pub confirm_system_config: bool,

    /// Version of the installed app, defaults to the agent version
    #[serde(default)]
    pub installed_app_version: Option<String>,

    /// Installer invoked with the downloaded app path appended
    #[serde(default = "default_installer_command")]
    pub installer_command: Vec<String>,
}

fn default_update_interval() -> u64 {
    900
}

fn default_update_initial_delay() -> u64 {
    10
}

fn default_installer_command() -> Vec<String> {
    vec!["signage-install".to_string()]
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_update_interval(),
            initial_delay_secs: default_update_initial_delay(),
            auto_accept: true,
            confirm_system_config: false,
            installed_app_version: None,
            installer_command: default_installer_command(),
        }
    }
}

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Run the live session
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// WebSocket endpoint; derived from the gateway URL when absent
    #[serde(default)]
    pub ws_url: Option<String>,

    /// Identifier whose attendance topic is followed, defaults to the serial
    #[serde(default)]
    pub primary_id: Option<String>,

    /// Optional second identifier
    #[serde(default)]
    pub secondary_id: Option<String>,

    /// Heartbeat period in seconds
    #[serde(default = "default_heartbeat")]
    pub heartbeat_secs: u64,

    /// First reconnect delay in milliseconds
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Reconnect delay ceiling in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Time allowed for the CONNECTED acknowledgment
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_heartbeat() -> u64 {
    60
}

fn default_base_delay() -> u64 {
    2000
}

fn default_max_delay() -> u64 {
    30000
}

fn default_connect_timeout() -> u64 {
    15
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ws_url: None,
            primary_id: None,
            secondary_id: None,
            heartbeat_secs: default_heartbeat(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}
