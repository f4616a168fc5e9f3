//! Utility functions

use std::time::Duration;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::filesys::dir::Dir;
use crate::http::client::HttpClient;
use crate::http::gateway;
use crate::identity::hardware::MachineIdSource;
use crate::identity::serial::resolve_device_serial;
use crate::storage::artifacts::FsArtifactStore;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Version information for the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Cooldown options for exponential backoff
#[derive(Debug, Clone)]
pub struct CooldownOptions {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for CooldownOptions {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_millis(30000),
            multiplier: 2,
        }
    }
}

/// Calculate exponential backoff delay: `min(max, base * multiplier^attempt)`
pub fn calc_exp_backoff(options: &CooldownOptions, attempt: u32) -> Duration {
    let base = u64::try_from(options.base_delay.as_millis()).unwrap_or(u64::MAX);
    let max = u64::try_from(options.max_delay.as_millis()).unwrap_or(u64::MAX);
    let factor = u64::from(options.multiplier)
        .checked_pow(attempt)
        .unwrap_or(u64::MAX);

    Duration::from_millis(base.saturating_mul(factor).min(max))
}

/// Generate a random UUID v4
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Calculate SHA256 hash of data
pub fn sha256_hash(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Hex encoding utilities
mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(data: impl AsRef<[u8]>) -> String {
        let data = data.as_ref();
        let mut result = String::with_capacity(data.len() * 2);
        for byte in data {
            result.push(HEX_CHARS[(byte >> 4) as usize] as char);
            result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
        }
        result
    }
}

// ================================ DIAGNOSTICS ==================================== //

fn report(check: &str, result: Result<String, String>) -> bool {
    match result {
        Ok(detail) => {
            println!("{} {} {}", "PASS".green().bold(), check, detail.dimmed());
            true
        }
        Err(detail) => {
            println!("{} {} {}", "FAIL".red().bold(), check, detail);
            false
        }
    }
}

/// Check storage, identity, gateway reachability and session token minting
pub async fn run_diagnostic(layout: &StorageLayout, settings: &Settings) -> bool {
    println!("{}", "Signage agent diagnostics".bold());
    let version = version_info();
    println!("version {} ({})", version.version, version.git_hash);

    let app_dir = layout.app_dir(&settings.storage.app_folder);
    let storage_ok = report("storage", probe_storage(&app_dir).await);

    let store = FsArtifactStore::new(app_dir);
    let serial = resolve_device_serial(&store, &MachineIdSource::default()).await;
    let serial_ok = report(
        "serial",
        serial.as_ref().map(|s| s.to_string()).map_err(|e| e.to_string()),
    );

    let client = HttpClient::new(
        &settings.gateway.base_url,
        Duration::from_secs(settings.gateway.request_timeout_secs),
    );
    let client = match client {
        Ok(client) => client,
        Err(e) => {
            report("gateway", Err(e.to_string()));
            return false;
        }
    };

    let Ok(serial) = serial else {
        println!("{} gateway checks need a serial", "SKIP".yellow().bold());
        return false;
    };

    let gateway_ok = report(
        "gateway",
        gateway::fetch_device_setting(&client, &serial)
            .await
            .map(|_| format!("{} answered", client.base_url()))
            .map_err(|e| e.user_message()),
    );

    let token_ok = report(
        "session token",
        gateway::fetch_ws_token(&client, &serial)
            .await
            .map(|_| "minted".to_string())
            .map_err(|e| e.to_string()),
    );

    storage_ok && serial_ok && gateway_ok && token_ok
}

async fn probe_storage(dir: &Dir) -> Result<String, String> {
    dir.create().await.map_err(|e| e.to_string())?;
    let probe = dir.file(".probe");
    probe.write_string("ok").await.map_err(|e| e.to_string())?;
    probe.delete().await.map_err(|e| e.to_string())?;
    Ok(format!("{:?} is writable", dir.path()))
}
