//! Agent API models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Result of one update cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateResult {
    UpToDate,
    Declined,
    Applied,
    InstallTriggered,
    AppDownloadFailed,
    AlreadyRunning,
    Failed,
}

/// Update status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusResponse {
    pub serial_number: String,
    pub last_result: Option<UpdateResult>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

/// Session status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub active: bool,
    pub connected: bool,
    pub attempt: u32,
    pub subscriptions: Vec<String>,
}

/// Latest attendance event for one identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub id: String,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

/// Attendance board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceResponse {
    pub entries: Vec<AttendanceEntry>,
    pub total: usize,
}

/// Reload notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub generation: u64,
    pub reason: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
