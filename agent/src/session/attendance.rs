//! Attendance events received over the session

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// Receives attendance payloads routed from the session
#[async_trait]
pub trait AttendanceSink: Send + Sync {
    async fn record(&self, id: &str, payload: Value);
}

/// Latest attendance payload for one identifier
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub id: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

/// Keeps the latest payload per identifier
#[derive(Default)]
pub struct AttendanceBoard {
    records: RwLock<HashMap<String, AttendanceRecord>>,
}

impl AttendanceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<AttendanceRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// All records, ordered by identifier
    pub async fn entries(&self) -> Vec<AttendanceRecord> {
        let mut entries: Vec<AttendanceRecord> = self.records.read().await.values().cloned().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }
}

#[async_trait]
impl AttendanceSink for AttendanceBoard {
    async fn record(&self, id: &str, payload: Value) {
        debug!("Attendance update for {}", id);
        let record = AttendanceRecord {
            id: id.to_string(),
            payload,
            received_at: Utc::now(),
        };
        self.records.write().await.insert(id.to_string(), record);
    }
}

/// Interpret a message body: JSON when it parses, otherwise the raw text
pub fn parse_payload(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
