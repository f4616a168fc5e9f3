//! Greeting sent after every connect

use serde::Serialize;
use sysinfo::System;

use crate::utils::generate_uuid;

/// Device description announced to the session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Greeting {
    pub serial_number: String,
    pub agent_version: String,
    pub host_name: Option<String>,
    pub os_version: Option<String>,
}

impl Greeting {
    pub fn new(serial_number: String, agent_version: String) -> Self {
        Self {
            serial_number,
            agent_version,
            host_name: None,
            os_version: None,
        }
    }

    /// Fill in host details from the running system
    pub fn with_system_info(mut self) -> Self {
        self.host_name = System::host_name();
        self.os_version = System::long_os_version();
        self
    }

    /// Message body for one connect
    pub fn message(&self, primary_id: &str, secondary_id: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "id": generate_uuid(),
            "type": "hello",
            "primaryId": primary_id,
            "secondaryId": secondary_id,
            "serialNumber": self.serial_number,
            "agentVersion": self.agent_version,
            "hostName": self.host_name,
            "osVersion": self.os_version,
        })
    }
}
