//! Hardware identifier sources

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::errors::AgentError;

/// A stable identifier for the device hardware
#[async_trait]
pub trait HardwareIdSource: Send + Sync {
    async fn hardware_id(&self) -> Result<String, AgentError>;
}

/// Reads the systemd/D-Bus machine id
pub struct MachineIdSource {
    candidates: Vec<String>,
}

impl MachineIdSource {
    pub fn new() -> Self {
        Self {
            candidates: vec![
                "/etc/machine-id".to_string(),
                "/var/lib/dbus/machine-id".to_string(),
            ],
        }
    }

    pub fn with_candidates(candidates: Vec<String>) -> Self {
        Self { candidates }
    }
}

impl Default for MachineIdSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HardwareIdSource for MachineIdSource {
    async fn hardware_id(&self) -> Result<String, AgentError> {
        for path in &self.candidates {
            match fs::read_to_string(path).await {
                Ok(contents) => {
                    let id = contents.trim();
                    if !id.is_empty() {
                        return Ok(id.to_string());
                    }
                    debug!("Machine id at {} is empty", path);
                }
                Err(e) => debug!("No machine id at {}: {}", path, e),
            }
        }
        Err(AgentError::NotFound("hardware identifier".to_string()))
    }
}
