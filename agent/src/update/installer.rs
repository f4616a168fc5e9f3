//! App installer hand-off

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::errors::AgentError;

/// Installs a downloaded app binary
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, artifact: &Path) -> Result<(), AgentError>;
}

/// Runs an external command with the artifact path appended
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    command: Vec<String>,
}

impl CommandInstaller {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Installer for CommandInstaller {
    async fn install(&self, artifact: &Path) -> Result<(), AgentError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| AgentError::InstallError("no installer command configured".to_string()))?;

        info!("Running installer {} for {:?}", program, artifact);
        let status = Command::new(program)
            .args(args)
            .arg(artifact)
            .status()
            .await
            .map_err(|e| AgentError::InstallError(format!("failed to run {}: {}", program, e)))?;

        if !status.success() {
            return Err(AgentError::InstallError(format!("{} exited with {}", program, status)));
        }
        Ok(())
    }
}
