//! File operations

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::AgentError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a regular file exists at the path
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, AgentError> {
        fs::read_to_string(&self.path)
            .await
            .map_err(|e| storage_error("read", &self.path, e))
    }

    /// Read file contents as bytes
    pub async fn read_bytes(&self) -> Result<Vec<u8>, AgentError> {
        fs::read(&self.path)
            .await
            .map_err(|e| storage_error("read", &self.path, e))
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, AgentError> {
        let contents = self.read_string().await?;
        serde_json::from_str(&contents).map_err(|e| {
            AgentError::ParseError(format!("{}: {}", self.path.display(), e))
        })
    }

    /// Write bytes through a sibling temp file so readers never see a torn write
    pub async fn write_bytes(&self, contents: &[u8]) -> Result<(), AgentError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error("mkdir", parent, e))?;
        }

        let temp_path = self.temp_path();
        let write = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(contents).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &self.path).await
        };

        if let Err(e) = write.await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(storage_error("write", &self.path, e));
        }
        Ok(())
    }

    /// Write string to file
    pub async fn write_string(&self, contents: &str) -> Result<(), AgentError> {
        self.write_bytes(contents.as_bytes()).await
    }

    /// Write JSON to file
    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), AgentError> {
        let contents = serde_json::to_string_pretty(value)?;
        self.write_string(&contents).await
    }

    /// Delete the file; a missing file is not an error
    pub async fn delete(&self) -> Result<(), AgentError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("delete", &self.path, e)),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

pub(crate) fn storage_error(op: &str, path: &Path, err: std::io::Error) -> AgentError {
    AgentError::StorageError(format!("{} {}: {}", op, path.display(), err))
}
