//! Directory operations

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::AgentError;
use crate::filesys::file::{storage_error, File};

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory (and parents); an existing directory is fine
    pub async fn create(&self) -> Result<(), AgentError> {
        match fs::create_dir_all(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && self.exists().await => Ok(()),
            Err(e) => Err(storage_error("mkdir", &self.path, e)),
        }
    }

    /// Get a file within this directory
    pub fn file(&self, name: &str) -> File {
        File::new(self.path.join(name))
    }

    /// Get a subdirectory
    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }
}
