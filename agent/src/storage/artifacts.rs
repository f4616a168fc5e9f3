//! Local artifact store
//!
//! Artifacts are addressed by flat keys (file names) under one root. Keys
//! often come from server-provided file names, so anything that could
//! escape the root is rejected.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::AgentError;
use crate::filesys::dir::Dir;

/// Key-addressed persistent storage
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Create the store root; an existing root is not an error
    async fn mkdir(&self) -> Result<(), AgentError>;

    /// Whether an artifact is present
    async fn exists(&self, key: &str) -> bool;

    /// Read an artifact
    async fn read(&self, key: &str) -> Result<Vec<u8>, AgentError>;

    /// Write an artifact, replacing any previous contents
    async fn write(&self, key: &str, contents: &[u8]) -> Result<(), AgentError>;

    /// Remove an artifact; a missing artifact is not an error
    async fn remove(&self, key: &str) -> Result<(), AgentError>;

    /// Location handed to external capabilities such as the installer
    fn locate(&self, key: &str) -> PathBuf;

    /// Read an artifact as UTF-8 text
    async fn read_string(&self, key: &str) -> Result<String, AgentError> {
        let bytes = self.read(key).await?;
        String::from_utf8(bytes)
            .map_err(|e| AgentError::ParseError(format!("{} is not UTF-8: {}", key, e)))
    }
}

/// Reject keys that are empty or could address anything outside the root
pub fn check_key(key: &str) -> Result<&str, AgentError> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0');

    if invalid {
        return Err(AgentError::StorageError(format!("invalid artifact key: {:?}", key)));
    }
    Ok(key)
}

/// Filesystem-backed artifact store
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: Dir,
}

impl FsArtifactStore {
    pub fn new(root: Dir) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Dir {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn mkdir(&self) -> Result<(), AgentError> {
        self.root.create().await
    }

    async fn exists(&self, key: &str) -> bool {
        match check_key(key) {
            Ok(key) => self.root.file(key).exists().await,
            Err(_) => false,
        }
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, AgentError> {
        self.root.file(check_key(key)?).read_bytes().await
    }

    async fn write(&self, key: &str, contents: &[u8]) -> Result<(), AgentError> {
        self.root.file(check_key(key)?).write_bytes(contents).await
    }

    async fn remove(&self, key: &str) -> Result<(), AgentError> {
        self.root.file(check_key(key)?).delete().await
    }

    fn locate(&self, key: &str) -> PathBuf {
        self.root.path().join(key)
    }
}
