//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Storage layout for the agent
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Directory holding the synchronized artifacts for one app folder
    pub fn app_dir(&self, app_folder: &str) -> Dir {
        Dir::new(self.base_dir.join(app_folder))
    }

    /// Bundled defaults shipped with the agent, unless overridden in settings
    pub fn bundled_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("bundled"))
    }

    /// Get the logs directory
    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        #[cfg(target_os = "linux")]
        let base_dir = PathBuf::from("/var/lib/signage");

        #[cfg(not(target_os = "linux"))]
        let base_dir = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".signage");

        Self::new(base_dir)
    }
}

/// Artifact keys inside the app folder
pub struct ArtifactKeys;

impl ArtifactKeys {
    /// Persisted device serial
    pub fn serial() -> &'static str {
        "serialNumber.txt"
    }

    /// Installed configuration for a device
    pub fn system_config(serial: &str) -> String {
        format!("CURR_SYSCONFINFO-{}.json", serial)
    }

    /// Cached CMS document
    pub fn cms(file_name: &str) -> String {
        format!("CURR_{}", file_name)
    }

    /// Cached stylesheet
    pub fn css(file_name: &str) -> String {
        file_name.to_string()
    }

    /// Downloaded app binary, removed once the installer has it
    pub fn app(file_name: &str) -> String {
        file_name.to_string()
    }
}
