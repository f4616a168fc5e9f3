//! Update stages

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stages of an accepted update, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStage {
    SystemConfig,
    CmsData,
    StyleCss,
    App,
}

impl UpdateStage {
    /// Stage that runs after this one
    pub fn next(self) -> Option<UpdateStage> {
        match self {
            UpdateStage::SystemConfig => Some(UpdateStage::CmsData),
            UpdateStage::CmsData => Some(UpdateStage::StyleCss),
            UpdateStage::StyleCss => Some(UpdateStage::App),
            UpdateStage::App => None,
        }
    }
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStage::SystemConfig => write!(f, "system_config"),
            UpdateStage::CmsData => write!(f, "cms_data"),
            UpdateStage::StyleCss => write!(f, "style_css"),
            UpdateStage::App => write!(f, "app"),
        }
    }
}

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Candidate matches the installed configuration
    UpToDate,

    /// The update prompt was declined
    Declined,

    /// All stages ran and the candidate is now installed
    Applied,

    /// A new app binary was handed to the installer
    InstallTriggered,

    /// The app binary could not be downloaded or installed
    AppDownloadFailed,

    /// Another cycle was already running
    AlreadyRunning,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::UpToDate => write!(f, "up to date"),
            CycleOutcome::Declined => write!(f, "declined"),
            CycleOutcome::Applied => write!(f, "applied"),
            CycleOutcome::InstallTriggered => write!(f, "install triggered"),
            CycleOutcome::AppDownloadFailed => write!(f, "app download failed"),
            CycleOutcome::AlreadyRunning => write!(f, "already running"),
        }
    }
}

/// Result of running one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next(UpdateStage),
    Done(CycleOutcome),
}

impl Step {
    /// Advance past `stage`
    pub fn after(stage: UpdateStage) -> Step {
        match stage.next() {
            Some(next) => Step::Next(next),
            None => Step::Done(CycleOutcome::Applied),
        }
    }
}
