//! Change detection between the candidate and the installed configuration
//!
//! Each section is keyed by a version/timestamp pair. The app timestamp is
//! read from differently-cased keys on the two sides; both keys are named
//! below so the asymmetry stays visible.

use std::fmt;

use gateway_api::models::{SystemConfiguration, APP_TIMESTAMP_KEY, APP_TIME_STAMP_KEY};

/// Key holding the app timestamp in the candidate document.
///
/// The gateway must send both this key and [`INSTALLED_APP_TIMESTAMP_KEY`]
/// with the same value. The saved document is the candidate as served, so
/// when only `appTimestamp` is present the installed side reads as missing,
/// the app pair always differs, and every cycle downloads and installs the
/// app again.
pub const CANDIDATE_APP_TIMESTAMP_KEY: &str = APP_TIMESTAMP_KEY;

/// Key holding the app timestamp in the installed document.
///
/// See [`CANDIDATE_APP_TIMESTAMP_KEY`]: a configuration without this key
/// makes the app look changed on every cycle.
pub const INSTALLED_APP_TIMESTAMP_KEY: &str = APP_TIME_STAMP_KEY;

/// Fields compared to decide whether an update is required
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedField {
    SystemVersion,
    SystemTimestamp,
    CmsVersion,
    CmsTimestamp,
    CssVersion,
    CssTimestamp,
    AppVersion,
    AppTimestamp,
}

impl TrackedField {
    pub const ALL: [TrackedField; 8] = [
        TrackedField::SystemVersion,
        TrackedField::SystemTimestamp,
        TrackedField::CmsVersion,
        TrackedField::CmsTimestamp,
        TrackedField::CssVersion,
        TrackedField::CssTimestamp,
        TrackedField::AppVersion,
        TrackedField::AppTimestamp,
    ];

    fn candidate<'a>(&self, doc: &'a SystemConfiguration) -> Option<&'a str> {
        match self {
            TrackedField::AppTimestamp => doc.app_info.timestamp_for(CANDIDATE_APP_TIMESTAMP_KEY),
            _ => self.common(doc),
        }
    }

    fn installed<'a>(&self, doc: &'a SystemConfiguration) -> Option<&'a str> {
        match self {
            TrackedField::AppTimestamp => doc.app_info.timestamp_for(INSTALLED_APP_TIMESTAMP_KEY),
            _ => self.common(doc),
        }
    }

    fn common<'a>(&self, doc: &'a SystemConfiguration) -> Option<&'a str> {
        match self {
            TrackedField::SystemVersion => doc.system_info.system_version.as_deref(),
            TrackedField::SystemTimestamp => doc.system_info.system_timestamp.as_deref(),
            TrackedField::CmsVersion => doc.cms_info.cms_version.as_deref(),
            TrackedField::CmsTimestamp => doc.cms_info.cms_timestamp.as_deref(),
            TrackedField::CssVersion => doc.cms_info.css_version.as_deref(),
            TrackedField::CssTimestamp => doc.cms_info.css_timestamp.as_deref(),
            TrackedField::AppVersion => doc.app_info.app_version.as_deref(),
            TrackedField::AppTimestamp => None,
        }
    }

    /// Whether this field differs between candidate and installed
    pub fn differs(&self, candidate: &SystemConfiguration, installed: &SystemConfiguration) -> bool {
        self.candidate(candidate) != self.installed(installed)
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackedField::SystemVersion => "systemVersion",
            TrackedField::SystemTimestamp => "systemTimestamp",
            TrackedField::CmsVersion => "cmsVersion",
            TrackedField::CmsTimestamp => "cmsTimestamp",
            TrackedField::CssVersion => "cssVersion",
            TrackedField::CssTimestamp => "cssTimestamp",
            TrackedField::AppVersion => "appVersion",
            TrackedField::AppTimestamp => "appTimestamp",
        };
        write!(f, "{}", name)
    }
}

/// Fields that differ, in comparison order
pub fn changed_fields(
    candidate: &SystemConfiguration,
    installed: &SystemConfiguration,
) -> Vec<TrackedField> {
    TrackedField::ALL
        .iter()
        .copied()
        .filter(|field| field.differs(candidate, installed))
        .collect()
}

/// True unless all eight tracked fields match
pub fn update_required(candidate: &SystemConfiguration, installed: &SystemConfiguration) -> bool {
    TrackedField::ALL
        .iter()
        .any(|field| field.differs(candidate, installed))
}

pub fn cms_changed(candidate: &SystemConfiguration, installed: &SystemConfiguration) -> bool {
    TrackedField::CmsVersion.differs(candidate, installed)
        || TrackedField::CmsTimestamp.differs(candidate, installed)
}

pub fn css_changed(candidate: &SystemConfiguration, installed: &SystemConfiguration) -> bool {
    TrackedField::CssVersion.differs(candidate, installed)
        || TrackedField::CssTimestamp.differs(candidate, installed)
}

pub fn app_changed(candidate: &SystemConfiguration, installed: &SystemConfiguration) -> bool {
    TrackedField::AppVersion.differs(candidate, installed)
        || TrackedField::AppTimestamp.differs(candidate, installed)
}
