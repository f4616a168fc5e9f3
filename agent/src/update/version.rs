//! Version normalization and the CMS/CSS compatibility floor
//!
//! App builds normalizing to exactly 10000, or to 10100 and above, only get
//! CMS and CSS content normalizing to at least [`CONTENT_FLOOR`]. Candidate
//! entries below that are pinned to a known-good release.

use gateway_api::models::CmsInfo;
use tracing::info;

/// Normalized width of a version
pub const NORMALIZED_WIDTH: usize = 5;

/// Lowest content version accepted by affected app builds
pub const CONTENT_FLOOR: u64 = 20001;

/// Known-good CMS document
pub const CMS_FLOOR_FILE: &str = "CMS-20001.json";

/// Known-good stylesheet
pub const CSS_FLOOR_FILE: &str = "CSS-20001.css";

/// Version recorded alongside either known-good file
pub const FLOOR_VERSION: &str = "2.0.1";

/// Normalize a dotted version to an integer.
///
/// Every `.` is removed, the result is right-padded with `'0'` to five
/// characters, and the leading run of ASCII digits is parsed. `"2.0.1"`
/// becomes `20100`. A version with no leading digits has no normalized form.
pub fn normalize(version: &str) -> Option<u64> {
    let mut digits: String = version.chars().filter(|c| *c != '.').collect();
    while digits.chars().count() < NORMALIZED_WIDTH {
        digits.push('0');
    }

    let leading: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    leading.parse().ok()
}

/// Whether a normalized app version is subject to the content floor
pub fn floor_applies(app_version: u64) -> bool {
    app_version == 10000 || app_version >= 10100
}

/// Which content entries were pinned
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FloorCorrection {
    pub cms: bool,
    pub css: bool,
}

/// Pin the candidate's CMS and CSS entries for affected app builds.
///
/// Each entry is checked on its own. An entry whose version has no
/// normalized form is left untouched.
pub fn apply_content_floor(installed_app_version: &str, cms_info: &mut CmsInfo) -> FloorCorrection {
    let mut correction = FloorCorrection::default();

    match normalize(installed_app_version) {
        Some(app) if floor_applies(app) => {}
        _ => return correction,
    }

    if below_floor(cms_info.cms_version.as_deref()) {
        cms_info.cms_file_name = Some(CMS_FLOOR_FILE.to_string());
        cms_info.cms_version = Some(FLOOR_VERSION.to_string());
        correction.cms = true;
    }

    if below_floor(cms_info.css_version.as_deref()) {
        cms_info.css_file_name = Some(CSS_FLOOR_FILE.to_string());
        cms_info.css_version = Some(FLOOR_VERSION.to_string());
        correction.css = true;
    }

    if correction.cms || correction.css {
        info!(
            "App {} pinned content to the compatibility floor (cms: {}, css: {})",
            installed_app_version, correction.cms, correction.css
        );
    }

    correction
}

fn below_floor(version: Option<&str>) -> bool {
    version
        .and_then(normalize)
        .map(|v| v < CONTENT_FLOOR)
        .unwrap_or(false)
}
