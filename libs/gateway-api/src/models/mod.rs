//! Gateway models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the candidate document carries the app timestamp.
pub const APP_TIMESTAMP_KEY: &str = "appTimestamp";

/// Differently-cased app timestamp key found in installed documents.
///
/// Servers should send it alongside [`APP_TIMESTAMP_KEY`]; the agent compares
/// the candidate's `appTimestamp` against the installed `appTimeStamp`.
pub const APP_TIME_STAMP_KEY: &str = "appTimeStamp";

/// Versioned device configuration as served by `restgetdevicesetting`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfiguration {
    #[serde(default)]
    pub system_info: SystemInfo,

    #[serde(default)]
    pub cms_info: CmsInfo,

    #[serde(default)]
    pub app_info: AppInfo,

    /// Sections this agent does not interpret, kept for round trips
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SystemConfiguration {
    /// Whether any of the system, CMS or app sections carries a value.
    ///
    /// Every section defaults, so an unrelated JSON object still decodes;
    /// this tells a real configuration apart from such a body.
    pub fn has_sections(&self) -> bool {
        self.system_info != SystemInfo::default()
            || self.cms_info != CmsInfo::default()
            || self.app_info != AppInfo::default()
    }

    /// CDN location of the CMS document
    pub fn cms_url(&self) -> Option<String> {
        artifact_url(
            self.system_info.cdn_url.as_deref(),
            self.cms_info.cms_path.as_deref(),
            self.cms_info.cms_file_name.as_deref(),
        )
    }

    /// CDN location of the stylesheet
    pub fn css_url(&self) -> Option<String> {
        artifact_url(
            self.system_info.cdn_url.as_deref(),
            self.cms_info.css_path.as_deref(),
            self.cms_info.css_file_name.as_deref(),
        )
    }

    /// CDN location of the app binary
    pub fn app_url(&self) -> Option<String> {
        artifact_url(
            self.system_info.cdn_url.as_deref(),
            self.app_info.app_path.as_deref(),
            self.app_info.app_file_name.as_deref(),
        )
    }
}

/// `<cdn><path><file>`, concatenated as served; a missing path is empty
fn artifact_url(cdn: Option<&str>, path: Option<&str>, file: Option<&str>) -> Option<String> {
    let cdn = cdn.filter(|c| !c.is_empty())?;
    let file = file.filter(|f| !f.is_empty())?;
    Some(format!("{}{}{}", cdn, path.unwrap_or_default(), file))
}

/// System section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    #[serde(default, with = "lenient")]
    pub system_version: Option<String>,

    #[serde(default, with = "lenient")]
    pub system_timestamp: Option<String>,

    /// CDN base URL that artifact paths are appended to
    #[serde(rename = "cdnURL", default, skip_serializing_if = "Option::is_none")]
    pub cdn_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_folder: Option<String>,

    #[serde(rename = "gatewayURL", default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,

    /// Feature flags and anything else the server adds
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// CMS and stylesheet section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmsInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cms_file_name: Option<String>,

    #[serde(default, with = "lenient")]
    pub cms_version: Option<String>,

    #[serde(default, with = "lenient")]
    pub cms_timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cms_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_file_name: Option<String>,

    #[serde(default, with = "lenient")]
    pub css_version: Option<String>,

    #[serde(default, with = "lenient")]
    pub css_timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_path: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// App binary section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_file_name: Option<String>,

    #[serde(default, with = "lenient")]
    pub app_version: Option<String>,

    #[serde(rename = "appTimestamp", default, with = "lenient")]
    pub app_timestamp: Option<String>,

    #[serde(
        rename = "appTimeStamp",
        default,
        with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub app_time_stamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_path: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppInfo {
    /// Look up the app timestamp by its wire key.
    ///
    /// Only [`APP_TIMESTAMP_KEY`] and [`APP_TIME_STAMP_KEY`] are recognised.
    pub fn timestamp_for(&self, key: &str) -> Option<&str> {
        match key {
            APP_TIMESTAMP_KEY => self.app_timestamp.as_deref(),
            APP_TIME_STAMP_KEY => self.app_time_stamp.as_deref(),
            _ => None,
        }
    }
}

/// Session token minted by `/wsocket/getwstoken`
#[derive(Debug, Clone, Deserialize)]
pub struct WsTokenResponse {
    pub token: String,
}

/// Version and timestamp fields arrive as strings or bare numbers.
mod lenient {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(serde::de::Error::custom(format!(
                "expected a string or number, got {}",
                other
            ))),
        }
    }
}
