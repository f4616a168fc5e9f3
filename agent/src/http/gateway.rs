//! Gateway endpoints

use gateway_api::envelope;
use gateway_api::models::{SystemConfiguration, WsTokenResponse};
use secrecy::SecretString;
use tracing::debug;

use crate::errors::AgentError;
use crate::http::client::RemoteFetch;

/// Device setting endpoint, keyed by `serialno`
pub const DEVICE_SETTING_PATH: &str = "/api/restgetdevicesetting";

/// Session token endpoint, keyed by `deviceSerial`
pub const WS_TOKEN_PATH: &str = "/wsocket/getwstoken";

/// Fetch the configuration the gateway currently advertises for a device.
///
/// A body that decodes without any system, CMS or app section is rejected.
pub async fn fetch_device_setting(
    fetch: &dyn RemoteFetch,
    serial: &str,
) -> Result<SystemConfiguration, AgentError> {
    let body = fetch
        .get_text(DEVICE_SETTING_PATH, &[("serialno", serial)])
        .await?;
    let config: SystemConfiguration = envelope::decode(&body)?;
    if !config.has_sections() {
        return Err(AgentError::NetworkError {
            status: None,
            message: format!("device setting for {} carries no configuration sections", serial),
        });
    }
    debug!("Decoded device setting for {}", serial);
    Ok(config)
}

/// Mint a short-lived session token
pub async fn fetch_ws_token(
    fetch: &dyn RemoteFetch,
    serial: &str,
) -> Result<SecretString, AgentError> {
    let body = fetch
        .get_text(WS_TOKEN_PATH, &[("deviceSerial", serial)])
        .await?;

    let response: WsTokenResponse = envelope::decode(&body)
        .map_err(|e| AgentError::AuthError(format!("session token rejected: {}", e)))?;

    if response.token.trim().is_empty() {
        return Err(AgentError::AuthError("session token is empty".to_string()));
    }

    Ok(SecretString::from(response.token))
}
