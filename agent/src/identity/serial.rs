//! Device serial resolution
//!
//! The serial is the correlation key for every gateway call. It is derived
//! once, persisted in the app folder, and read back verbatim afterwards.

use chrono::Utc;
use tracing::{info, warn};

use crate::errors::AgentError;
use crate::identity::hardware::HardwareIdSource;
use crate::storage::artifacts::ArtifactStore;
use crate::storage::layout::ArtifactKeys;

/// Hex characters kept from the hardware identifier
pub const SERIAL_WIDTH: usize = 16;

/// Resolve the device serial, deriving and persisting it on first use
pub async fn resolve_device_serial(
    store: &dyn ArtifactStore,
    hardware: &dyn HardwareIdSource,
) -> Result<String, AgentError> {
    store.mkdir().await?;

    let key = ArtifactKeys::serial();
    if store.exists(key).await {
        return store.read_string(key).await;
    }

    let serial = match hardware.hardware_id().await {
        Ok(id) => derive_serial(&id),
        Err(e) => {
            warn!("Hardware identifier unavailable ({}), using a timestamp serial", e);
            Utc::now().timestamp_millis().to_string()
        }
    };

    store.write(key, serial.as_bytes()).await?;
    info!("Device serial created: {}", serial);

    Ok(serial)
}

/// Derive a serial from a hardware identifier.
///
/// The id is right-padded with `'0'` and truncated to [`SERIAL_WIDTH`]
/// characters, split into pairs, and a dash is placed before pairs 2, 4 and 6.
pub fn derive_serial(hardware_id: &str) -> String {
    let mut chars: Vec<char> = hardware_id.chars().take(SERIAL_WIDTH).collect();
    chars.resize(SERIAL_WIDTH, '0');

    let mut serial = String::with_capacity(SERIAL_WIDTH + 3);
    for (index, pair) in chars.chunks(2).enumerate() {
        if matches!(index, 2 | 4 | 6) {
            serial.push('-');
        }
        serial.extend(pair);
    }

    serial.to_uppercase()
}
