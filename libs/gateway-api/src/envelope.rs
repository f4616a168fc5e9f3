//! Gateway response envelope
//!
//! The gateway wraps payloads as `{ "status": 200, "data": ... }`, and some
//! deployments serialize that envelope, or its `data`, into a JSON string
//! once more before sending it. Decoding therefore parses the body, then
//! unwraps string-encoded layers a bounded number of times.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Extra string-encoded layers tolerated on top of the body itself
pub const MAX_UNWRAP: usize = 2;

/// Envelope decoding failures
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload still string-encoded after {0} unwraps")]
    TooDeep(usize),

    #[error("envelope status {0} is not a success")]
    Status(u16),

    #[error("envelope status is not numeric")]
    InvalidStatus,

    #[error("envelope carries a status but no data")]
    MissingData,
}

/// Parse string-encoded JSON layers until a non-string value appears.
pub fn unwrap_encoded(mut value: Value) -> Result<Value, DecodeError> {
    for _ in 0..MAX_UNWRAP {
        match value {
            Value::String(inner) => value = serde_json::from_str(&inner)?,
            other => return Ok(other),
        }
    }

    match value {
        Value::String(_) => Err(DecodeError::TooDeep(MAX_UNWRAP)),
        other => Ok(other),
    }
}

/// Decode a gateway body into `T`.
///
/// Objects carrying a `data` or `status` key are treated as envelopes: a
/// `status` field, when present, must be a 2xx number, and `data` must be
/// present and is decoded as the payload. Anything else is decoded as the
/// payload directly.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, DecodeError> {
    let outer = unwrap_encoded(serde_json::from_str(body)?)?;

    let payload = match outer {
        Value::Object(mut map) if map.contains_key("data") || map.contains_key("status") => {
            if let Some(status) = map.get("status") {
                check_status(status)?;
            }
            let data = map.remove("data").ok_or(DecodeError::MissingData)?;
            unwrap_encoded(data)?
        }
        other => other,
    };

    Ok(serde_json::from_value(payload)?)
}

fn check_status(status: &Value) -> Result<(), DecodeError> {
    let code = match status {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or(DecodeError::InvalidStatus)?;

    if (200..300).contains(&code) {
        Ok(())
    } else {
        Err(DecodeError::Status(u16::try_from(code).unwrap_or(u16::MAX)))
    }
}
