//! Response validity convention
//!
//! Every response must carry a numeric status. 2xx is success; everything
//! else maps to operator-facing copy keyed by status code.

use crate::errors::AgentError;

/// Check a response status, turning anything but 2xx into a `NetworkError`.
pub fn check_status(status: Option<u16>, context: &str) -> Result<(), AgentError> {
    match status {
        Some(code) if (200..300).contains(&code) => Ok(()),
        status => Err(AgentError::NetworkError {
            status,
            message: format!("{}: {}", context, user_message(status)),
        }),
    }
}

/// Operator-facing message for a response status.
pub fn user_message(status: Option<u16>) -> &'static str {
    match status {
        None => "No valid response was received from the server.",
        Some(400) => "The request was rejected by the server (400 Bad Request).",
        Some(401) => "This device is not authorised (401 Unauthorized).",
        Some(403) => "Access to this resource is forbidden (403 Forbidden).",
        Some(404) => "The requested resource was not found (404 Not Found).",
        Some(code) if (500..600).contains(&code) => {
            "The server encountered an error. Please try again later."
        }
        Some(_) => "An unexpected error occurred while contacting the server.",
    }
}
