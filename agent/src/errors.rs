//! Error types for the signage agent

use gateway_api::DecodeError;
use thiserror::Error;

use crate::http::status::user_message;

/// Main error type for the signage agent
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Network error ({}): {message}", fmt_status(.status))]
    NetworkError {
        status: Option<u16>,
        message: String,
    },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Install error: {0}")]
    InstallError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no status".to_string(),
    }
}

impl AgentError {
    /// Dialog copy shown to the operator when this error is fatal.
    pub fn user_message(&self) -> String {
        match self {
            AgentError::NetworkError { status, .. } => user_message(*status).to_string(),
            AgentError::HttpError(e) => user_message(e.status().map(|s| s.as_u16())).to_string(),
            AgentError::StorageError(_) | AgentError::IoError(_) => {
                "Local storage is unavailable. Please restart the device.".to_string()
            }
            AgentError::ParseError(_) | AgentError::JsonError(_) => {
                "The server sent an unreadable configuration.".to_string()
            }
            AgentError::AuthError(_) => user_message(Some(401)).to_string(),
            other => other.to_string(),
        }
    }
}

impl From<DecodeError> for AgentError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Status(status) => AgentError::NetworkError {
                status: Some(status),
                message: err.to_string(),
            },
            DecodeError::InvalidStatus | DecodeError::MissingData => AgentError::NetworkError {
                status: None,
                message: err.to_string(),
            },
            other => AgentError::ParseError(other.to_string()),
        }
    }
}
