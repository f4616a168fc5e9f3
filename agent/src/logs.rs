//! Logging configuration

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::errors::AgentError;

/// Verbosity of the agent's own output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    /// Directive for the agent's crates; dependencies stay at `warn`
    /// unless `RUST_LOG` says otherwise.
    pub fn directive(self) -> String {
        format!("warn,signage_agent={self},gateway_api={self},agent_api={self}")
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
            .map_err(|_| AgentError::ConfigError(format!("unknown log level '{}'", s)))
    }
}

/// Logging options
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Log level
    pub log_level: LogLevel,

    /// Write logs to stdout
    pub stdout: bool,

    /// Directory for daily-rolling log files, if any
    pub log_dir: Option<PathBuf>,

    /// Enable JSON format on stdout
    pub json_format: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            stdout: true,
            log_dir: None,
            json_format: false,
        }
    }
}

/// Initialize logging
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init_logging(options: LogOptions) -> Result<Option<WorkerGuard>, AgentError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.log_level.directive()));

    let (file_layer, guard) = match &options.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "signage-agent.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let plain_layer = (options.stdout && !options.json_format).then(|| fmt::layer());
    let json_layer = (options.stdout && options.json_format).then(|| fmt::layer().json());

    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AgentError::ConfigError(e.to_string()))?;

    Ok(guard)
}
