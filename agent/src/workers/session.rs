//! Live session lifecycle and heartbeat

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, info};

use crate::session::client::SessionClient;

/// Session worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Identifier whose attendance topic is followed
    pub primary_id: String,

    /// Optional second identifier
    pub secondary_id: Option<String>,

    /// Heartbeat period
    pub heartbeat_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            primary_id: String::new(),
            secondary_id: None,
            heartbeat_interval: Duration::from_secs(60),
        }
    }
}

/// Run the session worker
pub async fn run(
    options: &Options,
    client: &SessionClient,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) {
    info!("Session worker starting...");

    tokio::select! {
        _ = &mut shutdown_signal => {
            info!("Session worker shutting down during connect...");
            client.disconnect().await;
            return;
        }
        _ = client.connect(&options.primary_id, options.secondary_id.as_deref()) => {}
    }

    let period = options.heartbeat_interval.max(Duration::from_secs(1));
    let mut heartbeat = tokio::time::interval(period);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Session worker shutting down...");
                client.disconnect().await;
                return;
            }
            _ = heartbeat.tick() => {
                if client.heartbeat().await {
                    debug!("Heartbeat sent");
                }
            }
        }
    }
}
