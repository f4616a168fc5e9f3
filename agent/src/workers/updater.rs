//! Periodic update checks

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::update::orchestrator::UpdateOrchestrator;

/// Updater worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Interval between checks
    pub interval: Duration,

    /// Delay before the first check
    pub initial_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(900),
            initial_delay: Duration::from_secs(10),
        }
    }
}

/// Run the updater worker
pub async fn run<S, F>(
    options: &Options,
    orchestrator: &UpdateOrchestrator,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Updater worker starting...");

    let mut wait = options.initial_delay;
    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Updater worker shutting down...");
                return;
            }
            _ = sleep_fn(wait) => {}
        }
        wait = options.interval;

        debug!("Checking for updates...");
        match orchestrator.run_update_check().await {
            Ok(outcome) => debug!("Scheduled update check: {}", outcome),
            Err(e) => warn!("Scheduled update check failed: {}", e),
        }
    }
}
