//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::AgentError;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::update::confirm::AutoConfirm;
use crate::workers::{session, updater};

/// Run the signage agent until the shutdown signal fires
pub async fn run(
    agent_version: String,
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AgentError> {
    info!("Initializing signage agent...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(agent_version, &options, shutdown_tx.clone(), &mut shutdown_manager).await {
        error!("Failed to start agent: {}", e);
        error!("{}", e.user_message());
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    agent_version: String,
    options: &AppOptions,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<Arc<AppState>, AgentError> {
    let confirm = Arc::new(AutoConfirm::new(options.auto_accept));
    let app_state = Arc::new(AppState::init(agent_version, options, confirm).await?);
    shutdown_manager.with_app_state(app_state.clone())?;

    if options.enable_server {
        init_server(options, app_state.clone(), shutdown_manager, shutdown_tx.subscribe()).await?;
    }

    if options.enable_updater {
        init_updater_worker(
            options.updater.clone(),
            app_state.clone(),
            shutdown_manager,
            shutdown_tx.subscribe(),
        )?;
    }

    if let Some(client) = app_state.session.clone() {
        let worker_options = session::Options {
            primary_id: options
                .session
                .primary_id
                .clone()
                .unwrap_or_else(|| app_state.serial.clone()),
            secondary_id: options.session.secondary_id.clone(),
            heartbeat_interval: options.session.heartbeat_interval,
        };
        init_session_worker(worker_options, client, shutdown_manager, shutdown_tx.subscribe())?;
    }

    Ok(app_state)
}

fn init_updater_worker(
    options: updater::Options,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), AgentError> {
    info!("Initializing updater worker...");

    let orchestrator = app_state.orchestrator.clone();
    let handle = tokio::spawn(async move {
        updater::run(
            &options,
            orchestrator.as_ref(),
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_updater_worker_handle(handle)
}

fn init_session_worker(
    options: session::Options,
    client: crate::session::client::SessionClient,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), AgentError> {
    info!("Initializing session worker...");

    let handle = tokio::spawn(async move {
        session::run(
            &options,
            &client,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_session_worker_handle(handle)
}

async fn init_server(
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), AgentError> {
    info!("Initializing local HTTP server...");

    let server_state = ServerState::new(
        app_state.config.clone(),
        app_state.orchestrator.clone(),
        app_state.session.clone(),
        app_state.attendance.clone(),
    );

    let handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_server_handle(handle)
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    app_state: Option<Arc<AppState>>,
    server_handle: Option<JoinHandle<Result<(), AgentError>>>,
    updater_worker_handle: Option<JoinHandle<()>>,
    session_worker_handle: Option<JoinHandle<()>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            app_state: None,
            server_handle: None,
            updater_worker_handle: None,
            session_worker_handle: None,
        }
    }

    pub fn with_app_state(&mut self, state: Arc<AppState>) -> Result<(), AgentError> {
        if self.app_state.is_some() {
            return Err(AgentError::ShutdownError("app_state already set".to_string()));
        }
        self.app_state = Some(state);
        Ok(())
    }

    pub fn with_updater_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), AgentError> {
        if self.updater_worker_handle.is_some() {
            return Err(AgentError::ShutdownError("updater_handle already set".to_string()));
        }
        self.updater_worker_handle = Some(handle);
        Ok(())
    }

    pub fn with_session_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), AgentError> {
        if self.session_worker_handle.is_some() {
            return Err(AgentError::ShutdownError("session_handle already set".to_string()));
        }
        self.session_worker_handle = Some(handle);
        Ok(())
    }

    pub fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), AgentError>>,
    ) -> Result<(), AgentError> {
        if self.server_handle.is_some() {
            return Err(AgentError::ShutdownError("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), AgentError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), AgentError> {
        info!("Shutting down signage agent...");

        // 1. Updater worker
        if let Some(handle) = self.updater_worker_handle.take() {
            handle.await.map_err(|e| AgentError::ShutdownError(e.to_string()))?;
        }

        // 2. Session worker
        if let Some(handle) = self.session_worker_handle.take() {
            handle.await.map_err(|e| AgentError::ShutdownError(e.to_string()))?;
        }

        // 3. Local server
        if let Some(handle) = self.server_handle.take() {
            if let Err(e) = handle.await.map_err(|e| AgentError::ShutdownError(e.to_string()))? {
                warn!("Local server stopped with an error: {}", e);
            }
        }

        // 4. App state
        if let Some(app_state) = self.app_state.take() {
            app_state.shutdown().await?;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
