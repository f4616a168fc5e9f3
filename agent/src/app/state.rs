//! Application state management

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::app::options::AppOptions;
use crate::config::resolver::ConfigResolver;
use crate::config::store::ConfigStore;
use crate::errors::AgentError;
use crate::filesys::dir::Dir;
use crate::http::client::{HttpClient, RemoteFetch};
use crate::identity::hardware::MachineIdSource;
use crate::identity::serial::resolve_device_serial;
use crate::session::attendance::AttendanceBoard;
use crate::session::client::SessionClient;
use crate::session::greeting::Greeting;
use crate::session::token::GatewayTokenSource;
use crate::session::transport::{session_url, WsTransport};
use crate::storage::artifacts::{ArtifactStore, FsArtifactStore};
use crate::update::confirm::Confirm;
use crate::update::installer::CommandInstaller;
use crate::update::orchestrator::UpdateOrchestrator;

/// Main application state
pub struct AppState {
    /// Device serial
    pub serial: String,

    /// Remote fetch channel for gateway and CDN
    pub fetch: Arc<dyn RemoteFetch>,

    /// Synchronized artifacts
    pub artifacts: Arc<dyn ArtifactStore>,

    /// Installed configuration and content
    pub config: Arc<ConfigStore>,

    /// Update cycles
    pub orchestrator: Arc<UpdateOrchestrator>,

    /// Live session, when enabled
    pub session: Option<SessionClient>,

    /// Attendance payloads received over the session
    pub attendance: Arc<AttendanceBoard>,
}

impl AppState {
    /// Resolve identity and configuration, then assemble the services.
    ///
    /// Identity and configuration failures are returned; the caller treats
    /// them as fatal.
    pub async fn init(
        agent_version: String,
        options: &AppOptions,
        confirm: Arc<dyn Confirm>,
    ) -> Result<Self, AgentError> {
        info!("Initializing application state...");

        let fetch: Arc<dyn RemoteFetch> = Arc::new(HttpClient::new(
            &options.gateway_base_url,
            options.request_timeout,
        )?);

        let layout = &options.storage.layout;
        let artifacts: Arc<dyn ArtifactStore> =
            Arc::new(FsArtifactStore::new(layout.app_dir(&options.storage.app_folder)));
        let bundled_dir = match &options.storage.bundled_dir {
            Some(dir) => Dir::new(dir.clone()),
            None => layout.bundled_dir(),
        };
        let bundled: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(bundled_dir));

        let serial = resolve_device_serial(artifacts.as_ref(), &MachineIdSource::default()).await?;
        info!("Device serial: {}", serial);

        let config = Arc::new(ConfigStore::new());
        let resolver = ConfigResolver::new(
            artifacts.clone(),
            bundled,
            fetch.clone(),
            config.clone(),
        );
        let system = resolver.load_configuration(&serial).await?;

        match resolver.load_cms(&system).await {
            Ok((_, source)) => info!("CMS document loaded from {:?}", source),
            Err(e) => error!("CMS document unavailable: {}", e),
        }
        match resolver.load_css(&system).await {
            Ok((_, source)) => info!("Stylesheet loaded from {:?}", source),
            Err(e) => warn!("Stylesheet unavailable: {}", e),
        }

        let orchestrator = Arc::new(UpdateOrchestrator::new(
            serial.clone(),
            options.orchestrator.clone(),
            fetch.clone(),
            artifacts.clone(),
            config.clone(),
            confirm,
            Arc::new(CommandInstaller::new(options.installer_command.clone())),
        ));

        let attendance = Arc::new(AttendanceBoard::new());

        let session = if options.enable_session {
            let url = session_url(options.session.ws_url.as_deref(), &options.gateway_base_url)?;
            let transport = WsTransport::new(url, options.session.client.connect_timeout);
            let greeting = Greeting::new(serial.clone(), agent_version).with_system_info();

            Some(SessionClient::new(
                options.session.client.clone(),
                Arc::new(GatewayTokenSource::new(fetch.clone(), serial.clone())),
                Arc::new(transport),
                attendance.clone(),
                greeting,
            ))
        } else {
            None
        };

        Ok(Self {
            serial,
            fetch,
            artifacts,
            config,
            orchestrator,
            session,
            attendance,
        })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        info!("Shutting down application state...");
        if let Some(session) = &self.session {
            session.disconnect().await;
        }
        Ok(())
    }
}
