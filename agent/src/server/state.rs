//! Server state

use std::sync::Arc;

use crate::config::store::ConfigStore;
use crate::session::attendance::AttendanceBoard;
use crate::session::client::SessionClient;
use crate::update::orchestrator::UpdateOrchestrator;

/// Server state shared across handlers
pub struct ServerState {
    pub config: Arc<ConfigStore>,
    pub orchestrator: Arc<UpdateOrchestrator>,
    pub session: Option<SessionClient>,
    pub attendance: Arc<AttendanceBoard>,
}

impl ServerState {
    pub fn new(
        config: Arc<ConfigStore>,
        orchestrator: Arc<UpdateOrchestrator>,
        session: Option<SessionClient>,
        attendance: Arc<AttendanceBoard>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            session,
            attendance,
        }
    }
}
