//! HTTP request handlers

use std::sync::Arc;
use std::time::Duration;

use agent_api::models::{
    AttendanceEntry, AttendanceResponse, ErrorResponse, HealthResponse, ReloadResponse,
    SessionStatusResponse, UpdateResult, UpdateStatusResponse, VersionResponse,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::broadcast::error::RecvError;

use crate::errors::AgentError;
use crate::server::state::ServerState;
use crate::update::orchestrator::UpdateReport;
use crate::update::stage::CycleOutcome;
use crate::utils::version_info;

/// How long a reload long-poll waits before answering 204
pub const RELOAD_POLL_TIMEOUT: Duration = Duration::from_secs(30);

fn not_found(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not_found".to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "signage-agent".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Installed configuration
pub async fn config_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.config.current().await {
        Some(config) => Json(config).into_response(),
        None => not_found("no configuration loaded"),
    }
}

/// CMS document
pub async fn cms_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.config.cms().await {
        Some(cms) => Json(cms).into_response(),
        None => not_found("no CMS document loaded"),
    }
}

/// Stylesheet
pub async fn css_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.config.css().await {
        Some(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        None => not_found("no stylesheet loaded"),
    }
}

pub fn update_result(outcome: CycleOutcome) -> UpdateResult {
    match outcome {
        CycleOutcome::UpToDate => UpdateResult::UpToDate,
        CycleOutcome::Declined => UpdateResult::Declined,
        CycleOutcome::Applied => UpdateResult::Applied,
        CycleOutcome::InstallTriggered => UpdateResult::InstallTriggered,
        CycleOutcome::AppDownloadFailed => UpdateResult::AppDownloadFailed,
        CycleOutcome::AlreadyRunning => UpdateResult::AlreadyRunning,
    }
}

fn status_response(serial: &str, report: Option<UpdateReport>) -> UpdateStatusResponse {
    match report {
        Some(report) => UpdateStatusResponse {
            serial_number: serial.to_string(),
            last_result: Some(report.outcome.map(update_result).unwrap_or(UpdateResult::Failed)),
            last_checked_at: Some(report.checked_at),
            message: report.error,
        },
        None => UpdateStatusResponse {
            serial_number: serial.to_string(),
            last_result: None,
            last_checked_at: None,
            message: None,
        },
    }
}

/// Response for a cycle the request ran itself.
///
/// Built from the cycle's own result, so a periodic cycle finishing in the
/// meantime does not leak into the answer.
pub fn check_response(
    serial: &str,
    result: &Result<CycleOutcome, AgentError>,
) -> UpdateStatusResponse {
    match result {
        Ok(CycleOutcome::AlreadyRunning) => UpdateStatusResponse {
            serial_number: serial.to_string(),
            last_result: Some(UpdateResult::AlreadyRunning),
            last_checked_at: None,
            message: None,
        },
        result => status_response(serial, Some(UpdateReport::from_result(result))),
    }
}

/// Run one update cycle now
pub async fn update_check_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let orchestrator = &state.orchestrator;
    let result = orchestrator.run_update_check().await;
    Json(check_response(orchestrator.serial(), &result))
}

/// Last update cycle
pub async fn update_status_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let orchestrator = &state.orchestrator;
    Json(status_response(
        orchestrator.serial(),
        orchestrator.last_report().await,
    ))
}

/// Session status
pub async fn session_handler(State(state): State<Arc<ServerState>>) -> Response {
    let Some(session) = state.session.as_ref() else {
        return not_found("live session is disabled");
    };

    let status = session.status().await;
    Json(SessionStatusResponse {
        active: status.active,
        connected: status.connected,
        attempt: status.attempt,
        subscriptions: status.subscriptions,
    })
    .into_response()
}

/// Latest attendance payloads
pub async fn attendance_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let entries: Vec<AttendanceEntry> = state
        .attendance
        .entries()
        .await
        .into_iter()
        .map(|record| AttendanceEntry {
            id: record.id,
            payload: record.payload,
            received_at: record.received_at,
        })
        .collect();

    Json(AttendanceResponse {
        total: entries.len(),
        entries,
    })
}

/// Long-poll for the next reload signal
pub async fn reload_handler(State(state): State<Arc<ServerState>>) -> Response {
    let mut reloads = state.config.subscribe();

    match tokio::time::timeout(RELOAD_POLL_TIMEOUT, reloads.recv()).await {
        Ok(Ok(event)) => Json(ReloadResponse {
            generation: event.generation,
            reason: event.reason.to_string(),
        })
        .into_response(),
        // A lagging receiver still means a reload happened.
        Ok(Err(RecvError::Lagged(_))) => Json(ReloadResponse {
            generation: state.config.generation(),
            reason: "configuration_applied".to_string(),
        })
        .into_response(),
        Ok(Err(RecvError::Closed)) | Err(_) => StatusCode::NO_CONTENT.into_response(),
    }
}
