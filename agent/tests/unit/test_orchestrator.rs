//! Update cycles against scripted gateway, CDN and storage

use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use gateway_api::models::SystemConfiguration;
use signage_agent::config::store::ConfigStore;
use signage_agent::errors::AgentError;
use signage_agent::update::confirm::Confirm;
use signage_agent::update::orchestrator::{
    Options, UpdateOrchestrator, SYSTEM_CONFIG_PROMPT, UPDATE_PROMPT,
};
use signage_agent::update::stage::CycleOutcome;

use crate::fakes::{
    device_setting_key, document, envelope, MemoryStore, RecordingInstaller, ScriptedConfirm,
    ScriptedFetch, CDN, SERIAL,
};

struct Fixture {
    artifacts: Arc<MemoryStore>,
    fetch: Arc<ScriptedFetch>,
    config: Arc<ConfigStore>,
    confirm: Arc<ScriptedConfirm>,
    installer: Arc<RecordingInstaller>,
    orchestrator: Arc<UpdateOrchestrator>,
}

fn config_key() -> String {
    format!("CURR_SYSCONFINFO-{}.json", SERIAL)
}

fn cms_url(file: &str) -> String {
    format!("{}cms/{}", CDN, file)
}

fn css_url() -> String {
    format!("{}css/CSS-21000.css", CDN)
}

fn app_url() -> String {
    format!("{}apk/kiosk-1.0.1.apk", CDN)
}

fn doc_with(edit: impl FnOnce(&mut Value)) -> Value {
    let mut doc = document();
    edit(&mut doc);
    doc
}

fn parse(doc: &Value) -> SystemConfiguration {
    serde_json::from_value(doc.clone()).unwrap()
}

async fn fixture(
    installed: Option<Value>,
    candidate: &Value,
    confirm: ScriptedConfirm,
    options: Options,
) -> Fixture {
    let artifacts = Arc::new(MemoryStore::new());
    let fetch = Arc::new(ScriptedFetch::new());
    fetch.route(&device_setting_key(), &envelope(candidate));

    let config = Arc::new(ConfigStore::new());
    if let Some(installed) = installed {
        config.install(parse(&installed)).await;
    }

    let confirm = Arc::new(confirm);
    let installer = Arc::new(RecordingInstaller::default());
    let orchestrator = Arc::new(UpdateOrchestrator::new(
        SERIAL.to_string(),
        options,
        fetch.clone(),
        artifacts.clone(),
        config.clone(),
        confirm.clone(),
        installer.clone(),
    ));

    Fixture {
        artifacts,
        fetch,
        config,
        confirm,
        installer,
        orchestrator,
    }
}

fn older_cms() -> Value {
    doc_with(|d| d["cmsInfo"]["cmsTimestamp"] = json!("150"))
}

// ================================ NO UPDATE ====================================== //

#[tokio::test]
async fn test_matching_configuration_is_up_to_date() {
    let f = fixture(Some(document()), &document(), ScriptedConfirm::new(true), Options::default()).await;

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::UpToDate);
    assert_eq!(f.fetch.calls(), vec![device_setting_key()]);
    assert!(f.confirm.prompts().is_empty());
    assert_eq!(f.artifacts.write_count(), 0);
    assert_eq!(f.config.generation(), 0);

    let report = f.orchestrator.last_report().await.unwrap();
    assert_eq!(report.outcome, Some(CycleOutcome::UpToDate));
    assert!(report.error.is_none());
}

#[tokio::test]
async fn test_declined_update_has_no_effects() {
    let f = fixture(Some(older_cms()), &document(), ScriptedConfirm::new(false), Options::default()).await;

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::Declined);
    assert_eq!(f.confirm.prompts(), vec![UPDATE_PROMPT.to_string()]);
    assert_eq!(f.fetch.calls(), vec![device_setting_key()]);
    assert!(f.artifacts.keys().is_empty());
    assert_eq!(f.config.current().await, Some(parse(&older_cms())));
    assert_eq!(f.config.generation(), 0);
}

// ============================== CONTENT CHANGES ================================== //

#[tokio::test]
async fn test_cms_change_refreshes_only_cms() {
    let f = fixture(Some(older_cms()), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.route(&cms_url("CMS-21000.json"), r#"{"slides":["a"]}"#);
    let mut reloads = f.config.subscribe();

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::Applied);
    assert_eq!(
        f.fetch.calls(),
        vec![device_setting_key(), cms_url("CMS-21000.json")]
    );
    assert_eq!(
        f.artifacts.keys(),
        vec!["CURR_CMS-21000.json".to_string(), config_key()]
    );
    assert_eq!(f.config.cms().await, Some(json!({"slides": ["a"]})));
    assert!(f.config.css().await.is_none());
    assert!(f.installer.installed.lock().unwrap().is_empty());

    assert_eq!(f.config.current().await, Some(parse(&document())));
    let event = reloads.recv().await.unwrap();
    assert_eq!(event.generation, 1);
}

#[tokio::test]
async fn test_second_cycle_is_idempotent() {
    let f = fixture(Some(older_cms()), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.route(&cms_url("CMS-21000.json"), r#"{"slides":[]}"#);

    assert_eq!(
        f.orchestrator.run_update_check().await.unwrap(),
        CycleOutcome::Applied
    );
    let saved = f.artifacts.get(&config_key()).unwrap();
    let writes = f.artifacts.write_count();
    f.fetch.clear_calls();

    assert_eq!(
        f.orchestrator.run_update_check().await.unwrap(),
        CycleOutcome::UpToDate
    );
    assert_eq!(f.fetch.calls(), vec![device_setting_key()]);
    assert_eq!(f.artifacts.write_count(), writes);
    assert_eq!(f.artifacts.get(&config_key()).unwrap(), saved);
    assert_eq!(f.config.generation(), 1);
}

#[tokio::test]
async fn test_saved_configuration_matches_candidate() {
    let f = fixture(None, &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.route(&cms_url("CMS-21000.json"), "{}");
    f.fetch.route(&css_url(), "body {}");
    f.fetch.route_bytes(&app_url(), b"apk");

    f.orchestrator.run_update_check().await.unwrap();

    let saved: SystemConfiguration =
        serde_json::from_str(&f.artifacts.get_string(&config_key()).unwrap()).unwrap();
    assert_eq!(saved, parse(&document()));
}

#[tokio::test]
async fn test_cms_failure_does_not_stop_the_chain() {
    let installed = doc_with(|d| {
        d["cmsInfo"]["cmsVersion"] = json!("2.0.9");
        d["cmsInfo"]["cssTimestamp"] = json!("299");
    });
    let f = fixture(Some(installed), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.fail(&cms_url("CMS-21000.json"), 500);
    f.fetch.route(&css_url(), "h1 { margin: 0; }");

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::Applied);
    assert!(f.artifacts.get("CURR_CMS-21000.json").is_none());
    assert_eq!(
        f.artifacts.get_string("CSS-21000.css").as_deref(),
        Some("h1 { margin: 0; }")
    );
    assert_eq!(f.config.css().await.as_deref(), Some("h1 { margin: 0; }"));
    assert_eq!(f.config.generation(), 1);
}

fn older_css() -> Value {
    doc_with(|d| d["cmsInfo"]["cssTimestamp"] = json!("299"))
}

#[tokio::test]
async fn test_css_failure_does_not_stop_the_chain() {
    let f = fixture(Some(older_css()), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.fail(&css_url(), 500);

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::Applied);
    assert_eq!(f.fetch.calls(), vec![device_setting_key(), css_url()]);
    assert_eq!(f.artifacts.keys(), vec![config_key()]);
    assert!(f.config.css().await.is_none());

    // App ran and promoted the candidate.
    assert_eq!(f.config.current().await, Some(parse(&document())));
    assert_eq!(f.config.generation(), 1);
}

#[tokio::test]
async fn test_css_missing_after_write_does_not_stop_the_chain() {
    let f = fixture(Some(older_css()), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.route(&css_url(), "body { color: red; }");
    f.artifacts.lose_writes_to("CSS-21000.css");

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::Applied);
    assert!(f.artifacts.get("CSS-21000.css").is_none());
    assert!(f.config.css().await.is_none());
    assert_eq!(f.config.current().await, Some(parse(&document())));
    assert_eq!(f.config.generation(), 1);
}

#[tokio::test]
async fn test_cms_that_is_not_json_is_not_saved() {
    let f = fixture(Some(older_cms()), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.route(&cms_url("CMS-21000.json"), "<html></html>");

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::Applied);
    assert!(f.artifacts.get("CURR_CMS-21000.json").is_none());
    assert!(f.config.cms().await.is_none());
}

// =================================== APP ========================================= //

#[tokio::test]
async fn test_app_change_triggers_install() {
    let installed = doc_with(|d| d["appInfo"]["appVersion"] = json!("1.0.0"));
    let f = fixture(Some(installed.clone()), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.route_bytes(&app_url(), b"\x50\x4b\x03\x04");

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::InstallTriggered);
    assert_eq!(
        *f.installer.installed.lock().unwrap(),
        vec![std::path::PathBuf::from("/memory/kiosk-1.0.1.apk")]
    );
    assert!(f.artifacts.get("kiosk-1.0.1.apk").is_none());
    assert!(f.artifacts.get(&config_key()).is_some());

    // The installer takes over; the in-memory configuration is not promoted.
    assert_eq!(f.config.generation(), 0);
    assert_eq!(f.config.current().await, Some(parse(&installed)));
}

#[tokio::test]
async fn test_app_download_failure() {
    let installed = doc_with(|d| d["appInfo"]["appTimeStamp"] = json!("399"));
    let f = fixture(Some(installed), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.fail(&app_url(), 404);

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::AppDownloadFailed);
    assert!(f.installer.installed.lock().unwrap().is_empty());
    assert_eq!(f.config.generation(), 0);
}

#[tokio::test]
async fn test_installer_failure_removes_download() {
    let installed = doc_with(|d| d["appInfo"]["appVersion"] = json!("1.0.0"));
    let f = fixture(Some(installed), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.route_bytes(&app_url(), b"apk");
    f.installer.fail.store(true, Ordering::SeqCst);

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::AppDownloadFailed);
    assert_eq!(f.installer.installed.lock().unwrap().len(), 1);
    assert!(f.artifacts.get("kiosk-1.0.1.apk").is_none());
}

// ================================== FAILURES ===================================== //

#[tokio::test]
async fn test_candidate_fetch_failure_aborts() {
    let f = fixture(Some(older_cms()), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.fail(&device_setting_key(), 502);

    let err = f.orchestrator.run_update_check().await.unwrap_err();
    assert!(matches!(err, AgentError::NetworkError { status: Some(502), .. }));
    assert!(f.confirm.prompts().is_empty());
    assert!(f.artifacts.keys().is_empty());

    let report = f.orchestrator.last_report().await.unwrap();
    assert!(report.outcome.is_none());
    assert!(report.error.unwrap().contains("502"));
}

#[tokio::test]
async fn test_error_body_without_data_aborts() {
    let f = fixture(Some(document()), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.route(
        &device_setting_key(),
        &json!({ "status": 404, "message": "device not registered" }).to_string(),
    );

    let err = f.orchestrator.run_update_check().await.unwrap_err();
    assert!(matches!(err, AgentError::NetworkError { status: Some(404), .. }));
    assert!(f.confirm.prompts().is_empty());
    assert!(f.artifacts.keys().is_empty());
    assert_eq!(f.config.current().await, Some(parse(&document())));
    assert_eq!(f.config.generation(), 0);
}

#[tokio::test]
async fn test_candidate_without_sections_aborts() {
    let f = fixture(Some(document()), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.fetch.route(
        &device_setting_key(),
        &envelope(&json!({ "message": "device not registered" })),
    );

    let err = f.orchestrator.run_update_check().await.unwrap_err();
    assert!(matches!(err, AgentError::NetworkError { status: None, .. }));
    assert!(f.artifacts.keys().is_empty());
    assert!(f.installer.installed.lock().unwrap().is_empty());
    assert_eq!(f.config.current().await, Some(parse(&document())));
}

#[tokio::test]
async fn test_configuration_write_failure_aborts() {
    let f = fixture(Some(older_cms()), &document(), ScriptedConfirm::new(true), Options::default()).await;
    f.artifacts.fail_writes(true);

    let err = f.orchestrator.run_update_check().await.unwrap_err();
    assert!(matches!(err, AgentError::StorageError(_)));
    assert_eq!(f.fetch.calls(), vec![device_setting_key()]);
    assert_eq!(f.config.generation(), 0);
}

// =================================== FLOOR ======================================= //

fn old_content() -> Value {
    doc_with(|d| {
        d["cmsInfo"]["cmsFileName"] = json!("CMS-19000.json");
        d["cmsInfo"]["cmsVersion"] = json!("1.9.0");
    })
}

fn pinned_content() -> Value {
    doc_with(|d| {
        d["cmsInfo"]["cmsFileName"] = json!("CMS-20001.json");
        d["cmsInfo"]["cmsVersion"] = json!("2.0.1");
    })
}

fn floor_options() -> Options {
    Options {
        installed_app_version: "1.0.0".to_string(),
        ..Options::default()
    }
}

#[tokio::test]
async fn test_floor_pins_old_content() {
    let f = fixture(Some(document()), &old_content(), ScriptedConfirm::new(true), floor_options()).await;
    f.fetch.route(&cms_url("CMS-20001.json"), r#"{"pinned":true}"#);

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::Applied);
    assert_eq!(
        f.fetch.calls(),
        vec![device_setting_key(), cms_url("CMS-20001.json")]
    );
    assert!(f.artifacts.get("CURR_CMS-20001.json").is_some());

    let saved: SystemConfiguration =
        serde_json::from_str(&f.artifacts.get_string(&config_key()).unwrap()).unwrap();
    assert_eq!(saved.cms_info.cms_file_name.as_deref(), Some("CMS-20001.json"));
    assert_eq!(saved.cms_info.cms_version.as_deref(), Some("2.0.1"));
}

#[tokio::test]
async fn test_floor_applies_before_comparison() {
    let f = fixture(Some(pinned_content()), &old_content(), ScriptedConfirm::new(true), floor_options()).await;

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::UpToDate);
}

#[tokio::test]
async fn test_unaffected_app_keeps_old_content() {
    let f = fixture(Some(pinned_content()), &old_content(), ScriptedConfirm::new(true), Options {
        installed_app_version: "0.9.0".to_string(),
        ..Options::default()
    })
    .await;
    f.fetch.route(&cms_url("CMS-19000.json"), "{}");

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::Applied);
    assert!(f.artifacts.get("CURR_CMS-19000.json").is_some());
}

// ================================== CONFIRM ====================================== //

#[tokio::test]
async fn test_declining_the_file_write_keeps_the_old_file() {
    let installed = doc_with(|d| d["cmsInfo"]["cssVersion"] = json!("2.0.9"));
    let confirm = ScriptedConfirm::new(true).then(true).then(false);
    let options = Options {
        confirm_system_config: true,
        ..Options::default()
    };
    let f = fixture(Some(installed), &document(), confirm, options).await;
    f.fetch.route(&css_url(), "p {}");

    let outcome = f.orchestrator.run_update_check().await.unwrap();
    assert_eq!(outcome, CycleOutcome::Applied);
    assert_eq!(
        f.confirm.prompts(),
        vec![UPDATE_PROMPT.to_string(), SYSTEM_CONFIG_PROMPT.to_string()]
    );
    assert!(f.artifacts.get(&config_key()).is_none());
    assert_eq!(f.artifacts.get_string("CSS-21000.css").as_deref(), Some("p {}"));
}

/// Holds the first prompt until released
struct GateConfirm {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Confirm for GateConfirm {
    async fn confirm(&self, _message: &str) -> bool {
        self.entered.notify_one();
        self.release.notified().await;
        false
    }
}

#[tokio::test]
async fn test_overlapping_check_reports_already_running() {
    let artifacts = Arc::new(MemoryStore::new());
    let fetch = Arc::new(ScriptedFetch::new());
    fetch.route(&device_setting_key(), &envelope(&document()));
    let config = Arc::new(ConfigStore::new());
    config.install(parse(&older_cms())).await;
    let gate = Arc::new(GateConfirm {
        entered: Notify::new(),
        release: Notify::new(),
    });

    let orchestrator = Arc::new(UpdateOrchestrator::new(
        SERIAL.to_string(),
        Options::default(),
        fetch.clone(),
        artifacts,
        config,
        gate.clone(),
        Arc::new(RecordingInstaller::default()),
    ));

    let first = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run_update_check().await })
    };
    gate.entered.notified().await;

    let second = orchestrator.run_update_check().await.unwrap();
    assert_eq!(second, CycleOutcome::AlreadyRunning);
    assert_eq!(fetch.calls().len(), 1);

    gate.release.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), CycleOutcome::Declined);

    // The guard is released once the first cycle ends.
    gate.release.notify_one();
    assert_eq!(
        orchestrator.run_update_check().await.unwrap(),
        CycleOutcome::Declined
    );
}
