//! Signage Agent - Entry Point
//!
//! Keeps a kiosk's configuration, content and app binary in step with the
//! gateway, and holds the live attendance session.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use signage_agent::app::options::AppOptions;
use signage_agent::app::run::run;
use signage_agent::app::state::AppState;
use signage_agent::logs::{init_logging, LogLevel, LogOptions};
use signage_agent::storage::layout::StorageLayout;
use signage_agent::storage::settings::Settings;
use signage_agent::update::confirm::PromptConfirm;
use signage_agent::utils::{run_diagnostic, version_info};

use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return ExitCode::SUCCESS;
    }

    let layout = match cli_args.get("storage") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };

    // Retrieve the settings file
    let settings = match Settings::load(&layout.settings_file()).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Run diagnostics
    if cli_args.contains_key("diagnostic") || cli_args.contains_key("diag") {
        return if run_diagnostic(&layout, &settings).await {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    // Initialize logging, --log-level wins over the settings file
    let log_level = match cli_args.get("log-level").map(|l| l.parse::<LogLevel>()) {
        Some(Ok(level)) => level,
        Some(Err(e)) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
        None => settings.log_level,
    };
    let log_options = LogOptions {
        log_level,
        json_format: settings.log_json,
        log_dir: settings.log_to_file.then(|| layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = AppOptions::from_settings(layout, &settings);

    // One interactive update cycle
    if cli_args.contains_key("check-update") {
        return check_update(version.version, options).await;
    }

    info!("Running signage agent with options: {:?}", options);
    match run(version.version, options, await_shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to run the agent: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn check_update(agent_version: String, mut options: AppOptions) -> ExitCode {
    options.enable_session = false;

    let state = match AppState::init(agent_version, &options, Arc::new(PromptConfirm)).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to start agent: {}", e);
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    match state.orchestrator.run_update_check().await {
        Ok(outcome) => {
            println!("Update check: {}", outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Update check failed: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to listen for SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to listen for SIGINT");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
