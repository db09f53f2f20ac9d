//! Kebulan Deployer - Entry Point
//!
//! Runs the deployment lifecycle service with its local HTTP control surface,
//! or a single demo deployment with `--demo`.

use std::collections::HashMap;
use std::env;

use kebulan::app::options::AppOptions;
use kebulan::app::run::run;
use kebulan::demo::{run_demo, DemoOptions};
use kebulan::logs::{init_logging, LogOptions};
use kebulan::storage::layout::StorageLayout;
use kebulan::storage::settings::Settings;
use kebulan::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let mut cli_args: HashMap<String, String> = HashMap::new();
    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            cli_args.insert(key.trim_start_matches('-').to_string(), value.to_string());
        } else if arg.starts_with("--") {
            cli_args.insert(arg.trim_start_matches('-').to_string(), "true".to_string());
        }
    }

    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to render version: {e}"),
        }
        return;
    }

    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };
    let settings_file = match cli_args.get("config") {
        Some(path) => kebulan::filesys::file::File::new(path),
        None => layout.settings_file(),
    };

    // Write default settings and exit
    if cli_args.contains_key("init") {
        match settings_file.write_json(&Settings::default()).await {
            Ok(()) => println!("Wrote default settings to {}", settings_file.path().display()),
            Err(e) => eprintln!("Failed to write settings: {e}"),
        }
        return;
    }

    let settings = match Settings::load(&settings_file).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {e}");
            return;
        }
    };

    let is_demo = cli_args.contains_key("demo");

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        // the demo prints its own output
        stdout: !is_demo || cli_args.contains_key("verbose"),
        json_format: settings.log_json,
        log_dir: settings.log_to_file.then(|| layout.logs_dir()),
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = AppOptions::from_settings(&settings, layout);

    if is_demo {
        let demo = DemoOptions {
            project_id: cli_args
                .get("project")
                .cloned()
                .unwrap_or_else(|| "demo-project".to_string()),
            name: cli_args.get("name").cloned(),
            simulator: options.simulator,
            poller: options.poller,
        };
        if let Err(e) = run_demo(demo).await {
            eprintln!("Demo failed: {e:#}");
        }
        return;
    }

    info!("Running Kebulan deployer with options: {:?}", options);
    if let Err(e) = run(options, await_shutdown_signal()).await {
        error!("Failed to run the deployer: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Unable to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

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
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
