//! One-shot demo deployment printed to the terminal

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use colored::Colorize;

use crate::deploy::fsm::DeploymentStatus;
use crate::deploy::service::DeploymentService;
use crate::deploy::simulator::SimulatorSettings;
use crate::models::deployment::{BuildLog, BuildLogLevel, Deployment};
use crate::store::deployments::DeploymentStore;
use crate::workers::poller;

/// Demo options
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub project_id: String,
    pub name: Option<String>,
    pub simulator: SimulatorSettings,
    pub poller: poller::Options,
}

/// Deploy once and stream the build log until the deployment is terminal
pub async fn run_demo(options: DemoOptions) -> anyhow::Result<Deployment> {
    let service = Arc::new(DeploymentService::new(&options.simulator));
    let store = Arc::new(DeploymentStore::new(service, options.poller.clone()));

    let deployment = store
        .deploy_project(&options.project_id, options.name.as_deref())
        .await
        .context("deploy request rejected")?;

    println!(
        "{} {} ({}) for project {}",
        "Deploying".bold(),
        deployment.name.cyan(),
        deployment.id.dimmed(),
        deployment.project_id
    );

    let mut printed = 0;
    loop {
        tokio::time::sleep(options.poller.interval.min(Duration::from_millis(250))).await;

        let current = store
            .get_deployment(&deployment.id)
            .ok_or_else(|| anyhow!("deployment {} vanished from the store", deployment.id))?;

        for log in current.build_logs.iter().skip(printed) {
            print_log(log);
        }
        printed = current.build_logs.len();

        if current.is_terminal() {
            print_summary(&current);
            store.shutdown();
            return Ok(current);
        }
    }
}

fn print_log(log: &BuildLog) {
    let time = log.timestamp.format("%H:%M:%S").to_string();
    let level = match log.level {
        BuildLogLevel::Info => "info ".green(),
        BuildLogLevel::Warn => "warn ".yellow(),
        BuildLogLevel::Error => "error".red(),
    };
    println!("  {} {} {}", time.dimmed(), level, log.message);
}

fn print_summary(deployment: &Deployment) {
    match deployment.status {
        DeploymentStatus::Ready => println!(
            "{} {} in {}s",
            "Ready".green().bold(),
            deployment.url.as_deref().unwrap_or_default().underline(),
            deployment.build_time.unwrap_or_default()
        ),
        DeploymentStatus::Error => println!(
            "{} {}",
            "Failed".red().bold(),
            deployment.error.as_deref().unwrap_or("unknown error")
        ),
        status => println!("{} {}", "Stopped".yellow().bold(), status),
    }
}
