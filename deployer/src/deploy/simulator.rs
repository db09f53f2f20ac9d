//! Simulated build process

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::deploy::build_log::append_log;
use crate::deploy::fsm::{DeploymentEvent, DeploymentStatus};
use crate::deploy::registry::DeploymentRegistry;
use crate::deploy::runner::StepRunner;
use crate::deploy::timing::{BuildTiming, MAX_BUILD_TIME_SECS, MIN_BUILD_TIME_SECS};
use crate::errors::DeployError;
use crate::models::deployment::BuildLogLevel;
use crate::utils::slugify;

/// Pseudo-build steps, reported in this order
pub const BUILD_STEPS: [&str; 6] = [
    "Cloning repository...",
    "Installing dependencies...",
    "Building application...",
    "Optimizing assets...",
    "Deploying to CDN...",
    "Configuring domain...",
];

pub const START_MESSAGE: &str = "Starting deployment...";

/// Simulator settings
#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    /// Domain the generated deployment URLs live under
    pub domain: String,

    /// Bounds of the randomized delay before each step
    pub step_delay: (Duration, Duration),

    /// Bounds of the reported build time in seconds
    pub build_time_secs: (u32, u32),
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            domain: "kebulan-apps.com".to_string(),
            step_delay: (Duration::from_secs(1), Duration::from_secs(3)),
            build_time_secs: (30, 90),
        }
    }
}

/// URL a deployment is served from once ready
pub fn deployment_url(name: &str, id: &str, domain: &str) -> String {
    let suffix_start = id
        .char_indices()
        .rev()
        .nth(7)
        .map(|(i, _)| i)
        .unwrap_or(0);
    format!("https://{}-{}.{}", slugify(name), &id[suffix_start..], domain)
}

enum StepsOutcome {
    Completed,
    Aborted,
}

/// Drives a deployment from pending to a terminal status
pub struct DeploymentSimulator {
    registry: Arc<DeploymentRegistry>,
    runner: Arc<dyn StepRunner>,
    timing: Arc<dyn BuildTiming>,
    domain: String,
}

impl DeploymentSimulator {
    pub fn new(
        registry: Arc<DeploymentRegistry>,
        runner: Arc<dyn StepRunner>,
        timing: Arc<dyn BuildTiming>,
        domain: String,
    ) -> Self {
        Self {
            registry,
            runner,
            timing,
            domain,
        }
    }

    /// Run the simulated build to completion. Never returns an error: faults
    /// end up on the record.
    pub async fn run(&self, deployment_id: &str) {
        let started = self
            .registry
            .update(deployment_id, |d| {
                d.apply(DeploymentEvent::Start)
                    .map(|_| append_log(d, BuildLogLevel::Info, START_MESSAGE))
            })
            .await;

        match started {
            Some(Ok(())) => info!("Building deployment {}", deployment_id),
            Some(Err(e)) => {
                debug!("Deployment {} not started: {}", deployment_id, e);
                return;
            }
            None => {
                debug!("Deployment {} removed before build started", deployment_id);
                return;
            }
        }

        let outcome = AssertUnwindSafe(self.run_steps(deployment_id))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(DeployError::StepFailed(panic_message(panic))));

        match outcome {
            Ok(StepsOutcome::Completed) => self.complete(deployment_id).await,
            Ok(StepsOutcome::Aborted) => {
                debug!("Deployment {} left building, stopping simulation", deployment_id);
            }
            Err(e) => self.fail(deployment_id, e).await,
        }
    }

    async fn run_steps(&self, deployment_id: &str) -> Result<StepsOutcome, DeployError> {
        for (index, step) in BUILD_STEPS.iter().enumerate() {
            if !self.is_building(deployment_id).await {
                return Ok(StepsOutcome::Aborted);
            }

            self.runner.run_step(deployment_id, index, step).await?;

            let appended = self
                .registry
                .update(deployment_id, |d| {
                    if d.status != DeploymentStatus::Building {
                        return false;
                    }
                    append_log(d, BuildLogLevel::Info, *step);
                    true
                })
                .await
                .unwrap_or(false);

            if !appended {
                return Ok(StepsOutcome::Aborted);
            }
        }

        Ok(StepsOutcome::Completed)
    }

    async fn is_building(&self, deployment_id: &str) -> bool {
        self.registry
            .get(deployment_id)
            .await
            .is_some_and(|d| d.status == DeploymentStatus::Building)
    }

    async fn complete(&self, deployment_id: &str) {
        let build_time = self
            .timing
            .build_time_secs()
            .clamp(MIN_BUILD_TIME_SECS, MAX_BUILD_TIME_SECS);
        let domain = self.domain.as_str();

        let url = self
            .registry
            .update(deployment_id, |d| {
                let url = deployment_url(&d.name, &d.id, domain);
                d.apply(DeploymentEvent::Succeed {
                    url: url.clone(),
                    build_time,
                })
                .ok()?;
                append_log(
                    d,
                    BuildLogLevel::Info,
                    format!("Deployment ready at {}", url),
                );
                Some(url)
            })
            .await
            .flatten();

        match url {
            Some(url) => info!(
                "Deployment {} ready at {} ({}s)",
                deployment_id, url, build_time
            ),
            None => debug!("Deployment {} left building before completion", deployment_id),
        }
    }

    async fn fail(&self, deployment_id: &str, error: DeployError) {
        warn!("Deployment {} failed: {}", deployment_id, error);

        let message = error.to_string();
        let recorded = self
            .registry
            .update(deployment_id, |d| {
                d.apply(DeploymentEvent::Fail(message.clone())).ok()?;
                append_log(
                    d,
                    BuildLogLevel::Error,
                    format!("Deployment failed: {}", message),
                );
                Some(())
            })
            .await
            .flatten();

        if recorded.is_none() {
            debug!("Deployment {} left building before failure was recorded", deployment_id);
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "build step panicked".to_string()
    }
}
