//! Build step runners

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::deploy::timing::BuildTiming;
use crate::errors::DeployError;

/// Executes one pseudo-build step
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run the step at `index` of `deployment_id`'s build
    async fn run_step(
        &self,
        deployment_id: &str,
        index: usize,
        step: &str,
    ) -> Result<(), DeployError>;
}

/// Runner that only waits, no real work is executed
pub struct SimulatedStepRunner {
    timing: Arc<dyn BuildTiming>,
}

impl SimulatedStepRunner {
    pub fn new(timing: Arc<dyn BuildTiming>) -> Self {
        Self { timing }
    }
}

#[async_trait]
impl StepRunner for SimulatedStepRunner {
    async fn run_step(
        &self,
        deployment_id: &str,
        index: usize,
        step: &str,
    ) -> Result<(), DeployError> {
        let delay = self.timing.step_delay(index);
        debug!(deployment_id, index, ?delay, "Simulating step: {}", step);
        tokio::time::sleep(delay).await;
        Ok(())
    }
}
