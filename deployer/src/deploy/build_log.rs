//! Build log appender

use chrono::Utc;
use tracing::debug;

use crate::models::deployment::{BuildLog, BuildLogLevel, Deployment};
use crate::utils::generate_uuid;

/// Append a timestamped log line to a deployment and bump its revision
pub fn append_log(deployment: &mut Deployment, level: BuildLogLevel, message: impl Into<String>) {
    let log = BuildLog {
        id: format!("log_{}", generate_uuid()),
        timestamp: Utc::now(),
        level,
        message: message.into(),
    };

    debug!(
        deployment_id = %deployment.id,
        level = level.as_str(),
        "{}",
        log.message
    );

    deployment.build_logs.push(log);
    deployment.touch();
}
