//! Settings file management

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::deploy::simulator::SimulatorSettings;
use crate::deploy::timing::{MAX_BUILD_TIME_SECS, MIN_BUILD_TIME_SECS};
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Deployer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Also write logs to daily files under the logs directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Domain generated deployment URLs live under
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Simulated build timing
    #[serde(default)]
    pub simulator: SimulatorTiming,

    /// Store polling and persistence timing
    #[serde(default)]
    pub store: StoreTiming,

    /// Local HTTP server
    #[serde(default)]
    pub server: ServerSettings,

    /// Enable local HTTP server
    #[serde(default = "default_true")]
    pub enable_server: bool,

    /// Enable the active deployment refresher
    #[serde(default = "default_true")]
    pub enable_refresher: bool,

    /// Enable the pushed update listener
    #[serde(default = "default_true")]
    pub enable_update_listener: bool,

    /// Persist the store snapshot on change
    #[serde(default = "default_true")]
    pub persist_snapshots: bool,
}

fn default_true() -> bool {
    true
}

fn default_domain() -> String {
    "kebulan-apps.com".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_to_file: false,
            domain: default_domain(),
            simulator: SimulatorTiming::default(),
            store: StoreTiming::default(),
            server: ServerSettings::default(),
            enable_server: true,
            enable_refresher: true,
            enable_update_listener: true,
            persist_snapshots: true,
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file does not exist
    pub async fn load(file: &File) -> Result<Self, DeployError> {
        if !file.exists().await {
            warn!(
                "Settings file {} not found, using defaults",
                file.path().display()
            );
            return Ok(Self::default());
        }

        let settings = file
            .read_json::<Settings>()
            .await
            .map_err(|e| DeployError::ConfigError(format!("{}: {}", file.path().display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the simulator cannot honor
    pub fn validate(&self) -> Result<(), DeployError> {
        let bounds = MIN_BUILD_TIME_SECS..=MAX_BUILD_TIME_SECS;
        for secs in [
            self.simulator.build_time_min_secs,
            self.simulator.build_time_max_secs,
        ] {
            if !bounds.contains(&secs) {
                return Err(DeployError::ConfigError(format!(
                    "build time {}s outside {}..={}s",
                    secs, MIN_BUILD_TIME_SECS, MAX_BUILD_TIME_SECS
                )));
            }
        }

        if self.simulator.build_time_min_secs > self.simulator.build_time_max_secs {
            return Err(DeployError::ConfigError(
                "build_time_min_secs exceeds build_time_max_secs".to_string(),
            ));
        }
        Ok(())
    }

    pub fn simulator_settings(&self) -> SimulatorSettings {
        SimulatorSettings {
            domain: self.domain.clone(),
            step_delay: (
                Duration::from_millis(self.simulator.step_delay_min_ms),
                Duration::from_millis(self.simulator.step_delay_max_ms),
            ),
            build_time_secs: (
                self.simulator.build_time_min_secs,
                self.simulator.build_time_max_secs,
            ),
        }
    }
}

/// Simulated build timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorTiming {
    #[serde(default = "default_step_delay_min_ms")]
    pub step_delay_min_ms: u64,

    #[serde(default = "default_step_delay_max_ms")]
    pub step_delay_max_ms: u64,

    #[serde(default = "default_build_time_min_secs")]
    pub build_time_min_secs: u32,

    #[serde(default = "default_build_time_max_secs")]
    pub build_time_max_secs: u32,
}

fn default_step_delay_min_ms() -> u64 {
    1000
}

fn default_step_delay_max_ms() -> u64 {
    3000
}

fn default_build_time_min_secs() -> u32 {
    30
}

fn default_build_time_max_secs() -> u32 {
    90
}

impl Default for SimulatorTiming {
    fn default() -> Self {
        Self {
            step_delay_min_ms: default_step_delay_min_ms(),
            step_delay_max_ms: default_step_delay_max_ms(),
            build_time_min_secs: default_build_time_min_secs(),
            build_time_max_secs: default_build_time_max_secs(),
        }
    }
}

/// Store polling and persistence timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreTiming {
    /// Interval of the per-deployment poller
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Interval of the active deployment refresher
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Quiet period before a changed store is written to disk
    #[serde(default = "default_persist_debounce_ms")]
    pub persist_debounce_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_refresh_interval_ms() -> u64 {
    3000
}

fn default_persist_debounce_ms() -> u64 {
    500
}

impl Default for StoreTiming {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
            persist_debounce_ms: default_persist_debounce_ms(),
        }
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
