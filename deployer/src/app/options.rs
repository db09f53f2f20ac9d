//! Application configuration options

use std::time::Duration;

use crate::deploy::simulator::SimulatorSettings;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::workers::{persister, poller, refresher};

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Storage paths
    pub layout: StorageLayout,

    /// Simulated build settings
    pub simulator: SimulatorSettings,

    /// Per-deployment poller options
    pub poller: poller::Options,

    /// Active deployment refresher options
    pub refresher: refresher::Options,

    /// Snapshot persister options
    pub persister: persister::Options,

    /// Server configuration
    pub server: ServerOptions,

    /// Enable local HTTP server
    pub enable_server: bool,

    /// Enable the active deployment refresher
    pub enable_refresher: bool,

    /// Enable the pushed update listener
    pub enable_update_listener: bool,

    /// Load and persist store snapshots
    pub persist_snapshots: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            layout: StorageLayout::default(),
            simulator: SimulatorSettings::default(),
            poller: poller::Options::default(),
            refresher: refresher::Options::default(),
            persister: persister::Options::default(),
            server: ServerOptions::default(),
            enable_server: true,
            enable_refresher: true,
            enable_update_listener: true,
            persist_snapshots: true,
        }
    }
}

impl AppOptions {
    /// Derive options from the settings file
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            layout,
            simulator: settings.simulator_settings(),
            poller: poller::Options {
                interval: Duration::from_millis(settings.store.poll_interval_ms),
            },
            refresher: refresher::Options {
                interval: Duration::from_millis(settings.store.refresh_interval_ms),
            },
            persister: persister::Options {
                debounce: Duration::from_millis(settings.store.persist_debounce_ms),
            },
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            enable_server: settings.enable_server,
            enable_refresher: settings.enable_refresher,
            enable_update_listener: settings.enable_update_listener,
            persist_snapshots: settings.persist_snapshots,
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}
