//! Reload coordination.
//!
//! # State Machine
//! ```text
//! Idle ──signal──▶ Reloading ──empty/parse error──▶ Idle (previous table kept)
//!                      │
//!                      └──parsed──▶ build table ──swap──▶ Idle
//! ```
//!
//! Reloading never blocks readers: the new table is built off to the side
//! and published with a single pointer swap.

use std::path::{Path, PathBuf};

use tokio::sync::{broadcast, mpsc};

use crate::config::cli::Overrides;
use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::{ListenerSettings, ProxyConfig};
use crate::config::watcher::ReloadSignal;
use crate::observability::metrics;
use crate::routing::{LiveTable, RouteError, RoutingTable};

/// Something that can produce a fresh configuration on demand.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<ProxyConfig, ConfigError>;
}

/// Reads the config file and layers the command-line overrides on top.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    overrides: Overrides,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, overrides: Overrides) -> Self {
        Self {
            path: path.into(),
            overrides,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<ProxyConfig, ConfigError> {
        let mut config = load_config(&self.path)?;
        self.overrides.apply(&mut config);
        Ok(config)
    }
}

/// Result of a single reload attempt.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// A new table is live. `rejected` lists entries that were dropped.
    Applied {
        routes: usize,
        rejected: Vec<RouteError>,
    },
    /// The configuration could not be read; the previous table stays live.
    Discarded(ConfigError),
}

/// Build a table and log every rejected entry.
pub fn build_table(config: &ProxyConfig) -> (RoutingTable, Vec<RouteError>) {
    let (table, errors) = RoutingTable::build(&config.domains);
    for error in &errors {
        tracing::warn!(origin = %error.origin, error = %error.reason, "Skipping domain entry");
    }
    (table, errors)
}

/// Applies reload signals to the live routing table.
pub struct ReloadCoordinator<S> {
    source: S,
    table: LiveTable,
    listeners: ListenerSettings,
}

impl<S: ConfigSource> ReloadCoordinator<S> {
    /// `listeners` are the settings the listeners were started with; a reload
    /// that changes them only warns, since listeners are not rebound.
    pub fn new(source: S, table: LiveTable, listeners: ListenerSettings) -> Self {
        Self {
            source,
            table,
            listeners,
        }
    }

    /// Perform one reload attempt.
    pub fn reload(&self) -> ReloadOutcome {
        let config = match self.source.load() {
            Ok(config) => config,
            Err(e @ ConfigError::Empty { .. }) => {
                tracing::warn!(error = %e, "Config file is empty, keeping current routing table");
                metrics::record_reload("discarded");
                return ReloadOutcome::Discarded(e);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current routing table");
                metrics::record_reload("discarded");
                return ReloadOutcome::Discarded(e);
            }
        };

        if config.listener_settings() != self.listeners {
            tracing::warn!("Listener settings changed in config; restart to apply them");
        }

        let (table, rejected) = build_table(&config);
        let routes = table.len();
        let previous = self.table.swap(table);
        metrics::record_reload("applied");
        metrics::set_routes(routes);

        tracing::info!(
            routes,
            previous_routes = previous.len(),
            rejected = rejected.len(),
            "Routing table reloaded"
        );

        ReloadOutcome::Applied { routes, rejected }
    }

    /// Process signals in delivery order until the channel closes or
    /// shutdown is triggered.
    pub async fn run(
        self,
        mut signals: mpsc::UnboundedReceiver<ReloadSignal>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(signal) => {
                        tracing::debug!(?signal, "Reload requested");
                        self.reload();
                    }
                    None => {
                        tracing::warn!("Reload signal channel closed, hot reload stopped");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Reload coordinator received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
