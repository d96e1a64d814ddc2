//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve and load the configuration (file + command-line overrides)
//! - Build the initial routing table
//! - Start the config watcher, reload coordinator and signal handlers
//! - Run both supervised listeners until shutdown
//!
//! # Design Decisions
//! - Only two startup errors are fatal: no config directory, and no config
//!   at all (unreadable or empty file and no command-line overrides)
//! - A watcher that cannot start disables hot reload but not the proxy

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::cli::Cli;
use crate::config::loader::ConfigError;
use crate::config::reload::{build_table, ConfigSource, FileSource, ReloadCoordinator};
use crate::config::watcher::ConfigWatcher;
use crate::config::ProxyConfig;
use crate::http::{Dispatcher, Forwarder};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::{reload_on_hangup, shutdown_on_signal};
use crate::lifecycle::supervisor::{ListenerSupervisor, SupervisorExit};
use crate::net::{serve_plain, serve_tls};
use crate::observability::metrics;
use crate::resilience::policy;
use crate::routing::LiveTable;

/// Fatal errors that end the process.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no configuration available: {0}")]
    Config(#[from] ConfigError),
    #[error("all listeners gave up")]
    ListenersDown,
}

/// Load the startup configuration.
///
/// An unreadable or empty file is tolerated when the command line supplied
/// something to run with; otherwise it is fatal. A file that sets nothing
/// (only comments, say) counts as empty.
pub fn initial_config(source: &FileSource) -> Result<ProxyConfig, ConfigError> {
    match source.load() {
        Ok(config) if source.overrides().is_empty() && config == ProxyConfig::default() => {
            Err(ConfigError::Empty {
                path: source.path().to_path_buf(),
            })
        }
        Ok(config) => Ok(config),
        Err(e) if !source.overrides().is_empty() => {
            tracing::warn!(error = %e, "Config file unavailable, continuing with command-line settings");
            let mut config = ProxyConfig::default();
            source.overrides().apply(&mut config);
            Ok(config)
        }
        Err(e) => Err(e),
    }
}

/// Run the proxy until shutdown.
pub async fn run(cli: Cli) -> Result<(), StartupError> {
    let path = cli.config_path()?;
    let source = FileSource::new(path.clone(), cli.overrides());
    let config = initial_config(&source)?;

    tracing::info!(
        path = %path.display(),
        port = %config.port,
        tls_port = %config.tls_port,
        domains = config.domains.len(),
        "Configuration loaded"
    );

    if let Some(addr) = &config.metrics_address {
        match addr.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(metrics_address = %addr, "Failed to parse metrics address"),
        }
    }

    let (table, _) = build_table(&config);
    if table.is_empty() {
        tracing::warn!("Routing table is empty, every request will get 404");
    } else {
        tracing::info!(hosts = ?table.hosts(), "Routing table built");
    }
    metrics::set_routes(table.len());
    let live = LiveTable::new(table);

    let shutdown = Shutdown::new();
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();

    // Kept alive for the whole run; dropping it stops the watch.
    let _watcher = match ConfigWatcher::new(&path, signal_tx.clone()).and_then(ConfigWatcher::run) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Hot reload disabled for this run");
            None
        }
    };

    let coordinator = ReloadCoordinator::new(source, live.clone(), config.listener_settings());
    tokio::spawn(coordinator.run(signal_rx, shutdown.subscribe()));
    tokio::spawn(reload_on_hangup(signal_tx, shutdown.clone()));
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let forwarder = Arc::new(Forwarder::new());

    let plain_app = Dispatcher::plain(live.clone(), forwarder.clone()).router();
    let port = config.port.clone();
    let plain = ListenerSupervisor::new("http", policy::from_config(&config.supervisor), shutdown.clone())
        .run(move |stop| {
            let port = port.clone();
            let app = plain_app.clone();
            async move { serve_plain(&port, app, stop).await }
        });

    let tls_app = Dispatcher::tls(live, forwarder).router();
    let tls_port = config.tls_port.clone();
    let cert = PathBuf::from(&config.cert);
    let key = PathBuf::from(&config.key);
    let tls = ListenerSupervisor::new("https", policy::from_config(&config.supervisor), shutdown.clone())
        .run(move |stop| {
            let tls_port = tls_port.clone();
            let cert = cert.clone();
            let key = key.clone();
            let app = tls_app.clone();
            async move { serve_tls(&tls_port, &cert, &key, app, stop).await }
        });

    let (plain_exit, tls_exit) = tokio::join!(plain, tls);
    tracing::info!(http = ?plain_exit, https = ?tls_exit, "Listeners stopped");

    match (plain_exit, tls_exit) {
        (SupervisorExit::GaveUp { .. }, SupervisorExit::GaveUp { .. }) => Err(StartupError::ListenersDown),
        _ => Ok(()),
    }
}
