//! onering: a reverse proxy with a focus on simplicity.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                   ONERING                    │
//!                      │                                              │
//!   Client Request     │  ┌───────────┐   ┌────────────┐              │
//!   ───────────────────┼─▶│ listener  │──▶│ dispatcher │──┐           │
//!                      │  │ plain/TLS │   │ host lookup│  │           │
//!                      │  └─────▲─────┘   └─────▲──────┘  ▼           │
//!                      │        │               │   ┌───────────┐     │     Backend
//!                      │  ┌─────┴─────┐   ┌─────┴─┐ │ forwarder │─────┼───▶ Target
//!                      │  │supervisor │   │ live  │ └───────────┘     │
//!                      │  │ (retry)   │   │ table │                   │
//!                      │  └───────────┘   └───▲───┘                   │
//!                      │                      │ swap                  │
//!                      │  ┌─────────┐   ┌─────┴──────┐                │
//!   onering.toml ──────┼─▶│ watcher │──▶│  reload    │                │
//!                      │  └─────────┘   │coordinator │                │
//!                      │                └────────────┘                │
//!                      └──────────────────────────────────────────────┘
//! ```

use onering::config::Cli;
use onering::lifecycle::startup;
use onering::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();
    logging::init_logging();

    tracing::info!("onering v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = startup::run(cli).await {
        tracing::error!(error = %e, "Fatal error");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
