//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! onering.toml + command-line flags
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (apply overrides)
//!     → ProxyConfig
//!
//! On change:
//!     watcher.rs detects a write to the file (directory-level watch)
//!     → reload.rs loads the new config
//!     → routing table rebuilt
//!     → atomic swap of the live table
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - A config that fails to load never replaces the running one
//! - Listener settings are read once at startup

pub mod cli;
pub mod loader;
pub mod reload;
pub mod schema;
pub mod watcher;

pub use cli::{Cli, Overrides};
pub use loader::{load_config, ConfigError};
pub use reload::{ConfigSource, FileSource, ReloadCoordinator, ReloadOutcome};
pub use schema::{DomainMap, ProxyConfig, SupervisorConfig};
pub use watcher::{ConfigWatcher, ReloadSignal};
