//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header)
//!     → host.rs (normalize)
//!     → live.rs (one snapshot of the active table)
//!     → table.rs (exact lookup)
//!     → Return: Target or None
//!
//! Table Compilation (startup and every reload):
//!     [domains] origin → target URL
//!     → Parse targets, drop invalid entries
//!     → Freeze as immutable RoutingTable
//!     → Swap into LiveTable
//! ```
//!
//! # Design Decisions
//! - Tables compiled off the request path, immutable at runtime
//! - Exact host match only, no wildcards
//! - Deterministic: same input always builds the same table

pub mod host;
pub mod live;
pub mod table;

pub use live::LiveTable;
pub use table::{RouteError, RoutingTable, Target, TargetError};
