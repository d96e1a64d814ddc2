//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (plain accept loop via axum::serve)
//!     → tls.rs + listener.rs (TLS accept loop via axum-server)
//!     → Hand off to HTTP layer (dispatcher)
//! ```
//!
//! # Design Decisions
//! - Listeners are plain async functions; restarting them is the
//!   supervisor's job, not theirs
//! - TLS material is loaded on every launch, so a fixed cert file is
//!   picked up on the next restart

pub mod listener;
pub mod tls;

pub use listener::{serve_listener, serve_plain, serve_tls, ListenerError};
