//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, host lookup on a table snapshot)
//!     → request.rs (URI rewrite, X-Forwarded-* headers)
//!     → forward.rs (pooled upstream client, streaming)
//!     → response.rs (strip hop-by-hop headers, 404 / 502)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardContext, ForwardError, Forwarder};
pub use server::Dispatcher;
