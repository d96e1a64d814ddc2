//! onering: a reverse proxy routing by `Host` header, with hot reload.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::ProxyConfig;
pub use http::Dispatcher;
pub use lifecycle::Shutdown;
pub use routing::{LiveTable, RoutingTable};
