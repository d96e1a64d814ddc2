//! Request dispatch.
//!
//! # Responsibilities
//! - Create the Axum Router shared by the plain and TLS listeners
//! - Wire up middleware (tracing, request ID)
//! - Resolve the request host against one snapshot of the live table
//! - Hand matched requests to the forwarder, answer 404 otherwise

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::forward::{ForwardContext, Forwarder};
use crate::http::response;
use crate::observability::metrics;
use crate::routing::host::request_host;
use crate::routing::LiveTable;

/// Per-request handler state: the live table and the forwarder.
#[derive(Clone)]
pub struct Dispatcher {
    table: LiveTable,
    forwarder: Arc<Forwarder>,
    proto: &'static str,
}

impl Dispatcher {
    /// Dispatcher for the plain HTTP listener.
    pub fn plain(table: LiveTable, forwarder: Arc<Forwarder>) -> Self {
        Self {
            table,
            forwarder,
            proto: "http",
        }
    }

    /// Dispatcher for the TLS listener.
    pub fn tls(table: LiveTable, forwarder: Arc<Forwarder>) -> Self {
        Self {
            table,
            forwarder,
            proto: "https",
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(self) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(self)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Route one request.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        // One snapshot per request: a concurrent reload never changes the
        // table under an in-flight request.
        let table = self.table.snapshot();

        let host = request_host(&request);
        let Some(target) = host.as_deref().and_then(|h| table.lookup(h)) else {
            tracing::debug!(host = host.as_deref().unwrap_or("-"), "No route for host");
            metrics::record_request("not_found", 404, start);
            return response::not_found();
        };

        let client_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let ctx = ForwardContext {
            client_addr,
            proto: self.proto,
        };

        tracing::debug!(
            host = host.as_deref().unwrap_or("-"),
            upstream = %target,
            method = %request.method(),
            path = %request.uri().path(),
            "Forwarding request"
        );

        match self.forwarder.forward(target, request, ctx).await {
            Ok(response) => {
                metrics::record_request("forwarded", response.status().as_u16(), start);
                response
            }
            Err(e) => {
                tracing::error!(upstream = %target, error = %e, "Upstream error");
                metrics::record_request("upstream_error", 502, start);
                response::bad_gateway()
            }
        }
    }
}

async fn proxy_handler(State(dispatcher): State<Dispatcher>, request: Request<Body>) -> Response {
    dispatcher.handle(request).await
}
