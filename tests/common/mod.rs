//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{Request, Response};
use axum::Router;
use onering::http::{Dispatcher, Forwarder};
use onering::lifecycle::Shutdown;
use onering::net::serve_listener;
use onering::routing::LiveTable;
use tokio::net::TcpListener;

/// A running echo backend and the number of requests it has seen.
#[allow(dead_code)]
pub struct Backend {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl Backend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a backend on an ephemeral port that echoes the request back:
/// method, path+query and Host in `x-echo-*` headers, body as body.
pub async fn start_echo_backend() -> Backend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));

    let app = Router::new().fallback(echo).with_state(hits.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Backend { addr, hits }
}

async fn echo(State(hits): State<Arc<AtomicU32>>, request: Request<Body>) -> Response<Body> {
    hits.fetch_add(1, Ordering::SeqCst);

    let (parts, body) = request.into_parts();
    let body: Bytes = axum::body::to_bytes(body, 1 << 20).await.unwrap_or_default();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let host = parts
        .headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let forwarded_for = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    Response::builder()
        .header("x-echo-method", parts.method.as_str())
        .header("x-echo-path", path)
        .header("x-echo-host", host)
        .header("x-echo-forwarded-for", forwarded_for)
        .body(Body::from(body))
        .unwrap()
}

/// Start the proxy's plain listener on an ephemeral port.
#[allow(dead_code)]
pub async fn start_proxy(table: LiveTable, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Dispatcher::plain(table, Arc::new(Forwarder::new())).router();

    let stop = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = serve_listener(listener, app, stop).await;
    });

    addr
}

/// Client that never reuses connections or follows redirects.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
