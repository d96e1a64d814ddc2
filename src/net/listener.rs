//! Plain and TLS listeners.
//!
//! # Responsibilities
//! - Resolve Go-style listen addresses (":8080" means all interfaces)
//! - Bind and serve an axum app over plain TCP or TLS
//! - Drain gracefully when the shutdown signal fires
//!
//! Each function runs until the listener stops; an `Err` is a failure the
//! supervisor should react to, `Ok` is a clean shutdown.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::net::tls::load_tls_config;

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listen address could not be resolved.
    #[error("invalid listen address `{addr}`: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// Certificate or key could not be loaded.
    #[error("failed to load TLS certificate: {0}")]
    Tls(#[source] std::io::Error),
    /// The server stopped with an error.
    #[error("server on {addr} failed: {source}")]
    Serve {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve a listen address. A bare `:port` binds every IPv4 interface.
pub async fn resolve_bind_addr(addr: &str) -> Result<SocketAddr, ListenerError> {
    let resolve_err = |source| ListenerError::Resolve {
        addr: addr.to_string(),
        source,
    };

    let candidate = match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => addr.to_string(),
    };

    let resolved = tokio::net::lookup_host(candidate.as_str())
        .await
        .map_err(resolve_err)?
        .next()
        .ok_or_else(|| {
            resolve_err(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "address resolved to nothing",
            ))
        });
    resolved
}

/// Bind `addr` and serve `app` over plain HTTP.
pub async fn serve_plain(
    addr: &str,
    app: Router,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), ListenerError> {
    let addr = resolve_bind_addr(addr).await?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;
    serve_listener(listener, app, shutdown).await
}

/// Serve `app` over plain HTTP on an already-bound listener.
pub async fn serve_listener(
    listener: TcpListener,
    app: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ListenerError> {
    let addr = listener.local_addr().map_err(|source| ListenerError::Serve {
        addr: SocketAddr::from(([0, 0, 0, 0], 0)),
        source,
    })?;
    tracing::info!(address = %addr, "HTTP listener bound");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
        .map_err(|source| ListenerError::Serve { addr, source })?;

    tracing::info!(address = %addr, "HTTP listener stopped");
    Ok(())
}

/// Bind `addr` and serve `app` over TLS with the given certificate and key.
pub async fn serve_tls(
    addr: &str,
    cert: &Path,
    key: &Path,
    app: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ListenerError> {
    let addr = resolve_bind_addr(addr).await?;
    let tls = load_tls_config(cert, key).await.map_err(ListenerError::Tls)?;

    let handle = axum_server::Handle::new();
    let drain = handle.clone();
    let watcher = tokio::spawn(async move {
        let _ = shutdown.recv().await;
        drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
    });

    tracing::info!(address = %addr, "TLS listener starting");
    let result = axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await;
    watcher.abort();

    result.map_err(|source| ListenerError::Serve { addr, source })?;
    tracing::info!(address = %addr, "TLS listener stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_go_style_port() {
        let addr = resolve_bind_addr(":8080").await.unwrap();
        assert_eq!(addr, "0.0.0.0:8080".parse().unwrap());

        let addr = resolve_bind_addr("127.0.0.1:9000").await.unwrap();
        assert_eq!(addr, "127.0.0.1:9000".parse().unwrap());
    }

    #[tokio::test]
    async fn rejects_garbage_address() {
        let err = resolve_bind_addr("not-an-address").await.unwrap_err();
        assert!(matches!(err, ListenerError::Resolve { .. }));
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();
        let (_tx, rx) = broadcast::channel(1);

        let err = serve_plain(&addr, Router::new(), rx).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn tls_without_certificate_fails() {
        let (_tx, rx) = broadcast::channel(1);
        let err = serve_tls("127.0.0.1:0", Path::new(""), Path::new(""), Router::new(), rx)
            .await
            .unwrap_err();
        assert!(matches!(err, ListenerError::Tls(_)));
    }

    #[tokio::test]
    async fn plain_listener_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = broadcast::channel(1);

        let server = tokio::spawn(serve_listener(listener, Router::new(), rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("listener should stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
