//! Single-host forwarding.
//!
//! # Responsibilities
//! - Send one request to one fixed target and stream the response back
//! - Own header rewriting (hop-by-hop, `X-Forwarded-*`)
//! - Reuse upstream connections across requests (pooled client)
//!
//! The forwarder never decides *where* a request goes; the dispatcher hands
//! it the target.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, Version};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::http::request::{set_forwarded_headers, upstream_uri};
use crate::http::response::strip_hop_by_hop;
use crate::routing::Target;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for a forwarding attempt.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("cannot build upstream URI: {0}")]
    Uri(#[from] axum::http::Error),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Per-request facts the forwarder records in `X-Forwarded-*`.
#[derive(Debug, Clone, Copy)]
pub struct ForwardContext {
    pub client_addr: Option<SocketAddr>,
    /// Scheme the client used to reach us: `http` or `https`.
    pub proto: &'static str,
}

/// Pooled HTTP/HTTPS client that relays requests to a target.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl Forwarder {
    pub fn new() -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(CONNECT_TIMEOUT));

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new()).build(https);
        Self { client }
    }

    /// Forward `request` to `target`, preserving method, path, body and the
    /// inbound `Host` header.
    pub async fn forward(
        &self,
        target: &Target,
        mut request: Request<Body>,
        ctx: ForwardContext,
    ) -> Result<Response<Body>, ForwardError> {
        let uri = upstream_uri(target, request.uri())?;
        // HTTP/2 clients send `:authority` instead of a Host header.
        let original_host = request.headers().get(header::HOST).cloned().or_else(|| {
            request
                .uri()
                .authority()
                .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
        });

        let headers = request.headers_mut();
        strip_hop_by_hop(headers);
        if let Some(host) = &original_host {
            headers.entry(header::HOST).or_insert_with(|| host.clone());
        }
        set_forwarded_headers(
            headers,
            ctx.client_addr.map(|addr| addr.ip()),
            original_host.as_ref(),
            ctx.proto,
        );

        *request.uri_mut() = uri;
        // The upstream pool speaks HTTP/1.1 regardless of the client's version.
        *request.version_mut() = Version::HTTP_11;

        let response = self.client.request(request).await?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}
