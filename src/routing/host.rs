//! Host normalization.
//!
//! # Design Decisions
//! - Hosts compare case-insensitively (ASCII lowercase on both sides)
//! - A trailing root dot is dropped (`example.com.` == `example.com`)
//! - Origins written as URLs in config are reduced to their authority
//! - No wildcard or suffix matching

use axum::body::Body;
use axum::http::{header, Request};

/// Normalize a host or authority string for table lookups.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let (name, port) = split_port(host);
    let name = name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase();
    match port {
        Some(port) => format!("{}:{}", name, port),
        None => name,
    }
}

/// Normalize an origin as written in the configuration.
///
/// Accepts bare hosts (`foo.example.com`), authorities (`foo.example.com:8080`)
/// and URLs (`https://foo.example.com/`). Returns `None` when nothing usable
/// remains.
pub fn normalize_origin(origin: &str) -> Option<String> {
    let mut rest = origin.trim();
    if let Some(idx) = rest.find("://") {
        rest = &rest[idx + 3..];
    }
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    // Drop userinfo, it never appears in a Host header.
    let authority = authority.rsplit('@').next().unwrap_or_default();
    if authority.is_empty() {
        return None;
    }
    Some(normalize_host(authority))
}

/// Strip the port from a normalized authority, if it carries one.
pub fn without_port(authority: &str) -> Option<&str> {
    match split_port(authority) {
        (name, Some(_)) => Some(name),
        (_, None) => None,
    }
}

/// Extract the host the request is addressed to.
///
/// HTTP/1.1 carries it in the `Host` header; HTTP/2 requests may only have
/// the `:authority` pseudo-header, which surfaces as the URI authority.
pub fn request_host(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_owned()))
        .map(|h| normalize_host(&h))
}

fn split_port(authority: &str) -> (&str, Option<&str>) {
    // Bracketed IPv6 literal: "[::1]:8080"
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => {
                let port = authority[end + 1..].strip_prefix(':');
                (&authority[..=end], port.filter(|p| !p.is_empty()))
            }
            None => (authority, None),
        };
    }
    match authority.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            (name, Some(port))
        }
        _ => (authority, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("Foo.Example.COM"), "foo.example.com");
        assert_eq!(normalize_host("foo.example.com."), "foo.example.com");
        assert_eq!(normalize_host("Foo.example.com:8080"), "foo.example.com:8080");
        assert_eq!(normalize_host("[::1]:443"), "[::1]:443");
    }

    #[test]
    fn test_normalize_origin() {
        assert_eq!(
            normalize_origin("https://Foo.example.com/").as_deref(),
            Some("foo.example.com")
        );
        assert_eq!(
            normalize_origin("foo.example.com:8443").as_deref(),
            Some("foo.example.com:8443")
        );
        assert_eq!(normalize_origin("http://user@bar.test/x").as_deref(), Some("bar.test"));
        assert_eq!(normalize_origin("   "), None);
        assert_eq!(normalize_origin("https://"), None);
    }

    #[test]
    fn test_without_port() {
        assert_eq!(without_port("foo.example.com:8080"), Some("foo.example.com"));
        assert_eq!(without_port("foo.example.com"), None);
        assert_eq!(without_port("[::1]:80"), Some("[::1]"));
    }

    #[test]
    fn test_request_host() {
        let req = Request::builder()
            .header("Host", "EXAMPLE.com")
            .body(Body::default())
            .unwrap();
        assert_eq!(request_host(&req).as_deref(), Some("example.com"));

        let req = Request::builder()
            .uri("https://h2.example.com/path")
            .body(Body::default())
            .unwrap();
        assert_eq!(request_host(&req).as_deref(), Some("h2.example.com"));

        let req = Request::builder().uri("/").body(Body::default()).unwrap();
        assert_eq!(request_host(&req), None);
    }
}
