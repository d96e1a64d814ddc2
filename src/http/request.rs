//! Request handling and transformation.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the selected target
//! - Record the original client, host and scheme in `X-Forwarded-*`
//!
//! # Design Decisions
//! - The inbound `Host` header is passed through unchanged
//! - Target path acts as a prefix; exactly one slash joins the two paths
//! - Target query and request query are both kept, joined with `&`

use std::net::IpAddr;

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use axum::http::uri::{PathAndQuery, Uri};

use crate::routing::Target;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Join a target path prefix and a request path with exactly one slash.
pub fn join_path(prefix: &str, path: &str) -> String {
    match (prefix.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", prefix, &path[1..]),
        (false, false) => format!("{}/{}", prefix, path),
        _ => format!("{}{}", prefix, path),
    }
}

/// Combine the target's query with the request's query.
pub fn merge_query(target: Option<&str>, request: Option<&str>) -> Option<String> {
    match (target, request.filter(|q| !q.is_empty())) {
        (Some(t), Some(r)) => Some(format!("{}&{}", t, r)),
        (Some(t), None) => Some(t.to_string()),
        (None, Some(r)) => Some(r.to_string()),
        (None, None) => None,
    }
}

/// Build the absolute upstream URI for `original` on `target`.
pub fn upstream_uri(target: &Target, original: &Uri) -> Result<Uri, axum::http::Error> {
    let path = join_path(target.path_prefix(), original.path());
    let path_and_query = match merge_query(target.query(), original.query()) {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };

    Uri::builder()
        .scheme(target.scheme().clone())
        .authority(target.authority().clone())
        .path_and_query(PathAndQuery::try_from(path_and_query)?)
        .build()
}

/// Set `X-Forwarded-For` (appending the client), `X-Forwarded-Host` and
/// `X-Forwarded-Proto`.
pub fn set_forwarded_headers(
    headers: &mut HeaderMap,
    client_ip: Option<IpAddr>,
    host: Option<&HeaderValue>,
    proto: &'static str,
) {
    if let Some(ip) = client_ip {
        let prior: Vec<&str> = headers
            .get_all(&X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let value = if prior.is_empty() {
            ip.to_string()
        } else {
            format!("{}, {}", prior.join(", "), ip)
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    if let Some(host) = host {
        headers.insert(X_FORWARDED_HOST, host.clone());
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static(proto));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "/api"), "/api");
        assert_eq!(join_path("/base", "/api"), "/base/api");
        assert_eq!(join_path("/base/", "/api"), "/base/api");
        assert_eq!(join_path("/base", "api"), "/base/api");
        assert_eq!(join_path("/base/", "api"), "/base/api");
    }

    #[test]
    fn test_merge_query() {
        assert_eq!(merge_query(None, None), None);
        assert_eq!(merge_query(Some("a=1"), None).as_deref(), Some("a=1"));
        assert_eq!(merge_query(None, Some("b=2")).as_deref(), Some("b=2"));
        assert_eq!(merge_query(Some("a=1"), Some("b=2")).as_deref(), Some("a=1&b=2"));
        assert_eq!(merge_query(None, Some("")), None);
    }

    #[test]
    fn test_upstream_uri() {
        let target = Target::parse("https://backend.internal:8443/app?key=k").unwrap();
        let original: Uri = "/users/42?page=2".parse().unwrap();

        let uri = upstream_uri(&target, &original).unwrap();
        assert_eq!(uri.to_string(), "https://backend.internal:8443/app/users/42?key=k&page=2");

        let target = Target::parse("http://localhost:9001").unwrap();
        let uri = upstream_uri(&target, &"/".parse().unwrap()).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:9001/");
    }

    #[test]
    fn test_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(&X_FORWARDED_FOR, HeaderValue::from_static("10.0.0.1"));
        let host = HeaderValue::from_static("foo.example.com");

        set_forwarded_headers(&mut headers, Some("192.168.1.5".parse().unwrap()), Some(&host), "https");

        assert_eq!(headers[&X_FORWARDED_FOR], "10.0.0.1, 192.168.1.5");
        assert_eq!(headers[&X_FORWARDED_HOST], "foo.example.com");
        assert_eq!(headers[&X_FORWARDED_PROTO], "https");
    }

    #[test]
    fn test_forwarded_for_without_prior_value() {
        let mut headers = HeaderMap::new();
        set_forwarded_headers(&mut headers, Some("::1".parse().unwrap()), None, "http");
        assert_eq!(headers[&X_FORWARDED_FOR], "::1");
        assert!(headers.get(&X_FORWARDED_HOST).is_none());
    }
}
