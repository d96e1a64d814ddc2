//! Host → target routing table.
//!
//! # Responsibilities
//! - Compile configured domains into an immutable lookup table
//! - Report per-entry failures without failing the whole build
//! - Look up a normalized host
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) host lookup via HashMap
//! - Duplicate origins: the last one in declaration order wins
//! - Explicit `None` rather than a silent default

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use axum::http::uri::{Authority, Scheme};
use thiserror::Error;
use url::Url;

use crate::routing::host::{normalize_origin, without_port};

/// Why a single domain entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("origin is empty")]
    EmptyOrigin,
    #[error("invalid target URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported target scheme `{0}` (expected http or https)")]
    UnsupportedScheme(String),
    #[error("target URL has no host")]
    MissingHost,
    #[error("invalid target authority `{0}`")]
    InvalidAuthority(String),
}

/// A rejected domain entry, tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("domain `{origin}`: {reason}")]
pub struct RouteError {
    pub origin: String,
    pub reason: TargetError,
}

/// A parsed backend target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: Url,
    scheme: Scheme,
    authority: Authority,
}

impl Target {
    /// Parse an absolute `http`/`https` URL.
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let url = Url::parse(raw.trim())?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => return Err(TargetError::UnsupportedScheme(other.to_string())),
        };

        let host = url.host_str().ok_or(TargetError::MissingHost)?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority)
            .map_err(|_| TargetError::InvalidAuthority(authority))?;

        Ok(Self {
            url,
            scheme,
            authority,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Path prefix prepended to every forwarded request path.
    pub fn path_prefix(&self) -> &str {
        self.url.path()
    }

    /// Query merged into every forwarded request.
    pub fn query(&self) -> Option<&str> {
        self.url.query().filter(|q| !q.is_empty())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Immutable mapping from normalized host to target.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: HashMap<String, Target>,
}

impl RoutingTable {
    /// Compile a table from origin/target pairs, in declaration order.
    ///
    /// Entries that fail to parse are skipped and returned as errors; the
    /// remaining entries always produce a usable table.
    pub fn build<I, O, T>(domains: I) -> (Self, Vec<RouteError>)
    where
        I: IntoIterator<Item = (O, T)>,
        O: AsRef<str>,
        T: AsRef<str>,
    {
        let mut routes = HashMap::new();
        let mut errors = Vec::new();

        for (origin, target) in domains {
            let origin = origin.as_ref();
            let Some(host) = normalize_origin(origin) else {
                errors.push(RouteError {
                    origin: origin.to_string(),
                    reason: TargetError::EmptyOrigin,
                });
                continue;
            };

            match Target::parse(target.as_ref()) {
                Ok(target) => {
                    if let Some(previous) = routes.insert(host.clone(), target) {
                        tracing::debug!(
                            host = %host,
                            replaced = %previous,
                            "Duplicate origin, later declaration wins"
                        );
                    }
                }
                Err(reason) => errors.push(RouteError {
                    origin: origin.to_string(),
                    reason,
                }),
            }
        }

        (Self { routes }, errors)
    }

    /// Look up a normalized host.
    ///
    /// The full authority is tried first; a host carrying a port falls back
    /// to its bare name.
    pub fn lookup(&self, host: &str) -> Option<&Target> {
        self.routes
            .get(host)
            .or_else(|| without_port(host).and_then(|name| self.routes.get(name)))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Configured hosts, sorted for stable output.
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        hosts.sort_unstable();
        hosts
    }
}
