//! Configuration schema definitions.
//!
//! This module defines the configuration structure read from `onering.toml`.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Root configuration for the proxy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listen address for plain HTTP (e.g. ":8080" or "127.0.0.1:8080").
    pub port: String,

    /// Listen address for HTTPS.
    pub tls_port: String,

    /// Path to the TLS certificate (PEM).
    pub cert: String,

    /// Path to the TLS private key (PEM).
    pub key: String,

    /// Prometheus exporter bind address. Metrics endpoint is off when unset.
    pub metrics_address: Option<String>,

    /// Listener restart policy.
    pub supervisor: SupervisorConfig,

    /// Origin host → target URL, in declaration order.
    pub domains: DomainMap,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: ":8080".to_string(),
            tls_port: ":443".to_string(),
            cert: String::new(),
            key: String::new(),
            metrics_address: None,
            supervisor: SupervisorConfig::default(),
            domains: DomainMap::default(),
        }
    }
}

impl ProxyConfig {
    /// Settings that are only read at startup.
    pub fn listener_settings(&self) -> ListenerSettings {
        ListenerSettings {
            port: self.port.clone(),
            tls_port: self.tls_port.clone(),
            cert: self.cert.clone(),
            key: self.key.clone(),
        }
    }
}

/// Listener-facing subset of the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSettings {
    pub port: String,
    pub tls_port: String,
    pub cert: String,
    pub key: String,
}

/// Restart strategy for supervised listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RestartStrategy {
    /// Same delay between every restart.
    #[default]
    Fixed,
    /// Doubling delay with jitter, capped at `max_delay_secs`.
    Exponential,
}

/// Listener supervision configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub strategy: RestartStrategy,

    /// Fixed delay, or base delay for exponential backoff, in seconds.
    pub interval_secs: u64,

    /// Upper bound for exponential backoff in seconds.
    pub max_delay_secs: u64,

    /// Give up after this many launches. 0 = retry forever.
    pub max_attempts: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            strategy: RestartStrategy::Fixed,
            interval_secs: 5,
            max_delay_secs: 60,
            max_attempts: 0,
        }
    }
}

/// Ordered origin → target mapping.
///
/// TOML tables cannot repeat a key, but distinct spellings of one host
/// (`Foo.com` / `foo.com`) and CLI overrides can collide once normalized.
/// Keeping declaration order makes "last one wins" deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainMap(Vec<(String, String)>);

impl DomainMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mapping. Later entries override earlier ones for the same host.
    pub fn push(&mut self, origin: impl Into<String>, target: impl Into<String>) {
        self.0.push((origin.into(), target.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(o, t)| (o.as_str(), t.as_str()))
    }
}

impl<O: Into<String>, T: Into<String>> FromIterator<(O, T)> for DomainMap {
    fn from_iter<I: IntoIterator<Item = (O, T)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(o, t)| (o.into(), t.into())).collect())
    }
}

impl<'a> IntoIterator for &'a DomainMap {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl<'de> Deserialize<'de> for DomainMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DomainVisitor;

        impl<'de> Visitor<'de> for DomainVisitor {
            type Value = DomainMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of origin = \"target URL\" entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut domains = DomainMap::new();
                while let Some((origin, target)) = map.next_entry::<String, String>()? {
                    domains.push(origin, target);
                }
                Ok(domains)
            }
        }

        deserializer.deserialize_map(DomainVisitor)
    }
}

impl Serialize for DomainMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (origin, target) in &self.0 {
            map.serialize_entry(origin, target)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_minimal_config() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.port, ":8080");
        assert_eq!(config.tls_port, ":443");
        assert!(config.domains.is_empty());
        assert_eq!(config.supervisor.strategy, RestartStrategy::Fixed);
        assert_eq!(config.supervisor.interval_secs, 5);
        assert_eq!(config.supervisor.max_attempts, 0);
    }

    #[test]
    fn test_full_config() {
        let config: ProxyConfig = toml::from_str(
            r#"
            port = "127.0.0.1:8000"
            tls_port = ":8443"
            cert = "/etc/onering/cert.pem"
            key = "/etc/onering/key.pem"
            metrics_address = "127.0.0.1:9090"

            [supervisor]
            strategy = "exponential"
            max_attempts = 10

            [domains]
            "foo.example.com" = "http://localhost:9001"
            "bar.example.com" = "https://localhost:9002"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, "127.0.0.1:8000");
        assert_eq!(config.cert, "/etc/onering/cert.pem");
        assert_eq!(config.metrics_address.as_deref(), Some("127.0.0.1:9090"));
        assert_eq!(config.supervisor.strategy, RestartStrategy::Exponential);
        assert_eq!(config.supervisor.interval_secs, 5);
        assert_eq!(config.supervisor.max_attempts, 10);
        assert_eq!(config.domains.len(), 2);
    }

    #[test]
    fn test_domains_keep_declaration_order() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [domains]
            "zeta.example.com" = "http://z"
            "Foo.example.com" = "http://first"
            "alpha.example.com" = "http://a"
            "foo.example.com" = "http://second"
            "#,
        )
        .unwrap();

        let origins: Vec<&str> = config.domains.iter().map(|(o, _)| o).collect();
        assert_eq!(
            origins,
            vec![
                "zeta.example.com",
                "Foo.example.com",
                "alpha.example.com",
                "foo.example.com"
            ]
        );
    }

    #[test]
    fn test_domain_target_must_be_string() {
        let result: Result<ProxyConfig, _> = toml::from_str(
            r#"
            [domains]
            "foo.example.com" = 42
            "#,
        );
        assert!(result.is_err());
    }
}
