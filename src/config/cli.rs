//! Command-line flags and their merge into the file configuration.
//!
//! Long flags are accepted with a single dash (`-cfg`, `-port`, ...) as well
//! as the usual double dash.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::loader::{default_config_path, ConfigError};
use crate::config::schema::ProxyConfig;

/// Long flags that may be written with a single leading dash.
const SINGLE_DASH_LONGS: &[&str] = &["cfg", "port", "tlsport", "cert", "key", "help"];

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "onering")]
#[command(version, about = "A reverse proxy with a focus on simplicity", long_about = None)]
#[command(after_help = "\
Examples:
  onering -cfg /etc/onering/config.toml
  onering -port :9090 -tlsport :9443 -cert cert.pem -key key.pem
  onering -d foo.example.com http://localhost:8081 -d bar.example.com http://localhost:8082")]
pub struct Cli {
    /// Path to the configuration file [default: <config dir>/onering.toml]
    #[arg(long = "cfg", value_name = "PATH")]
    pub cfg: Option<PathBuf>,

    /// Listen address for plain HTTP [default: :8080]
    #[arg(long, value_name = "ADDR")]
    pub port: Option<String>,

    /// Listen address for TLS [default: :443]
    #[arg(long = "tlsport", value_name = "ADDR")]
    pub tls_port: Option<String>,

    /// Path to the TLS certificate. Required for TLS
    #[arg(long, value_name = "PATH")]
    pub cert: Option<String>,

    /// Path to the TLS key. Required for TLS
    #[arg(long, value_name = "PATH")]
    pub key: Option<String>,

    /// Proxy requests for ORIGIN to TARGET. Can be repeated
    #[arg(
        short = 'd',
        long = "domain",
        num_args = 2,
        value_names = ["ORIGIN", "TARGET"],
        action = ArgAction::Append
    )]
    pub domain: Vec<String>,
}

impl Cli {
    /// Parse process arguments, exiting with usage on error or `--help`.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Parse an explicit argument list (first item is the program name).
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    /// Resolve the configuration file path.
    pub fn config_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.cfg {
            Some(path) => Ok(path.clone()),
            None => default_config_path(),
        }
    }

    /// Overrides to apply on top of every loaded configuration.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            port: self.port.clone(),
            tls_port: self.tls_port.clone(),
            cert: self.cert.clone(),
            key: self.key.clone(),
            domains: self
                .domain
                .chunks_exact(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect(),
        }
    }
}

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub port: Option<String>,
    pub tls_port: Option<String>,
    pub cert: Option<String>,
    pub key: Option<String>,
    pub domains: Vec<(String, String)>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.port.is_none()
            && self.tls_port.is_none()
            && self.cert.is_none()
            && self.key.is_none()
            && self.domains.is_empty()
    }

    /// Merge into a configuration. Domain mappings are appended so they win
    /// over file entries for the same origin.
    pub fn apply(&self, config: &mut ProxyConfig) {
        if let Some(port) = &self.port {
            config.port = port.clone();
        }
        if let Some(tls_port) = &self.tls_port {
            config.tls_port = tls_port.clone();
        }
        if let Some(cert) = &self.cert {
            config.cert = cert.clone();
        }
        if let Some(key) = &self.key {
            config.key = key.clone();
        }
        for (origin, target) in &self.domains {
            config.domains.push(origin.clone(), target.clone());
        }
    }
}

/// Rewrite `-flag` / `-flag=value` into `--flag` / `--flag=value` for the
/// known long flags. Everything after `--` is left untouched.
fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough {
                return arg;
            }
            let Some(s) = arg.to_str() else {
                return arg;
            };
            if s == "--" {
                passthrough = true;
                return arg;
            }
            match s.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') => {
                    let name = rest.split('=').next().unwrap_or(rest);
                    if SINGLE_DASH_LONGS.contains(&name) {
                        OsString::from(format!("-{}", s))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}
