//! Command line and configuration file handling.
//!
//! Values given on the command line win over the configuration file, which
//! wins over the built-in defaults.

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::metrics::DEFAULT_NAMESPACE;

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9111";
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";
pub const DEFAULT_CONFIG_FILE: &str = "linux-dvb-exporter.toml";
pub const DEFAULT_LOG_RETENTION_DAYS: u64 = 7;
pub const MAX_LOG_RETENTION_DAYS: u64 = 36_500;

/// linux-dvb-exporter - Prometheus exporter for Linux DVB frontends
#[derive(Parser, Debug, Default)]
#[command(name = "linux-dvb-exporter", author, version, about, long_about = None)]
pub struct Args {
    /// Address to listen on for HTTP requests [default: 0.0.0.0:9111]
    #[arg(short = 'l', long = "web.listen-address", value_name = "ADDR")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics [default: /metrics]
    #[arg(long = "web.telemetry-path", value_name = "PATH")]
    pub telemetry_path: Option<String>,

    /// Root of the DVB device tree [default: /dev/dvb]
    #[arg(long = "dvb.root", value_name = "DIR")]
    pub dvb_root: Option<PathBuf>,

    /// Metric namespace [default: dvb]
    #[arg(long = "metrics.namespace", value_name = "NAME")]
    pub namespace: Option<String>,

    /// Configuration file path
    #[arg(short = 'f', long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log filter, e.g. "info" or "dvb_exporter=debug"
    #[arg(long = "log.level", value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Directory for rotated log files (console only if unset)
    #[arg(long = "log.dir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Number of days to keep log files [default: 7]
    #[arg(long = "log.retention-days", value_name = "DAYS")]
    pub log_retention_days: Option<u64>,
}

/// Configuration file format.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub web: WebSection,
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub metrics: MetricsSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct WebSection {
    pub listen_address: Option<String>,
    pub telemetry_path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DeviceSection {
    pub root: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MetricsSection {
    pub namespace: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub dir: Option<PathBuf>,
    pub retention_days: Option<u64>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid listen address {0:?}")]
    ListenAddress(String),

    #[error("Invalid telemetry path {0:?}: must start with '/' and not be '/'")]
    TelemetryPath(String),

    #[error("Invalid metric namespace {0:?}")]
    Namespace(String),

    #[error("Invalid log retention {0} days: must be between 1 and {max}", max = MAX_LOG_RETENTION_DAYS)]
    RetentionDays(u64),
}

/// Logging settings after merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub dir: Option<PathBuf>,
    pub retention_days: u64,
    pub verbose: bool,
}

/// Effective exporter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub telemetry_path: String,
    pub dvb_root: PathBuf,
    pub namespace: String,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Config file to use: the explicit one, else `linux-dvb-exporter.toml`
    /// in the working directory if it exists.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        explicit.map(Path::to_path_buf).or_else(|| {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            default_path.exists().then_some(default_path)
        })
    }
}

/// Parse a listen address. A bare `:port` binds every interface.
pub fn parse_listen_address(s: &str) -> Result<SocketAddr, ConfigError> {
    let full = if s.starts_with(':') {
        format!("0.0.0.0{}", s)
    } else {
        s.to_string()
    };
    full.parse()
        .map_err(|_| ConfigError::ListenAddress(s.to_string()))
}

fn is_valid_namespace(ns: &str) -> bool {
    let mut chars = ns.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Config {
    /// Merge command line arguments over the configuration file.
    pub fn resolve(args: &Args, file: ConfigFile) -> Result<Self, ConfigError> {
        let listen = args
            .listen_address
            .clone()
            .or(file.web.listen_address)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string());
        let listen_addr = parse_listen_address(&listen)?;

        let telemetry_path = args
            .telemetry_path
            .clone()
            .or(file.web.telemetry_path)
            .unwrap_or_else(|| DEFAULT_TELEMETRY_PATH.to_string());
        if !telemetry_path.starts_with('/') || telemetry_path == "/" {
            return Err(ConfigError::TelemetryPath(telemetry_path));
        }

        let namespace = args
            .namespace
            .clone()
            .or(file.metrics.namespace)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        if !is_valid_namespace(&namespace) {
            return Err(ConfigError::Namespace(namespace));
        }

        let dvb_root = args
            .dvb_root
            .clone()
            .or(file.device.root)
            .unwrap_or_else(|| PathBuf::from(linux_dvb::DEFAULT_ROOT));

        let retention_days = args
            .log_retention_days
            .or(file.logging.retention_days)
            .unwrap_or(DEFAULT_LOG_RETENTION_DAYS);
        if !(1..=MAX_LOG_RETENTION_DAYS).contains(&retention_days) {
            return Err(ConfigError::RetentionDays(retention_days));
        }

        let logging = LoggingConfig {
            level: args.log_level.clone().or(file.logging.level),
            dir: args.log_dir.clone().or(file.logging.dir),
            retention_days,
            verbose: args.verbose,
        };

        Ok(Self {
            listen_addr,
            telemetry_path,
            dvb_root,
            namespace,
            logging,
        })
    }
}
