use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Environment variable naming an optional YAML configuration file.
pub const CONFIG_ENV: &str = "CHUNKD_CONFIG";

pub const DEFAULT_PORT: u16 = 8282;
pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_CHUNK_SIZE: usize = 4096;
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub transfer: TransferConfig,
}

/// Listening socket and worker pool settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of worker threads driving the shared reactor.
    pub workers: usize,
}

/// Per-session transfer settings, shared read-only by every session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Upper bound on the bytes carried by one file chunk.
    pub chunk_size: usize,
    /// When set, filenames resolve inside this directory only and traversal
    /// segments are rejected. When unset, filenames are used verbatim.
    pub root: Option<PathBuf>,
    /// Inbound bytes tolerated before a request terminator must appear.
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            root: None,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

impl Config {
    /// Loads the file named by `CHUNKD_CONFIG`, or the defaults when unset.
    pub fn load() -> anyhow::Result<Self> {
        let cfg = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.workers == 0 {
            anyhow::bail!("server.workers must be at least 1");
        }
        if self.transfer.chunk_size == 0 {
            anyhow::bail!("transfer.chunk_size must be at least 1");
        }
        if self.transfer.max_request_bytes < 4 {
            anyhow::bail!("transfer.max_request_bytes must fit a request terminator");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .with_context(|| format!("Invalid listen address {addr}"))
    }
}

/// Interprets the optional positional port argument.
///
/// An unparseable value is not an error: a warning is logged and `fallback`
/// is used instead.
pub fn parse_port(arg: Option<&str>, fallback: u16) -> u16 {
    match arg {
        None => fallback,
        Some(raw) => match raw.trim().parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                tracing::warn!("Invalid port argument {:?}, using default {}", raw, fallback);
                fallback
            }
        },
    }
}
