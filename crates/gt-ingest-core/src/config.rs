use anyhow::Context;
use serde::Deserialize;
use std::{net::Ipv4Addr, path::{Path, PathBuf}, time::Duration};

use crate::IngestError;

/// Port the console listens on for heartbeats.
pub const DEFAULT_SEND_PORT: u16 = 33739;
/// Port the console streams telemetry to.
pub const DEFAULT_RECEIVE_PORT: u16 = 33740;
pub const DEFAULT_HOST: &str = "255.255.255.255";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GtConfig {
    /// `udp://host:port`, `host:port`, `file://capture.gtz` or a bare `.gtr`/`.gtz` path
    pub source: String,
    pub log_level: String,
    pub stats_enabled: bool,
    /// Vehicle catalog override; the bundled catalog is used when unset
    pub vehicle_db: Option<PathBuf>,
    pub receive_port: u16,
    pub heartbeat_interval_ms: u64,
    pub read_timeout_ms: u64,
}

impl Default for GtConfig {
    fn default() -> Self {
        Self {
            source: format!("udp://{DEFAULT_HOST}:{DEFAULT_SEND_PORT}"),
            log_level: "warn".into(),
            stats_enabled: false,
            vehicle_db: None,
            receive_port: DEFAULT_RECEIVE_PORT,
            heartbeat_interval_ms: 10_000,
            read_timeout_ms: 10_000,
        }
    }
}

impl GtConfig {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn source_addr(&self) -> Result<SourceAddr, IngestError> {
        SourceAddr::parse(&self.source)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Where packets come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceAddr {
    /// Live console; `port` is the console's heartbeat port.
    Udp { host: String, port: u16 },
    /// Capture container on disk.
    File(PathBuf),
}

impl SourceAddr {
    pub fn parse(s: &str) -> Result<Self, IngestError> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("file://") {
            if path.is_empty() {
                return Err(IngestError::Config("empty file path".into()));
            }
            return Ok(SourceAddr::File(PathBuf::from(path)));
        }
        if s.ends_with(".gtr") || s.ends_with(".gtz") {
            return Ok(SourceAddr::File(PathBuf::from(s)));
        }

        let rest = s.strip_prefix("udp://").unwrap_or(s);
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| IngestError::Config(format!("invalid port in source {s:?}")))?;
                (host, port)
            }
            None => (rest, DEFAULT_SEND_PORT),
        };
        if host.contains('/') || host.contains(char::is_whitespace) {
            return Err(IngestError::Config(format!("unsupported source {s:?}")));
        }
        let host = if host.is_empty() { Ipv4Addr::BROADCAST.to_string() } else { host.to_string() };
        Ok(SourceAddr::Udp { host, port })
    }
}
