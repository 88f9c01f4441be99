//! Daemon configuration from `HOMEPRINT_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use homeprint_observability::LogFormat;
use homeprint_printer::TransportConfig;
use homeprint_scheduler::{ConfigError, SchedulerConfig};

pub const SNAPSHOT: &str = "HOMEPRINT_SNAPSHOT";
pub const TICK_MS: &str = "HOMEPRINT_TICK_MS";
pub const PRINTER_PORT: &str = "HOMEPRINT_PRINTER_PORT";
pub const CONNECT_TIMEOUT_MS: &str = "HOMEPRINT_CONNECT_TIMEOUT_MS";
pub const WRITE_TIMEOUT_MS: &str = "HOMEPRINT_WRITE_TIMEOUT_MS";
pub const LINE_WIDTH: &str = "HOMEPRINT_LINE_WIDTH";
pub const LOG_FORMAT: &str = "HOMEPRINT_LOG_FORMAT";

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// JSON store snapshot; `None` starts with an empty household.
    pub snapshot: Option<PathBuf>,
    pub scheduler: SchedulerConfig,
    pub transport: TransportConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let snapshot = lookup(SNAPSHOT).filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        if snapshot.is_none() {
            tracing::warn!("{SNAPSHOT} not set; starting with an empty store");
        }

        let mut scheduler = SchedulerConfig::default();
        if let Some(ms) = parse::<u64>(&lookup, TICK_MS)? {
            if ms == 0 {
                return Err(ConfigError::invalid(TICK_MS, "0", "must be positive"));
            }
            scheduler = scheduler.with_tick_interval(Duration::from_millis(ms));
        }
        if let Some(width) = parse::<usize>(&lookup, LINE_WIDTH)? {
            scheduler = scheduler.with_line_width(width);
        }

        let mut transport = TransportConfig::default();
        if let Some(port) = parse::<u16>(&lookup, PRINTER_PORT)? {
            transport = transport.with_port(port);
        }
        if let Some(ms) = parse::<u64>(&lookup, CONNECT_TIMEOUT_MS)? {
            transport = transport
                .with_connect_timeout(Duration::from_millis(ms))
                .with_probe_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = parse::<u64>(&lookup, WRITE_TIMEOUT_MS)? {
            transport = transport.with_write_timeout(Duration::from_millis(ms));
        }

        Ok(Self {
            snapshot,
            scheduler,
            transport,
        })
    }
}

/// Read before the subscriber exists, so an unknown value is reported by the caller.
pub fn log_format(lookup: impl Fn(&str) -> Option<String>) -> Result<LogFormat, ConfigError> {
    match lookup(LOG_FORMAT) {
        None => Ok(LogFormat::default()),
        Some(raw) => raw
            .parse()
            .map_err(|e: homeprint_observability::UnknownLogFormat| {
                ConfigError::invalid(LOG_FORMAT, raw.clone(), e.to_string())
            }),
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        tracing::debug!(key, "not set; using default");
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::invalid(key, raw.clone(), e.to_string()))
}
