//! Process configuration read once from the environment.

use std::net::SocketAddr;

use tracing::warn;

use grocer_inventory::UnderflowPolicy;
use grocer_observability::LogFormat;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://grocer.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Where records are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Volatile store, lost on exit.
    Memory,
    Sqlite(String),
}

impl StoreBackend {
    fn parse(raw: &str) -> StoreBackend {
        match raw.trim() {
            "memory" => StoreBackend::Memory,
            url => StoreBackend::Sqlite(url.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub bind_addr: SocketAddr,
    pub stock_underflow: UnderflowPolicy,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::Sqlite(DEFAULT_DATABASE_URL.to_string()),
            bind_addr: default_bind_addr(),
            stock_underflow: UnderflowPolicy::default(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

impl AppConfig {
    /// Read `GROCER_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Just the log format, without logging anything. Lets the binary
    /// install its subscriber before the full config (and its warnings).
    pub fn log_format_from_env() -> LogFormat {
        std::env::var("GROCER_LOG_FORMAT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    /// Build from any key lookup. Unset or blank keys take their default;
    /// invalid values are logged and also fall back to the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = AppConfig::default();

        if let Some(url) = get("GROCER_DATABASE_URL") {
            config.store = StoreBackend::parse(&url);
        }

        if let Some(raw) = get("GROCER_BIND_ADDR") {
            match raw.trim().parse::<SocketAddr>() {
                Ok(addr) => config.bind_addr = addr,
                Err(err) => warn!(value = %raw, error = %err, default = DEFAULT_BIND_ADDR, "invalid GROCER_BIND_ADDR"),
            }
        }

        if let Some(raw) = get("GROCER_STOCK_UNDERFLOW") {
            match raw.parse::<UnderflowPolicy>() {
                Ok(policy) => config.stock_underflow = policy,
                Err(err) => warn!(value = %raw, error = %err, "invalid GROCER_STOCK_UNDERFLOW; using clamp"),
            }
        }

        if let Some(raw) = get("GROCER_LOG_FORMAT") {
            match raw.parse::<LogFormat>() {
                Ok(format) => config.log_format = format,
                Err(err) => warn!(error = %err, "invalid GROCER_LOG_FORMAT; using json"),
            }
        }

        config
    }
}
