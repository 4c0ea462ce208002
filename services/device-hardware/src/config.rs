use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    pub data_dir: PathBuf,
    /// Catalog document; the bundled catalog when unset.
    pub catalog_path: Option<PathBuf>,
    pub service_api_url: Option<String>,
    pub notify_api_url: Option<String>,
    pub device_api_url: Option<String>,
    /// Seed for the in-memory device directory when no device API is set.
    pub devices_file: Option<PathBuf>,
    pub inventory_api_url: Option<String>,
    pub outbound_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("RIG_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8090".to_string())
            .parse()
            .context("invalid RIG_LISTEN_ADDR")?;

        let log_level = std::env::var("RIG_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dev_mode = std::env::var("RIG_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let data_dir = std::env::var("RIG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/var/lib/rig"));

        let outbound_timeout = match std::env::var("RIG_OUTBOUND_TIMEOUT_MS") {
            Ok(ms) => Duration::from_millis(
                ms.parse()
                    .context("RIG_OUTBOUND_TIMEOUT_MS must be a number of milliseconds")?,
            ),
            Err(_) => Duration::from_millis(2000),
        };

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            data_dir,
            catalog_path: optional_var("RIG_CATALOG_PATH").map(PathBuf::from),
            service_api_url: optional_var("RIG_SERVICE_API_URL"),
            notify_api_url: optional_var("RIG_NOTIFY_API_URL"),
            device_api_url: optional_var("RIG_DEVICE_API_URL"),
            devices_file: optional_var("RIG_DEVICES_FILE").map(PathBuf::from),
            inventory_api_url: optional_var("RIG_INVENTORY_API_URL"),
            outbound_timeout,
        })
    }

    /// Path of the SQLite database inside the data directory.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("hardware.db")
    }
}

/// Unset and empty both mean "not configured".
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
