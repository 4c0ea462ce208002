//! Application state shared across request handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use rig_hardware::Catalog;
use tracing::info;

use crate::assembler::Assembler;
use crate::config::Config;
use crate::outbound::http::{
    HttpDeviceDirectory, HttpInventoryClient, HttpNotifier, HttpScalingClient,
};
use crate::outbound::local::{InMemoryDeviceDirectory, LoggingNotifier, LoggingScalingClient};
use crate::outbound::{DeviceDirectory, InventoryClient, Notifier, ScalingClient};
use crate::scheduler::{DeviceLocks, Scheduler};
use crate::store::HardwareStore;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<HardwareStore>,
    directory: Arc<dyn DeviceDirectory>,
    scheduler: Scheduler,
    assembler: Assembler,
}

impl AppState {
    pub fn new(
        store: Arc<HardwareStore>,
        directory: Arc<dyn DeviceDirectory>,
        scheduler: Scheduler,
        assembler: Assembler,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                directory,
                scheduler,
                assembler,
            }),
        }
    }

    /// Wire up the store, catalog and outbound clients described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::load(path)?,
            None => Catalog::bundled()?,
        };
        info!(
            mainboards = catalog.mainboard.len(),
            cpus = catalog.cpu.len(),
            "Hardware catalog loaded"
        );

        let store = if config.dev_mode {
            info!("Using in-memory store (dev mode)");
            HardwareStore::open_in_memory()?
        } else {
            std::fs::create_dir_all(&config.data_dir).with_context(|| {
                format!("failed to create data dir {}", config.data_dir.display())
            })?;
            HardwareStore::open(config.database_path())?
        };

        let timeout = config.outbound_timeout;

        let scaling: Arc<dyn ScalingClient> = match &config.service_api_url {
            Some(url) => Arc::new(HttpScalingClient::new(url, timeout)?),
            None => Arc::new(LoggingScalingClient),
        };
        let notifier: Arc<dyn Notifier> = match &config.notify_api_url {
            Some(url) => Arc::new(HttpNotifier::new(url, timeout)?),
            None => Arc::new(LoggingNotifier),
        };
        let directory: Arc<dyn DeviceDirectory> =
            match (&config.device_api_url, &config.devices_file) {
                (Some(url), _) => Arc::new(HttpDeviceDirectory::new(url, timeout)?),
                (None, Some(path)) => Arc::new(InMemoryDeviceDirectory::from_file(path)?),
                (None, None) => Arc::new(InMemoryDeviceDirectory::new()),
            };
        let inventory: Option<Arc<dyn InventoryClient>> = match &config.inventory_api_url {
            Some(url) => Some(Arc::new(HttpInventoryClient::new(url, timeout)?)),
            None => None,
        };

        let store = Arc::new(store);
        let locks = Arc::new(DeviceLocks::new());
        let scheduler = Scheduler::new(store.clone(), locks.clone(), scaling, notifier, timeout);
        let assembler = Assembler::new(Arc::new(catalog), store.clone(), locks, inventory, timeout);

        Ok(Self::new(store, directory, scheduler, assembler))
    }

    pub fn store(&self) -> &HardwareStore {
        &self.inner.store
    }

    pub fn directory(&self) -> &dyn DeviceDirectory {
        self.inner.directory.as_ref()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub fn assembler(&self) -> &Assembler {
        &self.inner.assembler
    }
}
