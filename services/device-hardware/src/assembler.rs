//! Hardware assembly: turns a validated parts selection into a device's
//! installed hardware and workload.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use rig_hardware::{
    preview_build, Catalog, CompatibilityError, PartCategory, PartSelection, Resources,
};
use rig_id::HardwareId;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::model::{InstalledPart, Workload};
use crate::outbound::{Device, InventoryClient};
use crate::scheduler::DeviceLocks;
use crate::store::{HardwareStore, StoreError};

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Incompatible(#[from] CompatibilityError),

    #[error("build has no capacity for at least one resource")]
    DegenerateCapacity,

    #[error("device already has hardware")]
    AlreadyAssembled,

    #[error("{0} not in inventory")]
    NotInInventory(PartCategory),

    #[error("inventory unavailable: {0}")]
    Inventory(#[source] anyhow::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AssemblyError {
    pub fn code(&self) -> String {
        match self {
            AssemblyError::Incompatible(e) => e.code(),
            AssemblyError::DegenerateCapacity => "degenerate_capacity".to_string(),
            AssemblyError::AlreadyAssembled => "hardware_already_assembled".to_string(),
            AssemblyError::NotInInventory(category) => format!("{category}_not_in_inventory"),
            AssemblyError::Inventory(_) => "inventory_unavailable".to_string(),
            AssemblyError::Store(e) => e.code().to_string(),
        }
    }
}

pub struct Assembler {
    catalog: Arc<Catalog>,
    store: Arc<HardwareStore>,
    locks: Arc<DeviceLocks>,
    inventory: Option<Arc<dyn InventoryClient>>,
    outbound_timeout: Duration,
}

impl Assembler {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<HardwareStore>,
        locks: Arc<DeviceLocks>,
        inventory: Option<Arc<dyn InventoryClient>>,
        outbound_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            store,
            locks,
            inventory,
            outbound_timeout,
        }
    }

    /// Validate a selection and compute its capacity without persisting
    /// anything.
    pub fn preview(&self, selection: &PartSelection) -> Result<Resources, CompatibilityError> {
        preview_build(&self.catalog, selection)
    }

    /// Install the selected parts into `device`.
    ///
    /// Parts are taken from the owner's inventory after the device is
    /// persisted. A failed consumption is logged, not undone.
    #[instrument(skip(self, device, selection), fields(device_id = %device.id))]
    pub async fn assemble(
        &self,
        device: &Device,
        selection: &PartSelection,
    ) -> Result<Resources, AssemblyError> {
        let performance = self.preview(selection)?;
        let degenerate = performance
            .iter()
            .any(|(_, capacity)| capacity.is_nan() || capacity <= 0.0);
        if degenerate {
            return Err(AssemblyError::DegenerateCapacity);
        }

        let _guard = self.locks.lock(&device.id).await;

        if self.store.get_workload(&device.id)?.is_some() {
            return Err(AssemblyError::AlreadyAssembled);
        }
        self.check_inventory(device, selection).await?;

        let parts: Vec<InstalledPart> = selection
            .parts()
            .map(|(category, key)| InstalledPart {
                id: HardwareId::new(),
                device_id: device.id,
                catalog_key: key.to_string(),
                category,
            })
            .collect();

        let workload = Workload::idle(device.id, performance);
        if !self.store.create_device(&workload, &parts)? {
            return Err(AssemblyError::AlreadyAssembled);
        }
        info!(parts = parts.len(), "Device assembled");

        self.consume_inventory(device, &parts).await;
        Ok(performance)
    }

    async fn check_inventory(
        &self,
        device: &Device,
        selection: &PartSelection,
    ) -> Result<(), AssemblyError> {
        let Some(inventory) = &self.inventory else {
            return Ok(());
        };

        for category in PartCategory::ALL {
            let keys: Vec<String> = selection
                .parts()
                .filter(|(c, _)| *c == category)
                .map(|(_, key)| key.to_string())
                .collect();
            if keys.is_empty() {
                continue;
            }

            let held = tokio::time::timeout(
                self.outbound_timeout,
                inventory.holds_parts(&device.owner, category, &keys),
            )
            .await
            .map_err(|_| AssemblyError::Inventory(anyhow!("inventory check timed out")))?
            .map_err(AssemblyError::Inventory)?;

            if !held {
                return Err(AssemblyError::NotInInventory(category));
            }
        }
        Ok(())
    }

    async fn consume_inventory(&self, device: &Device, parts: &[InstalledPart]) {
        let Some(inventory) = &self.inventory else {
            return;
        };

        let items: Vec<(PartCategory, String)> = parts
            .iter()
            .map(|part| (part.category, part.catalog_key.clone()))
            .collect();

        match tokio::time::timeout(
            self.outbound_timeout,
            inventory.consume_parts(&device.owner, &items),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(user_id = %device.owner, error = %e, "Failed to consume inventory"),
            Err(_) => warn!(user_id = %device.owner, "Inventory consumption timed out"),
        }
    }
}
