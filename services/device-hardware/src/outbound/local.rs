//! Local implementations of the outbound interfaces.
//!
//! The logging clients and the in-memory directory stand in for sibling
//! services that are not configured. The recording clients capture every
//! call and can be told to fail or stall.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rig_hardware::PartCategory;
use rig_id::{DeviceId, UserId};
use tracing::info;

use super::{
    Device, DeviceDirectory, InventoryClient, Notification, Notifier, ScalePush, ScalingClient,
};

/// Logs pushes instead of sending them.
#[derive(Debug, Default)]
pub struct LoggingScalingClient;

#[async_trait]
impl ScalingClient for LoggingScalingClient {
    async fn push_scale(&self, push: &ScalePush) -> Result<()> {
        info!(
            service_id = %push.service_id,
            cpu = push.allocation.cpu,
            ram = push.allocation.ram,
            gpu = push.allocation.gpu,
            disk = push.allocation.disk,
            network = push.allocation.network,
            "[LOCAL] Scale push"
        );
        Ok(())
    }

    async fn stop_device_services(&self, device_id: &DeviceId, delete: bool) -> Result<()> {
        info!(device_id = %device_id, delete, "[LOCAL] Stop device services");
        Ok(())
    }
}

/// Logs notifications instead of sending them.
#[derive(Debug, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, owner: &UserId, notification: &Notification) -> Result<()> {
        info!(
            user_id = %owner,
            device_id = %notification.device_id,
            origin = ?notification.origin,
            "[LOCAL] Resource usage notification"
        );
        Ok(())
    }
}

/// Device directory held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDeviceDirectory {
    devices: RwLock<HashMap<DeviceId, Device>>,
}

impl InMemoryDeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of devices.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read devices file {}", path.display()))?;
        let devices: Vec<Device> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid devices file {}", path.display()))?;

        let directory = Self::new();
        for device in devices {
            directory.insert(device);
        }
        Ok(directory)
    }

    pub fn insert(&self, device: Device) {
        let mut devices = self
            .devices
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        devices.insert(device.id, device);
    }

    pub fn len(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DeviceDirectory for InMemoryDeviceDirectory {
    async fn get_device(&self, device_id: &DeviceId) -> Result<Option<Device>> {
        let devices = self
            .devices
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(devices.get(device_id).cloned())
    }
}

/// How a recording client answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Behavior {
    #[default]
    Succeed,
    Fail,
    Stall(Duration),
}

impl Behavior {
    async fn apply(self) -> Result<()> {
        match self {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => anyhow::bail!("recording client configured to fail"),
            Behavior::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

/// Records every push and stop request.
#[derive(Debug, Default)]
pub struct RecordingScalingClient {
    behavior: Behavior,
    pushes: Mutex<Vec<ScalePush>>,
    stops: Mutex<Vec<(DeviceId, bool)>>,
}

impl RecordingScalingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    /// Pushes received so far, in arrival order.
    pub fn pushes(&self) -> Vec<ScalePush> {
        self.pushes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Forget recorded pushes.
    pub fn take_pushes(&self) -> Vec<ScalePush> {
        std::mem::take(
            &mut *self
                .pushes
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }

    pub fn stops(&self) -> Vec<(DeviceId, bool)> {
        self.stops
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ScalingClient for RecordingScalingClient {
    async fn push_scale(&self, push: &ScalePush) -> Result<()> {
        self.pushes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(*push);
        self.behavior.apply().await
    }

    async fn stop_device_services(&self, device_id: &DeviceId, delete: bool) -> Result<()> {
        self.stops
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((*device_id, delete));
        self.behavior.apply().await
    }
}

/// Records every notification with its recipient.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    behavior: Behavior,
    sent: Mutex<Vec<(UserId, Notification)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(UserId, Notification)> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, owner: &UserId, notification: &Notification) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((*owner, *notification));
        self.behavior.apply().await
    }
}

/// Inventory held in memory, keyed by owner.
#[derive(Debug, Default)]
pub struct InMemoryInventory {
    items: Mutex<HashMap<UserId, Vec<(PartCategory, String)>>>,
    consumed: Mutex<Vec<(UserId, PartCategory, String)>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn give(&self, owner: UserId, category: PartCategory, key: &str) {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(owner)
            .or_default()
            .push((category, key.to_string()));
    }

    /// Parts still held by `owner`.
    pub fn held(&self, owner: &UserId) -> Vec<(PartCategory, String)> {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }

    pub fn consumed(&self) -> Vec<(UserId, PartCategory, String)> {
        self.consumed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl InventoryClient for InMemoryInventory {
    async fn holds_parts(
        &self,
        owner: &UserId,
        category: PartCategory,
        keys: &[String],
    ) -> Result<bool> {
        let held = self.held(owner);
        // Every listed key needs its own item, so duplicates count.
        let mut used = HashSet::new();
        let found = keys.iter().all(|key| {
            held.iter().enumerate().any(|(idx, (c, k))| {
                *c == category && k == key && used.insert(idx)
            })
        });
        Ok(found)
    }

    async fn consume_parts(&self, owner: &UserId, parts: &[(PartCategory, String)]) -> Result<()> {
        let mut items = self
            .items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut consumed = self
            .consumed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let held = items.entry(*owner).or_default();

        for (category, key) in parts {
            if let Some(pos) = held.iter().position(|(c, k)| c == category && k == key) {
                held.remove(pos);
                consumed.push((*owner, *category, key.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inventory_counts_duplicates() {
        let inventory = InMemoryInventory::new();
        let owner = UserId::new();
        inventory.give(owner, PartCategory::Ram, "stick");

        let one = vec!["stick".to_string()];
        let two = vec!["stick".to_string(), "stick".to_string()];
        assert!(inventory.holds_parts(&owner, PartCategory::Ram, &one).await.unwrap());
        assert!(!inventory.holds_parts(&owner, PartCategory::Ram, &two).await.unwrap());
        assert!(!inventory.holds_parts(&owner, PartCategory::Gpu, &one).await.unwrap());
    }

    #[tokio::test]
    async fn test_inventory_consume() {
        let inventory = InMemoryInventory::new();
        let owner = UserId::new();
        inventory.give(owner, PartCategory::Case, "ATX");
        inventory.give(owner, PartCategory::Case, "ATX");

        inventory
            .consume_parts(&owner, &[(PartCategory::Case, "ATX".to_string())])
            .await
            .unwrap();
        assert_eq!(inventory.held(&owner).len(), 1);
        assert_eq!(inventory.consumed().len(), 1);
    }

    #[tokio::test]
    async fn test_directory_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        let device = Device {
            id: DeviceId::new(),
            owner: UserId::new(),
            powered_on: true,
        };
        std::fs::write(&path, serde_json::to_string(&vec![device.clone()]).unwrap()).unwrap();

        let directory = InMemoryDeviceDirectory::from_file(&path).unwrap();
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get_device(&device.id).await.unwrap(), Some(device));
        assert_eq!(directory.get_device(&DeviceId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_recording_client_fails_after_recording() {
        let client = RecordingScalingClient::with_behavior(Behavior::Fail);
        let device_id = DeviceId::new();
        assert!(client.stop_device_services(&device_id, true).await.is_err());
        assert_eq!(client.stops(), vec![(device_id, true)]);
    }
}
