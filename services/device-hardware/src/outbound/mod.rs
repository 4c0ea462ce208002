//! Interfaces to the sibling microservices.
//!
//! - [`ScalingClient`]: pushes delivered allocations to running services.
//! - [`Notifier`]: delivers utilization snapshots to a device's owner.
//! - [`DeviceDirectory`]: looks up devices and their owners.
//! - [`InventoryClient`]: checks and consumes parts held by a user.
//!
//! HTTP implementations live in [`http`]. [`local`] holds the stand-ins used
//! when a sibling service is not configured, plus recording fakes for tests.

pub mod http;
pub mod local;

use anyhow::Result;
use async_trait::async_trait;
use rig_hardware::{PartCategory, Resources};
use rig_id::{DeviceId, ServiceId, UserId};
use serde::{Deserialize, Serialize};

/// A device as known to the device microservice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub owner: UserId,
    pub powered_on: bool,
}

/// New delivered allocation for one running service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalePush {
    pub service_id: ServiceId,
    #[serde(flatten)]
    pub allocation: Resources,
}

/// Which operation produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    HardwareRegister,
    HardwareStop,
    HardwareScale,
}

/// Utilization snapshot sent to a device owner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notify_kind: NotifyKind,
    pub origin: Origin,
    pub device_id: DeviceId,
    pub utilization: Resources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyKind {
    #[serde(rename = "resource-usage")]
    ResourceUsage,
}

impl Notification {
    pub fn resource_usage(origin: Origin, device_id: DeviceId, utilization: Resources) -> Self {
        Self {
            notify_kind: NotifyKind::ResourceUsage,
            origin,
            device_id,
            utilization,
        }
    }
}

/// Client of the service microservice.
#[async_trait]
pub trait ScalingClient: Send + Sync {
    /// Tell a running service its new delivered allocation.
    async fn push_scale(&self, push: &ScalePush) -> Result<()>;

    /// Stop every service of a device, deleting them when `delete` is set.
    async fn stop_device_services(&self, device_id: &DeviceId, delete: bool) -> Result<()>;
}

/// Sink for user notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, owner: &UserId, notification: &Notification) -> Result<()>;
}

/// Lookup of devices by id.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// `Ok(None)` when the device does not exist.
    async fn get_device(&self, device_id: &DeviceId) -> Result<Option<Device>>;
}

/// Client of the inventory microservice.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Whether `owner` holds every listed part of `category`.
    async fn holds_parts(
        &self,
        owner: &UserId,
        category: PartCategory,
        keys: &[String],
    ) -> Result<bool>;

    /// Remove the listed parts from `owner`'s inventory.
    async fn consume_parts(&self, owner: &UserId, parts: &[(PartCategory, String)]) -> Result<()>;
}
