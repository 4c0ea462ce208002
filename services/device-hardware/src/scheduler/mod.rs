//! Resource oversubscription scheduler.
//!
//! Services register nominal demand against a device's fixed capacity. When
//! aggregate demand exceeds capacity on a resource, every service on the
//! device is throttled by the same factor for that resource.
//!
//! Each operation runs under the device's lock:
//!
//! 1. Load the workload and service rows.
//! 2. Apply the demand delta to usage and compute the scale factors.
//! 3. Commit the service row and the new usage in one transaction.
//! 4. Push the scaled allocation to every other service on the device.
//! 5. Notify the device owner of the new utilization.
//!
//! Pushes and notifications are best effort: each is bounded by the outbound
//! timeout, failures are logged and local state is never rolled back.

mod locks;

pub use locks::{DeviceGuard, DeviceLocks};

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use rig_hardware::Resources;
use rig_id::{DeviceId, ServiceId};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::model::{Service, Workload};
use crate::outbound::{Device, Notification, Notifier, Origin, ScalePush, ScalingClient};
use crate::store::{HardwareStore, StoreError};

/// Scheduler failures. All are terminal for the request.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("device has no workload")]
    DeviceNotFound,

    #[error("service is already running")]
    ServiceAlreadyRunning,

    #[error("service is not running")]
    ServiceNotRunning,

    #[error("service not found")]
    ServiceNotFound,

    #[error("demand must be finite and not negative")]
    InvalidDemand,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SchedulerError {
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::DeviceNotFound => "device_not_found",
            SchedulerError::ServiceAlreadyRunning => "service_already_running",
            SchedulerError::ServiceNotRunning => "service_not_running",
            SchedulerError::ServiceNotFound => "service_not_found",
            SchedulerError::InvalidDemand => "invalid_demand",
            SchedulerError::Store(e) => e.code(),
        }
    }
}

/// Delivered allocation returned to the caller of register and rescale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub service_id: ServiceId,
    pub delivered: Resources,
}

/// Result of releasing a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released {
    pub stopped_services: usize,
    pub deleted: bool,
}

pub struct Scheduler {
    store: Arc<HardwareStore>,
    locks: Arc<DeviceLocks>,
    scaling: Arc<dyn ScalingClient>,
    notifier: Arc<dyn Notifier>,
    outbound_timeout: Duration,
}

impl Scheduler {
    pub fn new(
        store: Arc<HardwareStore>,
        locks: Arc<DeviceLocks>,
        scaling: Arc<dyn ScalingClient>,
        notifier: Arc<dyn Notifier>,
        outbound_timeout: Duration,
    ) -> Self {
        Self {
            store,
            locks,
            scaling,
            notifier,
            outbound_timeout,
        }
    }

    /// Admit a new service onto `device`.
    #[instrument(skip(self, device, service_id, demand), fields(device_id = %device.id, service_id = %service_id))]
    pub async fn register(
        &self,
        device: &Device,
        service_id: ServiceId,
        demand: Resources,
    ) -> Result<Allocation, SchedulerError> {
        if !demand.is_valid_demand() {
            return Err(SchedulerError::InvalidDemand);
        }

        let _guard = self.locks.lock(&device.id).await;

        let mut workload = self.workload(&device.id)?;
        let others = self.store.list_services(&device.id)?;

        workload.usage += demand;
        let scale = workload.scale();

        let service = Service {
            service_id,
            device_id: device.id,
            demand,
        };
        // Service ids are unique across devices, so the store decides.
        if !self.store.insert_service(&service, &workload.usage)? {
            return Err(SchedulerError::ServiceAlreadyRunning);
        }
        info!(resident = others.len() + 1, "Service registered");

        self.broadcast(&others, &scale).await;
        self.notify(device, Origin::HardwareRegister, &workload).await;

        Ok(Allocation {
            service_id,
            delivered: demand.mul_each(&scale),
        })
    }

    /// Remove a service from `device` and give its share back.
    #[instrument(skip(self, device, service_id), fields(device_id = %device.id, service_id = %service_id))]
    pub async fn stop(&self, device: &Device, service_id: ServiceId) -> Result<(), SchedulerError> {
        let _guard = self.locks.lock(&device.id).await;

        let service = self
            .resident_service(device, &service_id)?
            .ok_or(SchedulerError::ServiceNotRunning)?;
        let mut workload = self.workload(&device.id)?;

        workload.usage = clamp_drift(workload.usage - service.demand);
        let scale = workload.scale();

        self.store
            .delete_service(&service_id, &device.id, &workload.usage)?;
        let remaining = self.store.list_services(&device.id)?;
        info!(resident = remaining.len(), "Service stopped");

        self.broadcast(&remaining, &scale).await;
        self.notify(device, Origin::HardwareStop, &workload).await;

        Ok(())
    }

    /// Replace a service's nominal demand.
    #[instrument(skip(self, device, service_id, demand), fields(device_id = %device.id, service_id = %service_id))]
    pub async fn rescale(
        &self,
        device: &Device,
        service_id: ServiceId,
        demand: Resources,
    ) -> Result<Allocation, SchedulerError> {
        if !demand.is_valid_demand() {
            return Err(SchedulerError::InvalidDemand);
        }

        let _guard = self.locks.lock(&device.id).await;

        let mut service = self
            .resident_service(device, &service_id)?
            .ok_or(SchedulerError::ServiceNotFound)?;
        let mut workload = self.workload(&device.id)?;

        workload.usage = clamp_drift(workload.usage - service.demand + demand);
        let scale = workload.scale();

        service.demand = demand;
        self.store.update_demand(&service, &workload.usage)?;
        let others: Vec<Service> = self
            .store
            .list_services(&device.id)?
            .into_iter()
            .filter(|other| other.service_id != service_id)
            .collect();
        info!("Service rescaled");

        self.broadcast(&others, &scale).await;
        self.notify(device, Origin::HardwareScale, &workload).await;

        Ok(Allocation {
            service_id,
            delivered: demand.mul_each(&scale),
        })
    }

    /// What a service currently receives: its demand under the device's
    /// present scale factors.
    #[instrument(skip(self, service_id), fields(service_id = %service_id))]
    pub async fn real_use(&self, service_id: ServiceId) -> Result<Allocation, SchedulerError> {
        let service = self
            .store
            .get_service(&service_id)?
            .ok_or(SchedulerError::ServiceNotFound)?;

        let _guard = self.locks.lock(&service.device_id).await;

        // Re-read under the lock; the service may have changed or gone.
        let service = self
            .store
            .get_service(&service_id)?
            .ok_or(SchedulerError::ServiceNotFound)?;
        let workload = self.workload(&service.device_id)?;

        Ok(Allocation {
            service_id,
            delivered: service.demand.mul_each(&workload.scale()),
        })
    }

    /// Utilization of a device, each component in `[0, 1]`.
    pub async fn resources(&self, device_id: &DeviceId) -> Result<Resources, SchedulerError> {
        Ok(self.workload(device_id)?.utilization())
    }

    /// Stop every service on a device.
    ///
    /// With `delete`, the workload and installed hardware are removed too and
    /// the device can be assembled again.
    #[instrument(skip(self, device), fields(device_id = %device.id))]
    pub async fn release(&self, device: &Device, delete: bool) -> Result<Released, SchedulerError> {
        let _guard = self.locks.lock(&device.id).await;

        self.workload(&device.id)?;
        let services = self.store.list_services(&device.id)?;
        self.store.release_device(&device.id, delete)?;
        info!(stopped = services.len(), delete, "Device released");

        match tokio::time::timeout(
            self.outbound_timeout,
            self.scaling.stop_device_services(&device.id, delete),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Missed stop broadcast"),
            Err(_) => warn!("Stop broadcast timed out"),
        }

        Ok(Released {
            stopped_services: services.len(),
            deleted: delete,
        })
    }

    fn workload(&self, device_id: &DeviceId) -> Result<Workload, SchedulerError> {
        self.store
            .get_workload(device_id)?
            .ok_or(SchedulerError::DeviceNotFound)
    }

    /// A service counts only on the device it was registered on.
    fn resident_service(
        &self,
        device: &Device,
        service_id: &ServiceId,
    ) -> Result<Option<Service>, SchedulerError> {
        Ok(self
            .store
            .get_service(service_id)?
            .filter(|service| service.device_id == device.id))
    }

    async fn broadcast(&self, services: &[Service], scale: &Resources) {
        let timeout = self.outbound_timeout;
        let pushes = services.iter().map(|service| {
            let push = ScalePush {
                service_id: service.service_id,
                allocation: service.demand.mul_each(scale),
            };
            async move {
                let result = tokio::time::timeout(timeout, self.scaling.push_scale(&push)).await;
                (push.service_id, result)
            }
        });

        for (service_id, result) in join_all(pushes).await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(target_service = %service_id, error = %e, "Missed scale broadcast"),
                Err(_) => warn!(target_service = %service_id, "Scale broadcast timed out"),
            }
        }
    }

    async fn notify(&self, device: &Device, origin: Origin, workload: &Workload) {
        let notification = Notification::resource_usage(origin, device.id, workload.utilization());
        match tokio::time::timeout(
            self.outbound_timeout,
            self.notifier.notify(&device.owner, &notification),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(user_id = %device.owner, error = %e, "Missed notification"),
            Err(_) => warn!(user_id = %device.owner, "Notification timed out"),
        }
    }
}

/// Removing demand can leave rounding residue below zero.
fn clamp_drift(usage: Resources) -> Resources {
    usage.zip_with(&Resources::ZERO, f64::max)
}
