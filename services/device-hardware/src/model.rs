//! Persisted records of the hardware service.

use rig_hardware::{PartCategory, Resources};
use rig_id::{DeviceId, HardwareId, ServiceId};
use serde::{Deserialize, Serialize};

/// Capacity and aggregate nominal demand of one device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub device_id: DeviceId,
    /// Fixed at assembly.
    pub performance: Resources,
    /// Sum of the nominal demand of every registered service.
    pub usage: Resources,
}

impl Workload {
    /// A freshly assembled device with nothing running on it.
    pub fn idle(device_id: DeviceId, performance: Resources) -> Self {
        Self {
            device_id,
            performance,
            usage: Resources::ZERO,
        }
    }

    /// Scale factors for the current usage.
    pub fn scale(&self) -> Resources {
        scale_factors(&self.performance, &self.usage)
    }

    /// Share of each resource in use, capped at 1.
    pub fn utilization(&self) -> Resources {
        self.usage
            .zip_with(&self.performance, |used, capacity| (used / capacity).min(1.0))
    }
}

/// Per-resource throttle for `projected` usage against `performance`.
///
/// A resource within capacity runs at full speed. An oversubscribed one is
/// shared proportionally, so every factor lies in `(0, 1]` as long as the
/// capacity is positive.
pub fn scale_factors(performance: &Resources, projected: &Resources) -> Resources {
    performance.zip_with(projected, |capacity, used| {
        if used <= capacity {
            1.0
        } else {
            capacity / used
        }
    })
}

/// A service registered on a device, with its nominal demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub service_id: ServiceId,
    pub device_id: DeviceId,
    pub demand: Resources,
}

/// One physical part installed in a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledPart {
    pub id: HardwareId,
    pub device_id: DeviceId,
    pub catalog_key: String,
    pub category: PartCategory,
}
