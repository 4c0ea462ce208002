#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rig_device_hardware::model::Workload;
use rig_device_hardware::outbound::local::{Behavior, RecordingNotifier, RecordingScalingClient};
use rig_device_hardware::outbound::Device;
use rig_device_hardware::scheduler::{DeviceLocks, Scheduler};
use rig_device_hardware::store::HardwareStore;
use rig_hardware::Resources;
use rig_id::{DeviceId, UserId};

pub struct Harness {
    pub store: Arc<HardwareStore>,
    pub locks: Arc<DeviceLocks>,
    pub scaling: Arc<RecordingScalingClient>,
    pub notifier: Arc<RecordingNotifier>,
    pub scheduler: Arc<Scheduler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_behavior(Behavior::Succeed, Behavior::Succeed, Duration::from_millis(500))
    }

    pub fn with_behavior(scaling: Behavior, notify: Behavior, timeout: Duration) -> Self {
        let store = Arc::new(HardwareStore::open_in_memory().unwrap());
        let locks = Arc::new(DeviceLocks::new());
        let scaling = Arc::new(RecordingScalingClient::with_behavior(scaling));
        let notifier = Arc::new(RecordingNotifier::with_behavior(notify));
        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            locks.clone(),
            scaling.clone(),
            notifier.clone(),
            timeout,
        ));
        Self {
            store,
            locks,
            scaling,
            notifier,
            scheduler,
        }
    }

    /// An assembled, powered-on device with the given capacity.
    pub fn device(&self, capacity: Resources) -> Device {
        let device = Device {
            id: DeviceId::new(),
            owner: UserId::new(),
            powered_on: true,
        };
        assert!(self
            .store
            .create_device(&Workload::idle(device.id, capacity), &[])
            .unwrap());
        device
    }

    pub fn usage(&self, device: &Device) -> Resources {
        self.store.get_workload(&device.id).unwrap().unwrap().usage
    }

    /// Sum of the nominal demand of the device's services.
    pub fn demand_sum(&self, device: &Device) -> Resources {
        self.store
            .list_services(&device.id)
            .unwrap()
            .iter()
            .fold(Resources::ZERO, |acc, s| acc + s.demand)
    }
}

/// Capacity with only the CPU constrained.
pub fn cpu_capacity(cpu: f64) -> Resources {
    Resources::new(cpu, 1e9, 1e9, 1e9, 1e9)
}

pub fn cpu_demand(cpu: f64) -> Resources {
    Resources::new(cpu, 0.0, 0.0, 0.0, 0.0)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
