//! Per-device serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rig_id::DeviceId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<DeviceId, Arc<AsyncMutex<()>>>;

/// One async mutex per device.
///
/// Holding a device's guard gives exclusive access to its workload and
/// service rows. Guards of different devices never contend. An entry lives
/// only while someone holds or waits on it.
#[derive(Debug, Default)]
pub struct DeviceLocks {
    locks: Mutex<LockMap>,
}

/// Exclusive access to one device. Releasing the last interest in a device
/// removes its entry.
#[derive(Debug)]
pub struct DeviceGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a DeviceLocks,
    device_id: DeviceId,
}

impl DeviceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for exclusive access to `device_id`.
    pub async fn lock(&self, device_id: &DeviceId) -> DeviceGuard<'_> {
        let lock = Arc::clone(self.map().entry(*device_id).or_default());
        DeviceGuard {
            guard: Some(lock.lock_owned().await),
            locks: self,
            device_id: *device_id,
        }
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for DeviceGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so the map's Arc is the only one left when idle.
        drop(self.guard.take());

        let mut locks = self.locks.map();
        if locks
            .get(&self.device_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.device_id);
        }
    }
}
