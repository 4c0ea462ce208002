//! Device access checks.
//!
//! Handlers chain these as `Result` steps; each passes the loaded device on
//! to the next:
//!
//! ```ignore
//! let device = device_exists(directory, &device_id)
//!     .await
//!     .and_then(|device| can_access_device(device, &user_id))
//!     .and_then(device_powered_on)?;
//! ```

use rig_id::{DeviceId, UserId};
use thiserror::Error;

use crate::outbound::{Device, DeviceDirectory};

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("device not found")]
    DeviceNotFound,

    #[error("device belongs to another user")]
    PermissionDenied,

    #[error("device is powered off")]
    DevicePoweredOff,

    #[error("device directory unavailable: {0}")]
    Directory(#[source] anyhow::Error),
}

impl GuardError {
    pub fn code(&self) -> &'static str {
        match self {
            GuardError::DeviceNotFound => "device_not_found",
            GuardError::PermissionDenied => "permission_denied",
            GuardError::DevicePoweredOff => "device_powered_off",
            GuardError::Directory(_) => "device_directory_unavailable",
        }
    }
}

pub async fn device_exists(
    directory: &dyn DeviceDirectory,
    device_id: &DeviceId,
) -> Result<Device, GuardError> {
    directory
        .get_device(device_id)
        .await
        .map_err(GuardError::Directory)?
        .ok_or(GuardError::DeviceNotFound)
}

pub fn can_access_device(device: Device, user_id: &UserId) -> Result<Device, GuardError> {
    if &device.owner != user_id {
        return Err(GuardError::PermissionDenied);
    }
    Ok(device)
}

pub fn device_powered_on(device: Device) -> Result<Device, GuardError> {
    if !device.powered_on {
        return Err(GuardError::DevicePoweredOff);
    }
    Ok(device)
}
