//! Typed ID definitions.

use crate::define_id;

define_id!(
    /// A virtual computer assembled from catalog parts.
    DeviceId,
    "dev"
);
define_id!(
    /// One running workload unit hosted on a device.
    ServiceId,
    "svc"
);
define_id!(
    /// A player account; owns devices.
    UserId,
    "usr"
);
define_id!(
    /// One installed part record.
    HardwareId,
    "hw"
);
define_id!(RequestId, "req");
