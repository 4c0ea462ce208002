//! # rig-id
//!
//! Typed identifiers for the device hardware subsystem.
//!
//! Every id has a canonical string form `{prefix}_{ulid}` with strict parsing,
//! so a service id can never be passed where a device id is expected.
//!
//! Examples:
//! - `dev_01HV4Z2WQXKJNM8GPQY6VBKC3D`
//! - `svc_01HV4Z3MXNKPQR9HSTZ7WCLD4E`
//! - `usr_01HV4Z4NYPLTRS0JTUA8XDME5F`

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;
