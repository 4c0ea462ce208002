//! rig device hardware service.
//!
//! Owns the hardware of assembled devices and schedules the resources of the
//! services running on them. The binary serves the HTTP API; the library
//! surface exists for integration testing.

pub mod api;
pub mod assembler;
pub mod config;
pub mod guards;
pub mod model;
pub mod outbound;
pub mod scheduler;
pub mod state;
pub mod store;
