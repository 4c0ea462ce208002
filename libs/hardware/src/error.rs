//! Error types for catalog loading and build validation.

use thiserror::Error;

use crate::parts::PartCategory;

/// A build was rejected. Each variant maps to a stable wire code.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CompatibilityError {
    #[error("element_{0}_not_found")]
    ElementNotFound(PartCategory),

    #[error("missing_cpu")]
    MissingCpu,

    #[error("missing_ram")]
    MissingRam,

    #[error("missing_disk")]
    MissingDisk,

    #[error("invalid_amount_of_cpu_coolers")]
    InvalidAmountOfCpuCoolers,

    #[error("incompatible_case")]
    IncompatibleCase,

    #[error("not_enough_cpu_slots")]
    NotEnoughCpuSlots,

    #[error("incompatible_cpu_socket")]
    IncompatibleCpuSocket,

    #[error("incompatible_cooler_socket")]
    IncompatibleCoolerSocket,

    #[error("missing_external_gpu")]
    MissingExternalGpu,

    #[error("no_compatible_expansion_slot_for_gpu")]
    NoCompatibleExpansionSlotForGpu,

    #[error("no_compatible_expansion_slot_for_disk")]
    NoCompatibleExpansionSlotForDisk,

    #[error("not_enough_ram_slots")]
    NotEnoughRamSlots,

    #[error("incompatible_ram_type")]
    IncompatibleRamType,

    #[error("incompatible_ram_frequency")]
    IncompatibleRamFrequency,

    #[error("ram_limit_exceeded")]
    RamLimitExceeded,

    #[error("insufficient_power_pack")]
    InsufficientPowerPack,
}

impl CompatibilityError {
    /// The snake_case code returned to callers.
    ///
    /// Identical to the `Display` output.
    pub fn code(&self) -> String {
        self.to_string()
    }
}

/// The catalog document could not be loaded.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{category} '{key}' references unknown RAM type '{ram_type}'")]
    UnknownRamType {
        category: PartCategory,
        key: String,
        ram_type: String,
    },

    #[error("disk '{key}' must have positive reading and writing speeds")]
    InvalidDiskSpeed { key: String },
}
