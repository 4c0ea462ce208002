//! Build compatibility checks.
//!
//! Checks run in a fixed order and the first failure wins. Cheap counting
//! checks come before slot allocation, and power draw is checked last.

use crate::error::CompatibilityError;
use crate::parts::ResolvedBuild;

type Check = fn(&ResolvedBuild<'_>) -> Result<(), CompatibilityError>;

const CHECKS: [Check; 10] = [
    require_core_parts,
    check_cooler_count,
    check_case,
    check_cpu_slots,
    check_sockets,
    check_graphics_available,
    check_expansion_slots,
    check_ram_slots,
    check_ram_modules,
    check_power_budget,
];

/// Validates a resolved build.
///
/// Catalog existence is already guaranteed by [`crate::Catalog::resolve`].
pub fn check_compatible(build: &ResolvedBuild<'_>) -> Result<(), CompatibilityError> {
    CHECKS.iter().try_for_each(|check| check(build))
}

fn require_core_parts(build: &ResolvedBuild<'_>) -> Result<(), CompatibilityError> {
    if build.cpus.is_empty() {
        return Err(CompatibilityError::MissingCpu);
    }
    if build.ram.is_empty() {
        return Err(CompatibilityError::MissingRam);
    }
    if build.disks.is_empty() {
        return Err(CompatibilityError::MissingDisk);
    }
    Ok(())
}

fn check_cooler_count(build: &ResolvedBuild<'_>) -> Result<(), CompatibilityError> {
    if build.coolers.len() != build.cpus.len() {
        return Err(CompatibilityError::InvalidAmountOfCpuCoolers);
    }
    Ok(())
}

fn check_case(build: &ResolvedBuild<'_>) -> Result<(), CompatibilityError> {
    if build.mainboard.case != build.case {
        return Err(CompatibilityError::IncompatibleCase);
    }
    Ok(())
}

fn check_cpu_slots(build: &ResolvedBuild<'_>) -> Result<(), CompatibilityError> {
    if build.cpus.len() > build.mainboard.cpu_slots as usize {
        return Err(CompatibilityError::NotEnoughCpuSlots);
    }
    Ok(())
}

fn check_sockets(build: &ResolvedBuild<'_>) -> Result<(), CompatibilityError> {
    let socket = &build.mainboard.cpu_socket;
    for (cpu, cooler) in build.cpus.iter().zip(&build.coolers) {
        if &cpu.socket != socket {
            return Err(CompatibilityError::IncompatibleCpuSocket);
        }
        if &cooler.socket != socket {
            return Err(CompatibilityError::IncompatibleCoolerSocket);
        }
    }
    Ok(())
}

fn check_graphics_available(build: &ResolvedBuild<'_>) -> Result<(), CompatibilityError> {
    let integrated = build.mainboard.graphic_unit_on_board.is_some()
        || build.cpus.iter().any(|cpu| cpu.graphic_unit.is_some());
    if !integrated && build.gpus.is_empty() {
        return Err(CompatibilityError::MissingExternalGpu);
    }
    Ok(())
}

/// GPUs take expansion slots of their own interface. Disks take a leftover
/// expansion slot first and fall back to the native disk connectors.
fn check_expansion_slots(build: &ResolvedBuild<'_>) -> Result<(), CompatibilityError> {
    let mut pool = build.mainboard.expansion_slot_pool();

    for gpu in &build.gpus {
        match pool.get_mut(gpu.interface.as_str()) {
            Some(free) if *free > 0 => *free -= 1,
            _ => return Err(CompatibilityError::NoCompatibleExpansionSlotForGpu),
        }
    }

    let storage = &build.mainboard.disk_storage;
    let mut disk_slots = storage.disk_slots;
    for disk in &build.disks {
        if let Some(free) = pool.get_mut(disk.interface.as_str()).filter(|f| **f > 0) {
            *free -= 1;
            continue;
        }
        if disk_slots > 0 && storage.interfaces.contains(&disk.interface) {
            disk_slots -= 1;
            continue;
        }
        return Err(CompatibilityError::NoCompatibleExpansionSlotForDisk);
    }

    Ok(())
}

fn check_ram_slots(build: &ResolvedBuild<'_>) -> Result<(), CompatibilityError> {
    if build.ram.len() > build.mainboard.ram.ram_slots as usize {
        return Err(CompatibilityError::NotEnoughRamSlots);
    }
    Ok(())
}

fn check_ram_modules(build: &ResolvedBuild<'_>) -> Result<(), CompatibilityError> {
    let board = &build.mainboard.ram;
    for stick in &build.ram {
        if !board.types.contains(&stick.ram_type) {
            return Err(CompatibilityError::IncompatibleRamType);
        }
        if !board.frequencies.contains(&stick.frequency) {
            return Err(CompatibilityError::IncompatibleRamFrequency);
        }
    }

    let total: u64 = build.ram.iter().map(|stick| u64::from(stick.ram_size)).sum();
    if total > u64::from(board.max_size) {
        return Err(CompatibilityError::RamLimitExceeded);
    }
    Ok(())
}

fn check_power_budget(build: &ResolvedBuild<'_>) -> Result<(), CompatibilityError> {
    let draw = u64::from(build.mainboard.power)
        + build.cpus.iter().map(|p| u64::from(p.power)).sum::<u64>()
        + build.coolers.iter().map(|p| u64::from(p.power)).sum::<u64>()
        + build.gpus.iter().map(|p| u64::from(p.power)).sum::<u64>()
        + build.disks.iter().map(|p| u64::from(p.power)).sum::<u64>()
        + build.ram.iter().map(|p| u64::from(p.power)).sum::<u64>();

    if draw > u64::from(build.power_pack.total_power) {
        return Err(CompatibilityError::InsufficientPowerPack);
    }
    Ok(())
}
