//! Capacity of an assembled device.

use crate::catalog::{Catalog, GraphicUnit};
use crate::parts::ResolvedBuild;
use crate::resources::Resources;

/// Derives the capacity vector of a build.
///
/// Intended for builds that passed [`crate::check_compatible`], but only
/// needs resolved parts: empty part lists contribute nothing.
pub fn calculate_performance(build: &ResolvedBuild<'_>) -> Resources {
    let catalog = build.catalog;

    let cpu = build
        .cpus
        .iter()
        .map(|cpu| f64::from(cpu.cores) * f64::from(cpu.frequency_max))
        .sum();

    let ram = build
        .ram
        .iter()
        .map(|stick| memory_score(catalog, &stick.ram_type, stick.ram_size, stick.frequency))
        .sum();

    Resources {
        cpu,
        ram,
        gpu: best_graphics(build),
        disk: build
            .disks
            .iter()
            .map(|disk| 100.0 * (disk.writing_speed * disk.reading_speed).log10())
            .sum(),
        network: build.mainboard.network_port.speed,
    }
}

fn memory_score(catalog: &Catalog, ram_type: &str, ram_size: u32, frequency: u32) -> f64 {
    catalog.ram_type_factor(ram_type) * (f64::from(ram_size) * f64::from(frequency)).sqrt()
}

/// Only the strongest graphics source counts; sources are never summed.
fn best_graphics(build: &ResolvedBuild<'_>) -> f64 {
    let catalog = build.catalog;
    let integrated = |unit: &GraphicUnit| {
        memory_score(catalog, &unit.ram_type, unit.ram_size, unit.frequency)
    };

    build
        .mainboard
        .graphic_unit_on_board
        .iter()
        .chain(build.cpus.iter().filter_map(|cpu| cpu.graphic_unit.as_ref()))
        .map(integrated)
        .chain(
            build
                .gpus
                .iter()
                .map(|gpu| memory_score(catalog, &gpu.ram_type, gpu.ram_size, gpu.frequency)),
        )
        .fold(0.0, f64::max)
}
