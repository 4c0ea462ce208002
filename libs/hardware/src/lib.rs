//! # rig-hardware
//!
//! Pure hardware logic for assembled devices:
//!
//! - [`Catalog`]: the read-only table of part specs, loaded once and injected.
//! - [`PartSelection`]: a proposed build, resolved against the catalog into a
//!   [`ResolvedBuild`] of typed references.
//! - [`check_compatible`]: ordered compatibility checks, first failure wins.
//! - [`calculate_performance`]: the capacity vector of a build.
//!
//! Nothing in this crate performs I/O apart from [`Catalog::load`].

mod catalog;
mod error;
mod parts;
mod performance;
mod resources;
mod validate;

pub use catalog::{
    CaseSpec, Catalog, CoolerSpec, CpuSpec, DiskSpec, DiskStorage, ExpansionSlot, GpuSpec,
    GraphicUnit, MainboardRam, MainboardSpec, NetworkPort, PowerPackSpec, RamSpec,
};
pub use error::{CatalogError, CompatibilityError};
pub use parts::{PartCategory, PartSelection, ResolvedBuild};
pub use performance::calculate_performance;
pub use resources::{Resource, Resources};
pub use validate::check_compatible;

/// Runs the full build preview: resolve, validate, then calculate.
///
/// Deterministic for a given catalog and selection.
pub fn preview_build(
    catalog: &Catalog,
    selection: &PartSelection,
) -> Result<Resources, CompatibilityError> {
    let build = catalog.resolve(selection)?;
    check_compatible(&build)?;
    Ok(calculate_performance(&build))
}
