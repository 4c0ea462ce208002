//! Proposed builds and their resolution against the catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{
    Catalog, CoolerSpec, CpuSpec, DiskSpec, GpuSpec, MainboardSpec, PowerPackSpec, RamSpec,
};
use crate::error::CompatibilityError;

/// Catalog category of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PartCategory {
    Cpu,
    Mainboard,
    Gpu,
    Ram,
    Disk,
    PowerPack,
    Case,
    ProcessorCooler,
}

impl PartCategory {
    /// Categories in the order their existence is checked.
    pub const ALL: [PartCategory; 8] = [
        PartCategory::Cpu,
        PartCategory::Mainboard,
        PartCategory::Gpu,
        PartCategory::Ram,
        PartCategory::Disk,
        PartCategory::PowerPack,
        PartCategory::Case,
        PartCategory::ProcessorCooler,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartCategory::Cpu => "cpu",
            PartCategory::Mainboard => "mainboard",
            PartCategory::Gpu => "gpu",
            PartCategory::Ram => "ram",
            PartCategory::Disk => "disk",
            PartCategory::PowerPack => "powerPack",
            PartCategory::Case => "case",
            PartCategory::ProcessorCooler => "processorCooler",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for PartCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed set of parts, by catalog key.
///
/// The single-slot parts are required fields, so a request without a
/// mainboard, power pack or case never reaches the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartSelection {
    pub mainboard: String,
    #[serde(default)]
    pub cpu: Vec<String>,
    #[serde(default)]
    pub gpu: Vec<String>,
    #[serde(default)]
    pub ram: Vec<String>,
    #[serde(default)]
    pub disk: Vec<String>,
    #[serde(default)]
    pub processor_cooler: Vec<String>,
    pub power_pack: String,
    pub case: String,
}

impl PartSelection {
    /// Every selected part as `(category, key)`, in existence-check order.
    pub fn parts(&self) -> impl Iterator<Item = (PartCategory, &str)> + '_ {
        fn many(
            category: PartCategory,
            keys: &[String],
        ) -> impl Iterator<Item = (PartCategory, &str)> + '_ {
            keys.iter().map(move |k| (category, k.as_str()))
        }

        many(PartCategory::Cpu, &self.cpu)
            .chain(std::iter::once((
                PartCategory::Mainboard,
                self.mainboard.as_str(),
            )))
            .chain(many(PartCategory::Gpu, &self.gpu))
            .chain(many(PartCategory::Ram, &self.ram))
            .chain(many(PartCategory::Disk, &self.disk))
            .chain(std::iter::once((
                PartCategory::PowerPack,
                self.power_pack.as_str(),
            )))
            .chain(std::iter::once((PartCategory::Case, self.case.as_str())))
            .chain(many(PartCategory::ProcessorCooler, &self.processor_cooler))
    }
}

/// A selection whose every key was found in the catalog.
#[derive(Debug, Clone)]
pub struct ResolvedBuild<'a> {
    pub catalog: &'a Catalog,
    pub mainboard: &'a MainboardSpec,
    pub cpus: Vec<&'a CpuSpec>,
    pub gpus: Vec<&'a GpuSpec>,
    pub ram: Vec<&'a RamSpec>,
    pub disks: Vec<&'a DiskSpec>,
    pub coolers: Vec<&'a CoolerSpec>,
    pub power_pack: &'a PowerPackSpec,
    pub case: &'a str,
}

impl Catalog {
    /// Looks up every key of `selection`.
    ///
    /// Fails with `element_<category>_not_found` for the first category (in
    /// [`PartCategory::ALL`] order) holding an unknown key.
    pub fn resolve(
        &self,
        selection: &PartSelection,
    ) -> Result<ResolvedBuild<'_>, CompatibilityError> {
        for category in PartCategory::ALL {
            let missing = selection
                .parts()
                .filter(|(c, _)| *c == category)
                .any(|(_, key)| !self.contains(category, key));
            if missing {
                return Err(CompatibilityError::ElementNotFound(category));
            }
        }

        let not_found = CompatibilityError::ElementNotFound;

        Ok(ResolvedBuild {
            catalog: self,
            mainboard: self
                .mainboard
                .get(&selection.mainboard)
                .ok_or(not_found(PartCategory::Mainboard))?,
            cpus: lookup_all(&selection.cpu, &self.cpu),
            gpus: lookup_all(&selection.gpu, &self.gpu),
            ram: lookup_all(&selection.ram, &self.ram),
            disks: lookup_all(&selection.disk, &self.disk),
            coolers: lookup_all(&selection.processor_cooler, &self.processor_cooler),
            power_pack: self
                .power_pack
                .get(&selection.power_pack)
                .ok_or(not_found(PartCategory::PowerPack))?,
            case: self
                .case
                .get_key_value(&selection.case)
                .map(|(k, _)| k.as_str())
                .ok_or(not_found(PartCategory::Case))?,
        })
    }
}

fn lookup_all<'a, T>(keys: &[String], map: &'a BTreeMap<String, T>) -> Vec<&'a T> {
    keys.iter().filter_map(|k| map.get(k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection() -> PartSelection {
        PartSelection {
            mainboard: "board".to_string(),
            cpu: vec!["cpu1".to_string(), "cpu2".to_string()],
            gpu: vec!["gpu1".to_string()],
            ram: vec!["ram1".to_string()],
            disk: vec!["disk1".to_string()],
            processor_cooler: vec!["cooler1".to_string()],
            power_pack: "pack".to_string(),
            case: "case".to_string(),
        }
    }

    #[test]
    fn test_parts_lists_every_key() {
        let selection = selection();
        let parts: Vec<_> = selection.parts().collect();
        assert_eq!(parts.len(), 9);
        assert_eq!(parts[0], (PartCategory::Cpu, "cpu1"));
        assert_eq!(parts[2], (PartCategory::Mainboard, "board"));
        assert_eq!(parts[8], (PartCategory::ProcessorCooler, "cooler1"));
    }

    #[test]
    fn test_category_names_roundtrip() {
        for category in PartCategory::ALL {
            assert_eq!(PartCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(PartCategory::parse("floppy"), None);
    }

    #[test]
    fn test_selection_requires_single_slot_parts() {
        let json = r#"{"cpu": ["a"], "powerPack": "p", "case": "c"}"#;
        assert!(serde_json::from_str::<PartSelection>(json).is_err());

        let json = r#"{"mainboard": "m", "powerPack": "p", "case": "c"}"#;
        let parsed: PartSelection = serde_json::from_str(json).unwrap();
        assert!(parsed.cpu.is_empty());
        assert!(parsed.processor_cooler.is_empty());
    }

    #[test]
    fn test_resolve_reports_first_missing_category() {
        let catalog = Catalog::default();
        let err = catalog.resolve(&selection()).unwrap_err();
        assert_eq!(err, CompatibilityError::ElementNotFound(PartCategory::Cpu));
    }
}
