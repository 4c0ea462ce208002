//! Static hardware catalog.
//!
//! The catalog is a JSON document keyed by category, then by part name. It
//! is loaded once at process start and shared read-only afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::parts::PartCategory;

const BUNDLED_CATALOG: &str = include_str!("../catalog/default.json");

/// Graphics unit built into a mainboard or a CPU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphicUnit {
    pub name: String,
    pub ram_size: u32,
    #[serde(rename = "ramTyp")]
    pub ram_type: String,
    pub frequency: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionSlot {
    pub interface: String,
    pub interface_slots: u32,
}

/// Native disk connectors of a mainboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskStorage {
    pub disk_slots: u32,
    #[serde(rename = "interface")]
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainboardRam {
    pub ram_slots: u32,
    /// Largest total RAM size the board accepts.
    #[serde(rename = "ramSize")]
    pub max_size: u32,
    #[serde(rename = "typ")]
    pub types: Vec<String>,
    #[serde(rename = "frequency")]
    pub frequencies: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPort {
    pub name: String,
    pub interface: String,
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainboardSpec {
    pub case: String,
    pub cpu_socket: String,
    pub cpu_slots: u32,
    pub power: u32,
    #[serde(default)]
    pub graphic_unit_on_board: Option<GraphicUnit>,
    #[serde(default)]
    pub expansion_slots: Vec<ExpansionSlot>,
    pub disk_storage: DiskStorage,
    pub ram: MainboardRam,
    pub network_port: NetworkPort,
}

impl MainboardSpec {
    /// Free expansion slots per interface, before any part is seated.
    pub fn expansion_slot_pool(&self) -> BTreeMap<&str, u32> {
        let mut pool = BTreeMap::new();
        for slot in &self.expansion_slots {
            *pool.entry(slot.interface.as_str()).or_insert(0) += slot.interface_slots;
        }
        pool
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuSpec {
    pub frequency_min: u32,
    pub frequency_max: u32,
    pub socket: String,
    pub cores: u32,
    #[serde(default)]
    pub turbo_speed: bool,
    #[serde(default)]
    pub over_clock: bool,
    pub max_temperature: u32,
    pub power: u32,
    #[serde(default)]
    pub graphic_unit: Option<GraphicUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoolerSpec {
    pub cooler_speed: u32,
    pub socket: String,
    pub power: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RamSpec {
    pub ram_size: u32,
    #[serde(rename = "ramTyp")]
    pub ram_type: String,
    pub frequency: u32,
    pub power: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuSpec {
    pub ram_size: u32,
    #[serde(rename = "ramTyp")]
    pub ram_type: String,
    pub frequency: u32,
    pub interface: String,
    pub power: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpec {
    #[serde(rename = "diskTyp")]
    pub disk_type: String,
    pub capacity: u32,
    pub writing_speed: f64,
    pub reading_speed: f64,
    pub interface: String,
    pub power: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerPackSpec {
    pub total_power: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CaseSpec {}

/// The read-only hardware catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Generation speed multiplier per RAM type.
    pub ram_types: BTreeMap<String, f64>,
    #[serde(default)]
    pub mainboard: BTreeMap<String, MainboardSpec>,
    #[serde(default)]
    pub cpu: BTreeMap<String, CpuSpec>,
    #[serde(default)]
    pub processor_cooler: BTreeMap<String, CoolerSpec>,
    #[serde(default)]
    pub ram: BTreeMap<String, RamSpec>,
    #[serde(default)]
    pub gpu: BTreeMap<String, GpuSpec>,
    #[serde(default)]
    pub disk: BTreeMap<String, DiskSpec>,
    #[serde(default)]
    pub power_pack: BTreeMap<String, PowerPackSpec>,
    #[serde(default)]
    pub case: BTreeMap<String, CaseSpec>,
}

impl Catalog {
    /// Parses and checks a catalog document.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.check_ram_types()?;
        catalog.check_disk_speeds()?;
        Ok(catalog)
    }

    /// Loads a catalog document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// The catalog shipped with the crate.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json_str(BUNDLED_CATALOG)
    }

    /// Speed multiplier for a RAM type.
    ///
    /// Every type referenced by a part is checked at load time, so unknown
    /// types only occur in hand-built catalogs and count as the base factor.
    pub fn ram_type_factor(&self, ram_type: &str) -> f64 {
        self.ram_types.get(ram_type).copied().unwrap_or(1.0)
    }

    /// Whether `key` names a part of `category`.
    pub fn contains(&self, category: PartCategory, key: &str) -> bool {
        match category {
            PartCategory::Cpu => self.cpu.contains_key(key),
            PartCategory::Mainboard => self.mainboard.contains_key(key),
            PartCategory::Gpu => self.gpu.contains_key(key),
            PartCategory::Ram => self.ram.contains_key(key),
            PartCategory::Disk => self.disk.contains_key(key),
            PartCategory::PowerPack => self.power_pack.contains_key(key),
            PartCategory::Case => self.case.contains_key(key),
            PartCategory::ProcessorCooler => self.processor_cooler.contains_key(key),
        }
    }

    fn check_ram_types(&self) -> Result<(), CatalogError> {
        let referenced = self
            .ram
            .iter()
            .map(|(k, v)| (PartCategory::Ram, k, &v.ram_type))
            .chain(
                self.gpu
                    .iter()
                    .map(|(k, v)| (PartCategory::Gpu, k, &v.ram_type)),
            )
            .chain(self.cpu.iter().filter_map(|(k, v)| {
                v.graphic_unit
                    .as_ref()
                    .map(|g| (PartCategory::Cpu, k, &g.ram_type))
            }))
            .chain(self.mainboard.iter().filter_map(|(k, v)| {
                v.graphic_unit_on_board
                    .as_ref()
                    .map(|g| (PartCategory::Mainboard, k, &g.ram_type))
            }));

        for (category, key, ram_type) in referenced {
            if !self.ram_types.contains_key(ram_type) {
                return Err(CatalogError::UnknownRamType {
                    category,
                    key: key.clone(),
                    ram_type: ram_type.clone(),
                });
            }
        }

        Ok(())
    }

    /// Disk performance takes the log of the speeds, so both must be
    /// positive.
    fn check_disk_speeds(&self) -> Result<(), CatalogError> {
        let bad = self.disk.iter().find(|(_, d)| {
            [d.writing_speed, d.reading_speed]
                .iter()
                .any(|v| !v.is_finite() || *v <= 0.0)
        });
        match bad {
            Some((key, _)) => Err(CatalogError::InvalidDiskSpeed { key: key.clone() }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_loads() {
        let catalog = Catalog::bundled().unwrap();
        assert!(!catalog.mainboard.is_empty());
        assert!(!catalog.cpu.is_empty());
        assert!(!catalog.ram_types.is_empty());
    }

    #[test]
    fn test_unknown_ram_type_rejected() {
        let json = r#"{
            "ramTypes": {"DDR1": 1.0},
            "ram": {"stick": {"ramSize": 512, "ramTyp": "DDR9", "frequency": 422, "power": 5}}
        }"#;
        let err = Catalog::from_json_str(json).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnknownRamType { ref ram_type, .. } if ram_type == "DDR9"
        ));
    }

    #[test]
    fn test_zero_disk_speed_rejected() {
        let json = r#"{
            "ramTypes": {"DDR1": 1.0},
            "disk": {"stalled": {
                "diskTyp": "HDD", "capacity": 1, "writingSpeed": 0, "readingSpeed": 20,
                "interface": "IDE", "power": 1
            }}
        }"#;
        let err = Catalog::from_json_str(json).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidDiskSpeed { ref key } if key == "stalled"
        ));
    }

    #[test]
    fn test_expansion_pool_merges_duplicate_interfaces() {
        let catalog = Catalog::bundled().unwrap();
        let mut board = catalog.mainboard.values().next().unwrap().clone();
        board.expansion_slots = vec![
            ExpansionSlot {
                interface: "PCIe".to_string(),
                interface_slots: 1,
            },
            ExpansionSlot {
                interface: "PCIe".to_string(),
                interface_slots: 2,
            },
        ];
        assert_eq!(board.expansion_slot_pool().get("PCIe"), Some(&3));
    }

    #[test]
    fn test_missing_file() {
        let err = Catalog::load("/nonexistent/catalog.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
