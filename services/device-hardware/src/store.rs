//! SQLite-backed store for workloads, services and installed hardware.
//!
//! Every write of a scheduler or assembly operation goes through a single
//! transaction, so a device's usage and its service rows never disagree on
//! disk.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use rig_hardware::{PartCategory, Resources};
use rig_id::{DeviceId, IdError, ServiceId};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use thiserror::Error;
use tracing::debug;

use crate::model::{InstalledPart, Service, Workload};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection lock poisoned")]
    Poisoned,

    #[error("workload for device {0} not found")]
    WorkloadMissing(DeviceId),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        "storage_error"
    }
}

#[derive(Debug, Error)]
#[error("unknown part category '{0}'")]
struct UnknownCategory(String);

/// SQLite hardware store.
pub struct HardwareStore {
    conn: Mutex<Connection>,
}

impl HardwareStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Open an in-memory store (dev mode and tests).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS workload (
                device_id TEXT PRIMARY KEY,
                performance_cpu REAL NOT NULL,
                performance_ram REAL NOT NULL,
                performance_gpu REAL NOT NULL,
                performance_disk REAL NOT NULL,
                performance_network REAL NOT NULL,
                usage_cpu REAL NOT NULL DEFAULT 0,
                usage_ram REAL NOT NULL DEFAULT 0,
                usage_gpu REAL NOT NULL DEFAULT 0,
                usage_disk REAL NOT NULL DEFAULT 0,
                usage_network REAL NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS service (
                service_id TEXT PRIMARY KEY,
                device_id TEXT NOT NULL REFERENCES workload(device_id) ON DELETE CASCADE,
                allocated_cpu REAL NOT NULL,
                allocated_ram REAL NOT NULL,
                allocated_gpu REAL NOT NULL,
                allocated_disk REAL NOT NULL,
                allocated_network REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_service_device ON service(device_id);

            CREATE TABLE IF NOT EXISTS hardware (
                id TEXT PRIMARY KEY,
                device_id TEXT NOT NULL,
                catalog_key TEXT NOT NULL,
                category TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_hardware_device ON hardware(device_id);
            "#,
        )?;

        debug!("Hardware store schema initialized");
        Ok(())
    }

    /// Cheap round trip used by the readiness probe.
    pub fn health_check(&self) -> Result<(), StoreError> {
        self.conn()?.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Get the workload of a device.
    pub fn get_workload(&self, device_id: &DeviceId) -> Result<Option<Workload>, StoreError> {
        self.conn()?
            .query_row(
                "SELECT device_id,
                        performance_cpu, performance_ram, performance_gpu, performance_disk, performance_network,
                        usage_cpu, usage_ram, usage_gpu, usage_disk, usage_network
                 FROM workload WHERE device_id = ?1",
                params![device_id.to_string()],
                workload_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a service by id, on any device.
    pub fn get_service(&self, service_id: &ServiceId) -> Result<Option<Service>, StoreError> {
        self.conn()?
            .query_row(
                "SELECT service_id, device_id,
                        allocated_cpu, allocated_ram, allocated_gpu, allocated_disk, allocated_network
                 FROM service WHERE service_id = ?1",
                params![service_id.to_string()],
                service_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List the services of a device, ordered by id.
    pub fn list_services(&self, device_id: &DeviceId) -> Result<Vec<Service>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT service_id, device_id,
                    allocated_cpu, allocated_ram, allocated_gpu, allocated_disk, allocated_network
             FROM service WHERE device_id = ?1 ORDER BY service_id",
        )?;

        let services = stmt
            .query_map(params![device_id.to_string()], service_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(services)
    }

    /// List the parts installed in a device.
    pub fn list_hardware(&self, device_id: &DeviceId) -> Result<Vec<InstalledPart>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, device_id, catalog_key, category FROM hardware
             WHERE device_id = ?1 ORDER BY id",
        )?;

        let parts = stmt
            .query_map(params![device_id.to_string()], |row| {
                let category: String = row.get(3)?;
                let category = PartCategory::parse(&category).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        Type::Text,
                        Box::new(UnknownCategory(category.clone())),
                    )
                })?;

                Ok(InstalledPart {
                    id: id_column(row, 0)?,
                    device_id: id_column(row, 1)?,
                    catalog_key: row.get(2)?,
                    category,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(parts)
    }

    /// Persist a newly assembled device.
    ///
    /// Returns `false` without writing anything if the device already has a
    /// workload.
    pub fn create_device(
        &self,
        workload: &Workload,
        parts: &[InstalledPart],
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let p = &workload.performance;
        let u = &workload.usage;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO workload (
                device_id,
                performance_cpu, performance_ram, performance_gpu, performance_disk, performance_network,
                usage_cpu, usage_ram, usage_gpu, usage_disk, usage_network
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                workload.device_id.to_string(),
                p.cpu,
                p.ram,
                p.gpu,
                p.disk,
                p.network,
                u.cpu,
                u.ram,
                u.gpu,
                u.disk,
                u.network,
            ],
        )?;
        if inserted == 0 {
            return Ok(false);
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO hardware (id, device_id, catalog_key, category) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for part in parts {
                stmt.execute(params![
                    part.id.to_string(),
                    part.device_id.to_string(),
                    part.catalog_key,
                    part.category.as_str(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(true)
    }

    /// Insert a service and store the device's new usage.
    ///
    /// Returns `false` and changes nothing if the service id is taken, on
    /// this device or any other.
    pub fn insert_service(&self, service: &Service, usage: &Resources) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let d = &service.demand;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO service (
                service_id, device_id,
                allocated_cpu, allocated_ram, allocated_gpu, allocated_disk, allocated_network
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                service.service_id.to_string(),
                service.device_id.to_string(),
                d.cpu,
                d.ram,
                d.gpu,
                d.disk,
                d.network,
            ],
        )?;
        if inserted == 0 {
            return Ok(false);
        }
        set_usage(&tx, &service.device_id, usage)?;

        tx.commit()?;
        Ok(true)
    }

    /// Overwrite a service's demand and store the device's new usage.
    pub fn update_demand(&self, service: &Service, usage: &Resources) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let d = &service.demand;
        tx.execute(
            "UPDATE service SET
                allocated_cpu = ?2, allocated_ram = ?3, allocated_gpu = ?4,
                allocated_disk = ?5, allocated_network = ?6
             WHERE service_id = ?1",
            params![
                service.service_id.to_string(),
                d.cpu,
                d.ram,
                d.gpu,
                d.disk,
                d.network,
            ],
        )?;
        set_usage(&tx, &service.device_id, usage)?;

        tx.commit()?;
        Ok(())
    }

    /// Delete a service and store the device's new usage.
    pub fn delete_service(
        &self,
        service_id: &ServiceId,
        device_id: &DeviceId,
        usage: &Resources,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM service WHERE service_id = ?1",
            params![service_id.to_string()],
        )?;
        set_usage(&tx, device_id, usage)?;

        tx.commit()?;
        Ok(())
    }

    /// Drop every service of a device.
    ///
    /// The device keeps its workload with zero usage, unless `delete` is set,
    /// in which case the workload and the installed hardware go too.
    pub fn release_device(&self, device_id: &DeviceId, delete: bool) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let id = device_id.to_string();

        tx.execute("DELETE FROM service WHERE device_id = ?1", params![id])?;
        if delete {
            tx.execute("DELETE FROM workload WHERE device_id = ?1", params![id])?;
            tx.execute("DELETE FROM hardware WHERE device_id = ?1", params![id])?;
        } else {
            set_usage(&tx, device_id, &Resources::ZERO)?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn set_usage(tx: &Transaction<'_>, device_id: &DeviceId, usage: &Resources) -> Result<(), StoreError> {
    let updated = tx.execute(
        "UPDATE workload SET
            usage_cpu = ?2, usage_ram = ?3, usage_gpu = ?4, usage_disk = ?5, usage_network = ?6
         WHERE device_id = ?1",
        params![
            device_id.to_string(),
            usage.cpu,
            usage.ram,
            usage.gpu,
            usage.disk,
            usage.network,
        ],
    )?;
    if updated == 0 {
        return Err(StoreError::WorkloadMissing(*device_id));
    }
    Ok(())
}

fn id_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = IdError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn resources_at(row: &Row<'_>, start: usize) -> rusqlite::Result<Resources> {
    Ok(Resources::new(
        row.get(start)?,
        row.get(start + 1)?,
        row.get(start + 2)?,
        row.get(start + 3)?,
        row.get(start + 4)?,
    ))
}

fn workload_from_row(row: &Row<'_>) -> rusqlite::Result<Workload> {
    Ok(Workload {
        device_id: id_column(row, 0)?,
        performance: resources_at(row, 1)?,
        usage: resources_at(row, 6)?,
    })
}

fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        service_id: id_column(row, 0)?,
        device_id: id_column(row, 1)?,
        demand: resources_at(row, 2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_id::HardwareId;

    fn assembled(store: &HardwareStore) -> DeviceId {
        let device_id = DeviceId::new();
        let workload = Workload::idle(device_id, Resources::splat(100.0));
        let parts = vec![InstalledPart {
            id: HardwareId::new(),
            device_id,
            catalog_key: "Zero MX One".to_string(),
            category: PartCategory::Mainboard,
        }];
        assert!(store.create_device(&workload, &parts).unwrap());
        device_id
    }

    #[test]
    fn test_create_device_once() {
        let store = HardwareStore::open_in_memory().unwrap();
        let device_id = assembled(&store);

        let workload = store.get_workload(&device_id).unwrap().unwrap();
        assert_eq!(workload.performance, Resources::splat(100.0));
        assert_eq!(workload.usage, Resources::ZERO);

        let again = Workload::idle(device_id, Resources::splat(1.0));
        assert!(!store.create_device(&again, &[]).unwrap());
        let workload = store.get_workload(&device_id).unwrap().unwrap();
        assert_eq!(workload.performance, Resources::splat(100.0));

        let parts = store.list_hardware(&device_id).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].category, PartCategory::Mainboard);
    }

    #[test]
    fn test_service_lifecycle() {
        let store = HardwareStore::open_in_memory().unwrap();
        let device_id = assembled(&store);

        let mut service = Service {
            service_id: ServiceId::new(),
            device_id,
            demand: Resources::splat(10.0),
        };
        assert!(store
            .insert_service(&service, &Resources::splat(10.0))
            .unwrap());
        assert_eq!(
            store.get_service(&service.service_id).unwrap(),
            Some(service)
        );

        service.demand = Resources::splat(4.0);
        store
            .update_demand(&service, &Resources::splat(4.0))
            .unwrap();
        let workload = store.get_workload(&device_id).unwrap().unwrap();
        assert_eq!(workload.usage, Resources::splat(4.0));

        store
            .delete_service(&service.service_id, &device_id, &Resources::ZERO)
            .unwrap();
        assert!(store.get_service(&service.service_id).unwrap().is_none());
        assert!(store.list_services(&device_id).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_service_id_on_other_device() {
        let store = HardwareStore::open_in_memory().unwrap();
        let first = assembled(&store);
        let second = assembled(&store);
        let service_id = ServiceId::new();

        let service = Service {
            service_id,
            device_id: first,
            demand: Resources::splat(2.0),
        };
        assert!(store.insert_service(&service, &Resources::splat(2.0)).unwrap());

        let clash = Service {
            device_id: second,
            ..service
        };
        assert!(!store.insert_service(&clash, &Resources::splat(2.0)).unwrap());

        assert_eq!(store.get_service(&service_id).unwrap(), Some(service));
        let untouched = store.get_workload(&second).unwrap().unwrap();
        assert_eq!(untouched.usage, Resources::ZERO);
    }

    #[test]
    fn test_failed_usage_write_rolls_back_insert() {
        let store = HardwareStore::open_in_memory().unwrap();
        let service = Service {
            service_id: ServiceId::new(),
            device_id: DeviceId::new(),
            demand: Resources::splat(1.0),
        };

        assert!(store.insert_service(&service, &Resources::splat(1.0)).is_err());
        assert!(store.get_service(&service.service_id).unwrap().is_none());
    }

    #[test]
    fn test_release_device() {
        let store = HardwareStore::open_in_memory().unwrap();
        let device_id = assembled(&store);
        let service = Service {
            service_id: ServiceId::new(),
            device_id,
            demand: Resources::splat(3.0),
        };
        store
            .insert_service(&service, &Resources::splat(3.0))
            .unwrap();

        store.release_device(&device_id, false).unwrap();
        let workload = store.get_workload(&device_id).unwrap().unwrap();
        assert_eq!(workload.usage, Resources::ZERO);
        assert!(store.list_services(&device_id).unwrap().is_empty());
        assert_eq!(store.list_hardware(&device_id).unwrap().len(), 1);

        store.release_device(&device_id, true).unwrap();
        assert!(store.get_workload(&device_id).unwrap().is_none());
        assert!(store.list_hardware(&device_id).unwrap().is_empty());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hardware.db");

        let device_id = {
            let store = HardwareStore::open(&path).unwrap();
            assembled(&store)
        };

        let store = HardwareStore::open(&path).unwrap();
        assert!(store.get_workload(&device_id).unwrap().is_some());
        store.health_check().unwrap();
    }
}
