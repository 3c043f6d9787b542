//! Object registry: object name → per-region location URLs
//!
//! Two backends:
//! - [`RocksRegistry`]: durable, one RocksDB column family keyed by name
//! - [`MemoryRegistry`]: process-local, for tests and throwaway deployments
//!
//! Every operation touches a single row. The all-or-nothing guarantee for
//! replication comes from the coordinator committing here last.

use crate::common::{Error, Result};
use rocksdb::{Options, DB};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

const CF_OBJECTS: &str = "objects";

/// Committed object: one URL per region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub name: String,
    /// Region name → stored URL
    pub locations: BTreeMap<String, String>,
    pub size: u64,
    pub created_at: u64,
}

/// Keyed record store for committed objects.
///
/// `list_all` returns records ordered by name.
pub trait RegistryStore: Send + Sync {
    /// Insert a new record; fails with `AlreadyExists` if the name is taken.
    fn add(&self, record: &ObjectRecord) -> Result<()>;

    /// Insert or replace a record.
    fn replace(&self, record: &ObjectRecord) -> Result<()>;

    /// Fails with `NotFound` for an unknown name.
    fn get(&self, name: &str) -> Result<ObjectRecord>;

    /// Fails with `NotFound` for an unknown name.
    fn delete(&self, name: &str) -> Result<()>;

    fn list_all(&self) -> Result<Vec<ObjectRecord>>;

    fn contains(&self, name: &str) -> Result<bool> {
        match self.get(name) {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// RocksDB-backed registry
pub struct RocksRegistry {
    db: DB,
    // serializes check-then-insert in `add`
    write_lock: Mutex<()>,
}

impl RocksRegistry {
    /// Open or create the registry
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let db = DB::open_cf(&opts, path, vec![CF_OBJECTS])?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn objects(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_OBJECTS)
            .ok_or_else(|| Error::Internal(format!("missing column family {}", CF_OBJECTS)))
    }

    fn read(&self, name: &str) -> Result<Option<ObjectRecord>> {
        match self.db.get_cf(self.objects()?, name.as_bytes())? {
            Some(bytes) => {
                let record: ObjectRecord = bincode::deserialize(&bytes)
                    .map_err(|e| Error::MetadataCorrupted(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn write(&self, record: &ObjectRecord) -> Result<()> {
        let value = bincode::serialize(record)
            .map_err(|e| Error::Internal(format!("Serialize error: {}", e)))?;
        self.db
            .put_cf(self.objects()?, record.name.as_bytes(), value)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| Error::Internal("registry lock poisoned".into()))
    }

    /// Flush to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl RegistryStore for RocksRegistry {
    fn add(&self, record: &ObjectRecord) -> Result<()> {
        let _guard = self.lock()?;
        if self.read(&record.name)?.is_some() {
            return Err(Error::AlreadyExists(record.name.clone()));
        }
        self.write(record)
    }

    fn replace(&self, record: &ObjectRecord) -> Result<()> {
        let _guard = self.lock()?;
        self.write(record)
    }

    fn get(&self, name: &str) -> Result<ObjectRecord> {
        self.read(name)?
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.lock()?;
        if self.read(name)?.is_none() {
            return Err(Error::NotFound(name.to_string()));
        }
        self.db.delete_cf(self.objects()?, name.as_bytes())?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<ObjectRecord>> {
        let iter = self
            .db
            .iterator_cf(self.objects()?, rocksdb::IteratorMode::Start);

        let mut records = Vec::new();
        for item in iter {
            let (_, value_bytes) = item?;
            let record: ObjectRecord = bincode::deserialize(&value_bytes)
                .map_err(|e| Error::MetadataCorrupted(e.to_string()))?;
            records.push(record);
        }

        Ok(records)
    }
}

/// In-memory registry
#[derive(Default)]
pub struct MemoryRegistry {
    map: Mutex<BTreeMap<String, ObjectRecord>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, ObjectRecord>>> {
        self.map
            .lock()
            .map_err(|_| Error::Internal("registry lock poisoned".into()))
    }
}

impl RegistryStore for MemoryRegistry {
    fn add(&self, record: &ObjectRecord) -> Result<()> {
        let mut map = self.map()?;
        if map.contains_key(&record.name) {
            return Err(Error::AlreadyExists(record.name.clone()));
        }
        map.insert(record.name.clone(), record.clone());
        Ok(())
    }

    fn replace(&self, record: &ObjectRecord) -> Result<()> {
        self.map()?.insert(record.name.clone(), record.clone());
        Ok(())
    }

    fn get(&self, name: &str) -> Result<ObjectRecord> {
        self.map()?
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.map()?
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn list_all(&self) -> Result<Vec<ObjectRecord>> {
        Ok(self.map()?.values().cloned().collect())
    }
}
