//! RocksDB-backed key/value backend
//!
//! Persistent storage with one column family per entity type.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, DB};

use super::schema::{self, ALL_CFS, CF_META};
use super::state::{KvBackend, StoreError, StoreResult, UpdateFn};

/// Persistent backend over a RocksDB directory
pub struct RocksBackend {
    db: RwLock<DB>,
    path: PathBuf,
    // Serializes read-modify-write cycles (sequences and row updates)
    rmw_lock: Mutex<()>,
}

impl RocksBackend {
    /// Open or create a database at the given path
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)?;

        Ok(Self {
            db: RwLock::new(db),
            path,
            rmw_lock: Mutex::new(()),
        })
    }

    /// Get the database path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvBackend for RocksBackend {
    fn put(&self, cf: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let handle = db
            .cf_handle(cf)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf.to_string()))?;
        db.put_cf(handle, key.as_bytes(), value)?;
        Ok(())
    }

    fn get(&self, cf: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let handle = db
            .cf_handle(cf)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf.to_string()))?;
        Ok(db.get_cf(handle, key.as_bytes())?)
    }

    fn scan_prefix(&self, cf: &str, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let handle = db
            .cf_handle(cf)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf.to_string()))?;

        let mut entries = Vec::new();
        let iter = db.iterator_cf(
            handle,
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
        );
        for item in iter {
            let (key, value) = item?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| StoreError::Deserialization(e.to_string()))?;
            if !key.starts_with(prefix) {
                break; // Prefix no longer matches
            }
            entries.push((key, value.to_vec()));
        }
        Ok(entries)
    }

    fn next_sequence(&self, name: &str) -> StoreResult<u64> {
        let _guard = self.rmw_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let key = schema::keys::sequence(name);

        let current = match self.get(CF_META, &key)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Deserialization(format!("corrupt sequence '{}'", name))
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        self.put(CF_META, &key, &next.to_be_bytes())?;
        Ok(next)
    }

    fn update(&self, cf: &str, key: &str, apply: UpdateFn<'_>) -> StoreResult<()> {
        let _guard = self.rmw_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let current = self.get(cf, key)?;
        if let Some(next) = apply(current.as_deref())? {
            self.put(cf, key, &next)?;
        }
        Ok(())
    }
}
