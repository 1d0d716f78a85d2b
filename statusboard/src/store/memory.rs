//! In-memory backend
//!
//! Default backend for tests and embedded use. Column families are ordered
//! maps so prefix scans return keys in creation order, like RocksDB.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};

use super::schema::ALL_CFS;
use super::state::{KvBackend, StoreError, StoreResult, UpdateFn};

/// Volatile key/value backend
#[derive(Debug)]
pub struct MemoryBackend {
    cfs: RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>,
    sequences: Mutex<HashMap<String, u64>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let cfs = ALL_CFS
            .iter()
            .map(|name| (name.to_string(), BTreeMap::new()))
            .collect();
        Self {
            cfs: RwLock::new(cfs),
            sequences: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KvBackend for MemoryBackend {
    fn put(&self, cf: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut cfs = self.cfs.write().map_err(|_| StoreError::LockPoisoned)?;
        let family = cfs
            .get_mut(cf)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf.to_string()))?;
        family.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, cf: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let cfs = self.cfs.read().map_err(|_| StoreError::LockPoisoned)?;
        let family = cfs
            .get(cf)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf.to_string()))?;
        Ok(family.get(key).cloned())
    }

    fn scan_prefix(&self, cf: &str, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let cfs = self.cfs.read().map_err(|_| StoreError::LockPoisoned)?;
        let family = cfs
            .get(cf)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf.to_string()))?;
        Ok(family
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn next_sequence(&self, name: &str) -> StoreResult<u64> {
        let mut sequences = self.sequences.lock().map_err(|_| StoreError::LockPoisoned)?;
        let next = sequences.entry(name.to_string()).or_insert(0);
        *next += 1;
        Ok(*next)
    }

    fn update(&self, cf: &str, key: &str, apply: UpdateFn<'_>) -> StoreResult<()> {
        // The write lock is held across the read and the write
        let mut cfs = self.cfs.write().map_err(|_| StoreError::LockPoisoned)?;
        let family = cfs
            .get_mut(cf)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf.to_string()))?;
        if let Some(next) = apply(family.get(key).map(Vec::as_slice))? {
            family.insert(key.to_string(), next);
        }
        Ok(())
    }
}
