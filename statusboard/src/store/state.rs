//! Typed state store over a key/value backend
//!
//! Entity values are stored as JSON for debuggability. Parent/child
//! relations are kept in the `index` column family so that nested reads
//! (project → snapshots → responsibilities → escalations) are prefix scans.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use super::memory::MemoryBackend;
use super::schema::{self, keys, seq};
use crate::model::{
    Escalation, EscalationId, Project, ProjectId, Responsibility, ResponsibilityId, SnapshotId,
    StatusSnapshot,
};

/// Error type for state store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[cfg(feature = "heavy-state")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),
}

impl StoreError {
    /// Lock poisoning and backend I/O may clear on retry; data errors will not
    pub fn is_retryable(&self) -> bool {
        match self {
            #[cfg(feature = "heavy-state")]
            Self::RocksDb(_) => true,
            Self::LockPoisoned => true,
            _ => false,
        }
    }
}

/// Result type for state store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Generic create/read/list primitives keyed by column family
pub trait KvBackend: Send + Sync {
    /// Store a value, replacing any previous one
    fn put(&self, cf: &str, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Read a value
    fn get(&self, cf: &str, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// All entries whose key starts with `prefix`, in key order
    fn scan_prefix(&self, cf: &str, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>>;

    /// Atomically allocate the next id of a named sequence (starts at 1)
    fn next_sequence(&self, name: &str) -> StoreResult<u64>;

    /// Read, transform and write one value with no interleaved writer.
    ///
    /// `apply` sees the current value and returns the replacement, or
    /// `None` to leave the stored value untouched.
    fn update(&self, cf: &str, key: &str, apply: UpdateFn<'_>) -> StoreResult<()>;
}

/// Transform handed to [`KvBackend::update`]
pub type UpdateFn<'a> = &'a mut dyn FnMut(Option<&[u8]>) -> StoreResult<Option<Vec<u8>>>;

/// Shared reference to StateStore
pub type SharedStateStore = Arc<StateStore>;

/// Typed entity store
pub struct StateStore {
    backend: Arc<dyn KvBackend>,
}

impl StateStore {
    /// Store over a caller-supplied backend
    pub fn with_backend(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Volatile in-memory store
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()))
    }

    /// Open or create a RocksDB-backed store at the given path
    #[cfg(feature = "heavy-state")]
    pub fn open(path: impl Into<std::path::PathBuf>) -> StoreResult<Self> {
        let backend = super::rocks::RocksBackend::open(path)?;
        Ok(Self::with_backend(Arc::new(backend)))
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedStateStore {
        Arc::new(self)
    }

    // =========================================================================
    // Generic operations
    // =========================================================================

    fn put<T: Serialize>(&self, cf: &str, key: &str, value: &T) -> StoreResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.backend.put(cf, key, &bytes)
    }

    fn get<T: DeserializeOwned>(&self, cf: &str, key: &str) -> StoreResult<Option<T>> {
        match self.backend.get(cf, key)? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Deserialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn list<T: DeserializeOwned>(&self, cf: &str, prefix: &str) -> StoreResult<Vec<T>> {
        self.backend
            .scan_prefix(cf, prefix)?
            .into_iter()
            .map(|(_, bytes)| {
                serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Deserialization(e.to_string()))
            })
            .collect()
    }

    /// Atomic read-modify-write of one entity row.
    ///
    /// Returns `Ok(None)` when the row does not exist. An error from `apply`
    /// aborts the write and is returned as is.
    fn modify<T, R, E>(
        &self,
        cf: &str,
        key: &str,
        apply: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<Option<R>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StoreError>,
    {
        let mut apply = Some(apply);
        let mut outcome: Option<Result<R, E>> = None;
        self.backend.update(
            cf,
            key,
            &mut |current: Option<&[u8]>| -> StoreResult<Option<Vec<u8>>> {
                let (Some(bytes), Some(apply)) = (current, apply.take()) else {
                    return Ok(None);
                };
                let mut value: T = serde_json::from_slice(bytes)
                    .map_err(|e| StoreError::Deserialization(e.to_string()))?;
                match apply(&mut value) {
                    Ok(result) => {
                        let bytes = serde_json::to_vec(&value)
                            .map_err(|e| StoreError::Serialization(e.to_string()))?;
                        outcome = Some(Ok(result));
                        Ok(Some(bytes))
                    }
                    Err(e) => {
                        outcome = Some(Err(e));
                        Ok(None)
                    }
                }
            },
        )?;
        outcome.transpose()
    }

    /// Child ids recorded under an index prefix, in creation order
    fn index_children(&self, prefix: &str) -> StoreResult<Vec<u64>> {
        Ok(self
            .backend
            .scan_prefix(schema::CF_INDEX, prefix)?
            .iter()
            .filter_map(|(key, _)| keys::parse_child_id(key))
            .collect())
    }

    fn put_index(&self, key: &str) -> StoreResult<()> {
        self.backend.put(schema::CF_INDEX, key, &[])
    }

    // =========================================================================
    // Id allocation
    // =========================================================================

    pub fn next_project_id(&self) -> StoreResult<ProjectId> {
        self.backend.next_sequence(seq::PROJECT)
    }

    pub fn next_snapshot_id(&self) -> StoreResult<SnapshotId> {
        self.backend.next_sequence(seq::SNAPSHOT)
    }

    pub fn next_responsibility_id(&self) -> StoreResult<ResponsibilityId> {
        self.backend.next_sequence(seq::RESPONSIBILITY)
    }

    pub fn next_escalation_id(&self) -> StoreResult<EscalationId> {
        self.backend.next_sequence(seq::ESCALATION)
    }

    // =========================================================================
    // Project operations
    // =========================================================================

    /// Store a project and its code index
    pub fn put_project(&self, project: &Project) -> StoreResult<()> {
        self.put(schema::CF_PROJECTS, &keys::project(project.id), project)?;
        self.put(
            schema::CF_INDEX,
            &keys::project_code(&project.code),
            &project.id,
        )
    }

    pub fn get_project(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        self.get(schema::CF_PROJECTS, &keys::project(id))
    }

    pub fn get_project_by_code(&self, code: &str) -> StoreResult<Option<Project>> {
        match self.get::<ProjectId>(schema::CF_INDEX, &keys::project_code(code))? {
            Some(id) => self.get_project(id),
            None => Ok(None),
        }
    }

    pub fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.list(schema::CF_PROJECTS, keys::PROJECT_PREFIX)
    }

    // =========================================================================
    // Snapshot operations
    // =========================================================================

    /// Store a snapshot and link it to its project
    pub fn put_snapshot(&self, snapshot: &StatusSnapshot) -> StoreResult<()> {
        self.put(schema::CF_SNAPSHOTS, &keys::snapshot(snapshot.id), snapshot)?;
        self.put_index(&keys::project_snapshot(snapshot.project_id, snapshot.id))
    }

    pub fn get_snapshot(&self, id: SnapshotId) -> StoreResult<Option<StatusSnapshot>> {
        self.get(schema::CF_SNAPSHOTS, &keys::snapshot(id))
    }

    /// Atomically edit a stored snapshot; `Ok(None)` if it does not exist
    pub fn modify_snapshot<R, E: From<StoreError>>(
        &self,
        id: SnapshotId,
        apply: impl FnOnce(&mut StatusSnapshot) -> Result<R, E>,
    ) -> Result<Option<R>, E> {
        self.modify(schema::CF_SNAPSHOTS, &keys::snapshot(id), apply)
    }

    /// Snapshots of a project in creation order
    pub fn list_project_snapshots(
        &self,
        project_id: ProjectId,
    ) -> StoreResult<Vec<StatusSnapshot>> {
        let ids = self.index_children(&keys::project_snapshot_prefix(project_id))?;
        let mut snapshots = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(snapshot) = self.get_snapshot(id)? {
                snapshots.push(snapshot);
            }
        }
        Ok(snapshots)
    }

    // =========================================================================
    // Responsibility operations
    // =========================================================================

    /// Store a responsibility and link it to its snapshot
    pub fn put_responsibility(&self, responsibility: &Responsibility) -> StoreResult<()> {
        self.put(
            schema::CF_RESPONSIBILITIES,
            &keys::responsibility(responsibility.id),
            responsibility,
        )?;
        self.put_index(&keys::snapshot_responsibility(
            responsibility.project_status_id,
            responsibility.id,
        ))
    }

    pub fn get_responsibility(&self, id: ResponsibilityId) -> StoreResult<Option<Responsibility>> {
        self.get(schema::CF_RESPONSIBILITIES, &keys::responsibility(id))
    }

    /// Atomically edit a stored responsibility; `Ok(None)` if it does not exist
    pub fn modify_responsibility<R, E: From<StoreError>>(
        &self,
        id: ResponsibilityId,
        apply: impl FnOnce(&mut Responsibility) -> Result<R, E>,
    ) -> Result<Option<R>, E> {
        self.modify(schema::CF_RESPONSIBILITIES, &keys::responsibility(id), apply)
    }

    /// Responsibilities of a snapshot in creation order
    pub fn list_snapshot_responsibilities(
        &self,
        snapshot_id: SnapshotId,
    ) -> StoreResult<Vec<Responsibility>> {
        let ids = self.index_children(&keys::snapshot_responsibility_prefix(snapshot_id))?;
        let mut responsibilities = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(r) = self.get_responsibility(id)? {
                responsibilities.push(r);
            }
        }
        Ok(responsibilities)
    }

    pub fn list_responsibilities(&self) -> StoreResult<Vec<Responsibility>> {
        self.list(schema::CF_RESPONSIBILITIES, keys::RESPONSIBILITY_PREFIX)
    }

    // =========================================================================
    // Escalation operations
    // =========================================================================

    /// Store an escalation and link it to its responsibility
    pub fn put_escalation(&self, escalation: &Escalation) -> StoreResult<()> {
        self.put(
            schema::CF_ESCALATIONS,
            &keys::escalation(escalation.id),
            escalation,
        )?;
        self.put_index(&keys::responsibility_escalation(
            escalation.responsibility_id,
            escalation.id,
        ))
    }

    pub fn get_escalation(&self, id: EscalationId) -> StoreResult<Option<Escalation>> {
        self.get(schema::CF_ESCALATIONS, &keys::escalation(id))
    }

    /// Atomically edit a stored escalation; `Ok(None)` if it does not exist
    pub fn modify_escalation<R, E: From<StoreError>>(
        &self,
        id: EscalationId,
        apply: impl FnOnce(&mut Escalation) -> Result<R, E>,
    ) -> Result<Option<R>, E> {
        self.modify(schema::CF_ESCALATIONS, &keys::escalation(id), apply)
    }

    pub fn list_escalations(&self) -> StoreResult<Vec<Escalation>> {
        self.list(schema::CF_ESCALATIONS, keys::ESCALATION_PREFIX)
    }

    /// Escalations raised against one responsibility, oldest first
    pub fn list_responsibility_escalations(
        &self,
        responsibility_id: ResponsibilityId,
    ) -> StoreResult<Vec<Escalation>> {
        let ids = self.index_children(&keys::responsibility_escalation_prefix(responsibility_id))?;
        let mut escalations = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(e) = self.get_escalation(id)? {
                escalations.push(e);
            }
        }
        Ok(escalations)
    }
}
