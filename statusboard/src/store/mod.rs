//! State persistence for projects, snapshots, responsibilities and escalations
//!
//! # Architecture
//!
//! [`StateStore`] is a typed facade over a [`KvBackend`]. Backends expose
//! column families, ordered prefix scans and atomic id sequences:
//!
//! - [`MemoryBackend`]: volatile, the default
//! - `RocksBackend`: persistent, behind the `heavy-state` feature
//!
//! Column families separate entity types while sharing one backend:
//!
//! - `projects`, `snapshots`, `responsibilities`, `escalations`: entity rows
//! - `index`: parent → child links and unique project codes
//! - `meta`: id sequences
//!
//! # Usage
//!
//! ```ignore
//! use statusboard::store::StateStore;
//!
//! let store = StateStore::open("./statusboard-state")?.shared();
//! let snapshots = store.list_project_snapshots(project_id)?;
//! ```

pub mod memory;
#[cfg(feature = "heavy-state")]
pub mod rocks;
pub mod schema;
pub mod state;

pub use memory::MemoryBackend;
#[cfg(feature = "heavy-state")]
pub use rocks::RocksBackend;
pub use state::{KvBackend, SharedStateStore, StateStore, StoreError, StoreResult, UpdateFn};
