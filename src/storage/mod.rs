//! Storage Module
//!
//! The in-memory record store.
//!
//! ## Responsibilities
//! - Hold records per namespace, partitioned by key digest
//! - Serialize every transaction on the same key (per-key lock)
//! - Expire records lazily on access and in periodic sweeps
//!
//! ## Layout
//! ```text
//! StorageManager
//!   └── Namespace ("test", ...)
//!         └── Partition[0..4096]  (RwLock<HashMap<Digest, Slot>>)
//!               └── Slot          (Mutex<Option<StoredRecord>>)
//! ```

mod manager;
mod namespace;
mod record;

pub use manager::StorageManager;
pub use namespace::Namespace;
pub use record::{expiry_for, next_generation, StoredBin, StoredRecord};
