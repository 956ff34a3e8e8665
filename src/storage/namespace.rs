//! Namespace storage
//!
//! One namespace holds `PARTITION_COUNT` partitions. A partition maps digests
//! to record slots; each slot has its own mutex, which is the per-key lock
//! every transaction runs under.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::config::NamespaceConfig;
use crate::error::Result;
use crate::key::{Digest, PARTITION_COUNT};

use super::StoredRecord;

/// Record slot: `None` while the key has no live record
type Slot = Arc<Mutex<Option<StoredRecord>>>;

type Partition = RwLock<HashMap<Digest, Slot>>;

/// Records of one namespace
///
/// ## Concurrency:
/// - Partition locks are held only to look up, insert, or reclaim slots
/// - A slot's mutex is held for the whole transaction on that key
/// - Never take a partition lock while holding a slot that others may hold
pub struct Namespace {
    name: String,
    default_ttl: u32,
    partitions: Vec<Partition>,
}

impl Namespace {
    pub fn new(config: &NamespaceConfig) -> Self {
        let partitions = (0..PARTITION_COUNT)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();

        Self {
            name: config.name.clone(),
            default_ttl: config.default_ttl_secs,
            partitions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_ttl(&self) -> u32 {
        self.default_ttl
    }

    /// Run `f` as one atomic transaction on the record at `digest`
    ///
    /// `f` sees `None` if the record is absent or expired. It may replace the
    /// slot contents; on error it must leave them untouched.
    pub fn transact<T, F>(&self, digest: Digest, f: F) -> Result<T>
    where
        F: FnOnce(&mut Option<StoredRecord>, Instant) -> Result<T>,
    {
        let partition = &self.partitions[digest.partition_id()];
        let slot = Self::acquire_slot(partition, digest);

        let (result, vacant) = {
            let mut guard = slot.lock();
            let now = Instant::now();
            if guard.as_ref().is_some_and(|r| r.is_expired(now)) {
                tracing::trace!("Evicting expired record {} on access", digest);
                *guard = None;
            }
            let result = f(&mut *guard, now);
            (result, guard.is_none())
        };

        drop(slot);
        if vacant {
            Self::reclaim(partition, digest);
        }

        result
    }

    /// Run `f` against the record at `digest` without creating a slot
    pub fn view<T, F>(&self, digest: Digest, f: F) -> Result<T>
    where
        F: FnOnce(Option<&StoredRecord>, Instant) -> Result<T>,
    {
        let partition = &self.partitions[digest.partition_id()];
        let existing = partition.read().get(&digest).cloned();

        let now = Instant::now();
        match existing {
            None => f(None, now),
            Some(slot) => {
                let guard = slot.lock();
                let record = guard.as_ref().filter(|r| !r.is_expired(now));
                f(record, now)
            }
        }
    }

    /// Drop expired records and empty slots nobody is using
    ///
    /// Slots currently held by a transaction are left for a later pass.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;

        for partition in &self.partitions {
            let mut map = partition.write();
            map.retain(|_, slot| {
                if Arc::strong_count(slot) > 1 {
                    return true;
                }
                let mut guard = slot.lock();
                match guard.as_ref() {
                    Some(record) if record.is_expired(now) => {
                        *guard = None;
                        evicted += 1;
                        false
                    }
                    Some(_) => true,
                    None => false,
                }
            });
        }

        evicted
    }

    /// Number of live records
    pub fn record_count(&self) -> usize {
        let now = Instant::now();
        self.partitions
            .iter()
            .map(|partition| {
                partition
                    .read()
                    .values()
                    .filter(|slot| slot.lock().as_ref().is_some_and(|r| !r.is_expired(now)))
                    .count()
            })
            .sum()
    }

    fn acquire_slot(partition: &Partition, digest: Digest) -> Slot {
        let existing = partition.read().get(&digest).cloned();
        match existing {
            Some(slot) => slot,
            None => Arc::clone(
                partition
                    .write()
                    .entry(digest)
                    .or_insert_with(|| Arc::new(Mutex::new(None))),
            ),
        }
    }

    /// Remove a vacant slot if no other caller holds it
    ///
    /// Slots are only cloned under the partition lock, so a strong count of 1
    /// under the write lock means nobody can be about to use it.
    fn reclaim(partition: &Partition, digest: Digest) {
        let mut map = partition.write();
        let vacant = map
            .get(&digest)
            .is_some_and(|slot| Arc::strong_count(slot) == 1 && slot.lock().is_none());
        if vacant {
            map.remove(&digest);
        }
    }
}
