//! Engine Module
//!
//! The record engine that coordinates all components.
//!
//! ## Responsibilities
//! - Route commands to record, operate, and list handlers
//! - Resolve generation policies inside the per-key transaction
//! - Keep the zero-bin invariant (a record without bins does not exist)
//! - Advance the generation exactly once per successful mutation

use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::Config;
use crate::error::{NimbusError, Result};
use crate::key::{Key, UserKey};
use crate::llist::{ElementFilter, LargeList};
use crate::operate::{apply_operations, write_bin, Operation};
use crate::policy::{resolve, KeyStorage, RemovePolicy, WritePolicy};
use crate::protocol::{Command, Reply};
use crate::record::{check_bin_name, Record, RecordMetadata, TTL_NAMESPACE_DEFAULT};
use crate::storage::{
    expiry_for, next_generation, Namespace, StorageManager, StoredBin, StoredRecord,
};
use crate::value::{Value, ValueType};

/// The main record engine
///
/// ## Concurrency Model: Per-Key Transactions
///
/// - Every call on a key runs under that key's slot lock, from policy check
///   through mutation and generation bump
/// - Calls on different keys never contend beyond a brief partition lookup
/// - All methods take `&self`; share the engine behind an `Arc`
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Record storage, one entry per namespace
    storage: StorageManager,
}

impl Engine {
    /// Create an engine serving the configured namespaces
    pub fn open(config: Config) -> Result<Self> {
        let storage = StorageManager::open(&config)?;
        Ok(Self { config, storage })
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Reply> {
        match command {
            Command::Ping => Ok(Reply::Pong),
            Command::Put {
                key,
                record,
                policy,
            } => self.put(&key, &record, &policy).map(Reply::Generation),
            Command::Get { key, bins } => self.read(&key, bins.as_deref()).map(Reply::Record),
            Command::Exists { key } => self.exists(&key).map(Reply::Metadata),
            Command::Remove { key, policy } => self.remove(&key, &policy).map(|_| Reply::Done),
            Command::Operate {
                key,
                operations,
                policy,
            } => self
                .operate(&key, &operations, &policy)
                .map(Reply::Operated),
            Command::ListAdd { key, bin, value } => {
                self.llist_add(&key, &bin, value).map(|_| Reply::Done)
            }
            Command::ListAddAll { key, bin, values } => {
                self.llist_add_all(&key, &bin, values).map(|_| Reply::Done)
            }
            Command::ListRemove { key, bin, value } => {
                self.llist_remove(&key, &bin, value).map(|_| Reply::Done)
            }
            Command::ListSize { key, bin } => self.llist_size(&key, &bin).map(Reply::Size),
            Command::ListFilter { key, bin, filter } => self
                .llist_filter(&key, &bin, filter.as_ref())
                .map(Reply::Values),
            Command::ListFind { key, bin, value } => {
                self.llist_find(&key, &bin, value).map(Reply::Values)
            }
            Command::ListExists { key, bin, value } => {
                self.llist_exists(&key, &bin, value).map(Reply::Flag)
            }
            Command::ListDestroy { key, bin } => {
                self.llist_destroy(&key, &bin).map(|_| Reply::Done)
            }
        }
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Upsert the record's bins
    ///
    /// `Nil` bins are deleted; if that leaves no bins the record is deleted
    /// and 0 is returned. Otherwise returns the new generation.
    pub fn put(&self, key: &Key, record: &Record, policy: &WritePolicy) -> Result<u32> {
        if record.bins.is_empty() {
            return Err(NimbusError::Parameter("record has no bins".to_string()));
        }
        for name in record.bins.keys() {
            check_bin_name(name)?;
        }

        let ns = self.namespace(key)?;
        ns.transact(key.digest(), |slot, now| {
            let stored_generation = slot.as_ref().map_or(0, |r| r.generation);
            resolve(policy.generation_check(), stored_generation).into_result()?;

            let mut bins = slot.as_ref().map(|r| r.bins.clone()).unwrap_or_default();
            for (name, value) in &record.bins {
                write_bin(&mut bins, name, value.clone())?;
            }

            let user_key = retained_key(slot, key, policy.key_storage());
            let expires_at = expiry_for(record.ttl, ns.default_ttl(), now);
            let generation = commit(slot, bins, expires_at, user_key);

            tracing::trace!("put {} -> generation {}", key, generation);
            Ok(generation)
        })
    }

    /// Read the whole record
    pub fn get(&self, key: &Key) -> Result<Record> {
        self.read(key, None)
    }

    /// Read only the named bins
    ///
    /// Bins that are not named, or that the record lacks, are omitted.
    pub fn select(&self, key: &Key, bins: &[&str]) -> Result<Record> {
        let names: Vec<String> = bins.iter().map(|b| b.to_string()).collect();
        self.read(key, Some(&names))
    }

    fn read(&self, key: &Key, bin_filter: Option<&[String]>) -> Result<Record> {
        let ns = self.namespace(key)?;
        ns.view(key.digest(), |record, now| {
            let record = record.ok_or(NimbusError::RecordNotFound)?;
            Ok(record.to_record(bin_filter, now))
        })
    }

    /// Check existence; returns generation and TTL
    pub fn exists(&self, key: &Key) -> Result<RecordMetadata> {
        let ns = self.namespace(key)?;
        ns.view(key.digest(), |record, now| {
            record
                .map(|r| r.metadata(now))
                .ok_or(NimbusError::RecordNotFound)
        })
    }

    /// Delete the whole record
    pub fn remove(&self, key: &Key, policy: &RemovePolicy) -> Result<()> {
        let ns = self.namespace(key)?;
        ns.transact(key.digest(), |slot, _now| {
            let stored = slot.as_ref().ok_or(NimbusError::RecordNotFound)?;
            resolve(policy.generation_check(), stored.generation).into_result()?;

            *slot = None;
            tracing::trace!("removed {}", key);
            Ok(())
        })
    }

    /// Apply a batch of operations atomically
    ///
    /// Returns the values read by the batch, or `None` if it had no reads.
    pub fn operate(
        &self,
        key: &Key,
        operations: &[Operation],
        policy: &WritePolicy,
    ) -> Result<Option<Record>> {
        if operations.is_empty() {
            return Err(NimbusError::Parameter("operation list is empty".to_string()));
        }

        let ns = self.namespace(key)?;
        ns.transact(key.digest(), |slot, now| {
            let mutating = operations.iter().any(Operation::is_mutation);
            // Only bin mutations can create a record; reads and touch need one
            let creates = operations
                .iter()
                .any(|op| op.is_mutation() && op.bin().is_some());
            if !creates && slot.is_none() {
                return Err(NimbusError::RecordNotFound);
            }
            if mutating {
                let stored_generation = slot.as_ref().map_or(0, |r| r.generation);
                resolve(policy.generation_check(), stored_generation).into_result()?;
            }

            let mut bins = slot.as_ref().map(|r| r.bins.clone()).unwrap_or_default();
            let outcome = apply_operations(&mut bins, operations)?;

            if outcome.mutated {
                let expires_at = match slot.as_ref() {
                    Some(r) if !outcome.touched => r.expires_at,
                    _ => expiry_for(TTL_NAMESPACE_DEFAULT, ns.default_ttl(), now),
                };
                let user_key = retained_key(slot, key, policy.key_storage());
                let generation = commit(slot, bins, expires_at, user_key);
                tracing::trace!(
                    "operate {} ({} ops) -> generation {}",
                    key,
                    operations.len(),
                    generation
                );
            }

            if !outcome.has_reads {
                return Ok(None);
            }

            let (user_key, generation, ttl) = match slot.as_ref() {
                Some(r) => (r.user_key.clone(), r.generation, r.ttl(now)),
                None => (None, 0, 0),
            };
            Ok(Some(Record {
                key: user_key,
                bins: outcome.reads,
                generation,
                ttl,
            }))
        })
    }

    // =========================================================================
    // Large Ordered List Operations
    // =========================================================================

    /// Add one element, creating the list (and record) if needed
    pub fn llist_add(&self, key: &Key, bin: &str, value: impl Into<Value>) -> Result<()> {
        self.llist_add_all(key, bin, vec![value.into()])
    }

    /// Add several elements atomically; a type conflict adds none of them
    pub fn llist_add_all(&self, key: &Key, bin: &str, values: Vec<Value>) -> Result<()> {
        check_bin_name(bin)?;
        if values.is_empty() {
            return Err(NimbusError::Parameter(format!(
                "no values to add to list bin '{}'",
                bin
            )));
        }

        let ns = self.namespace(key)?;
        ns.transact(key.digest(), |slot, now| {
            if let Some(record) = slot.as_mut() {
                match list_mut(record, bin)? {
                    Some(list) => list.add_all(bin, values)?,
                    None => {
                        let list = LargeList::from_values(bin, values)?;
                        record
                            .bins
                            .insert(bin.to_string(), StoredBin::LargeList(list));
                    }
                }
                record.generation = next_generation(record.generation);
                return Ok(());
            }

            let list = LargeList::from_values(bin, values)?;
            let mut bins = BTreeMap::new();
            bins.insert(bin.to_string(), StoredBin::LargeList(list));
            let expires_at = expiry_for(TTL_NAMESPACE_DEFAULT, ns.default_ttl(), now);
            commit(slot, bins, expires_at, None);
            Ok(())
        })
    }

    /// Remove one element equal to `value`; an emptied list is dropped
    pub fn llist_remove(&self, key: &Key, bin: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let ns = self.namespace(key)?;
        ns.transact(key.digest(), |slot, _now| {
            let record = slot.as_mut().ok_or_else(|| bin_not_found(bin))?;
            let list = list_mut(record, bin)?.ok_or_else(|| bin_not_found(bin))?;
            list.remove(bin, &value)?;

            if list.is_empty() {
                record.bins.remove(bin);
            }
            finish_list_mutation(slot);
            Ok(())
        })
    }

    /// Number of elements in the list
    pub fn llist_size(&self, key: &Key, bin: &str) -> Result<u64> {
        self.view_list(key, bin, |list| {
            u64::try_from(list.len()).map_err(|_| {
                NimbusError::Server(format!("list bin '{}' size does not fit in u64", bin))
            })
        })
    }

    /// Elements matching `filter` (all if `None`) in sorted order
    pub fn llist_filter(
        &self,
        key: &Key,
        bin: &str,
        filter: Option<&ElementFilter>,
    ) -> Result<Vec<Value>> {
        self.view_list(key, bin, |list| Ok(list.filter(filter)))
    }

    /// Every element equal to `value`
    pub fn llist_find(&self, key: &Key, bin: &str, value: impl Into<Value>) -> Result<Vec<Value>> {
        let value = value.into();
        self.view_list(key, bin, |list| {
            let found = list.find(&value);
            if found.is_empty() {
                return Err(NimbusError::ElementNotFound {
                    bin: bin.to_string(),
                });
            }
            Ok(found.to_vec())
        })
    }

    /// Whether an element equal to `value` is present
    pub fn llist_exists(&self, key: &Key, bin: &str, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        self.view_list(key, bin, |list| Ok(list.contains(&value)))
    }

    /// Drop the whole list bin
    pub fn llist_destroy(&self, key: &Key, bin: &str) -> Result<()> {
        let ns = self.namespace(key)?;
        ns.transact(key.digest(), |slot, _now| {
            let record = slot.as_mut().ok_or_else(|| bin_not_found(bin))?;
            if list_mut(record, bin)?.is_none() {
                return Err(bin_not_found(bin));
            }

            record.bins.remove(bin);
            finish_list_mutation(slot);
            tracing::trace!("destroyed list bin '{}' of {}", bin, key);
            Ok(())
        })
    }

    fn view_list<T, F>(&self, key: &Key, bin: &str, f: F) -> Result<T>
    where
        F: FnOnce(&LargeList) -> Result<T>,
    {
        let ns = self.namespace(key)?;
        ns.view(key.digest(), |record, _now| {
            let record = record.ok_or_else(|| bin_not_found(bin))?;
            match record.bins.get(bin) {
                Some(StoredBin::LargeList(list)) => f(list),
                Some(StoredBin::Value(v)) => Err(NimbusError::BinTypeMismatch {
                    bin: bin.to_string(),
                    expected: ValueType::LargeList,
                    found: v.value_type(),
                }),
                None => Err(bin_not_found(bin)),
            }
        })
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Evict expired records in every namespace
    pub fn evict_expired(&self) -> usize {
        self.storage.evict_expired()
    }

    /// Number of live records in a namespace
    pub fn record_count(&self, namespace: &str) -> Result<usize> {
        Ok(self.storage.namespace(namespace)?.record_count())
    }

    /// Names of the served namespaces
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.storage.namespace_names().map(String::from).collect();
        names.sort();
        names
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn namespace(&self, key: &Key) -> Result<&Namespace> {
        self.storage.namespace(key.namespace())
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Install new bins into the slot; an empty bin map deletes the record
///
/// Returns the new generation, or 0 if no record remains.
fn commit(
    slot: &mut Option<StoredRecord>,
    bins: BTreeMap<String, StoredBin>,
    expires_at: Option<Instant>,
    user_key: Option<UserKey>,
) -> u32 {
    if bins.is_empty() {
        *slot = None;
        return 0;
    }

    let generation = next_generation(slot.as_ref().map_or(0, |r| r.generation));
    *slot = Some(StoredRecord {
        bins,
        generation,
        expires_at,
        user_key,
    });
    generation
}

/// Bump the generation after an in-place list change, or drop an emptied record
fn finish_list_mutation(slot: &mut Option<StoredRecord>) {
    let emptied = slot.as_ref().is_some_and(|r| r.bins.is_empty());
    if emptied {
        *slot = None;
    } else if let Some(record) = slot.as_mut() {
        record.generation = next_generation(record.generation);
    }
}

/// User key to keep with the record after a write
fn retained_key(slot: &Option<StoredRecord>, key: &Key, storage: KeyStorage) -> Option<UserKey> {
    match storage {
        KeyStorage::Send => Some(key.user_key().clone()),
        KeyStorage::DigestOnly => slot.as_ref().and_then(|r| r.user_key.clone()),
    }
}

/// The list stored in `bin`, `None` if the bin is absent
fn list_mut<'a>(record: &'a mut StoredRecord, bin: &str) -> Result<Option<&'a mut LargeList>> {
    match record.bins.get_mut(bin) {
        Some(StoredBin::LargeList(list)) => Ok(Some(list)),
        Some(StoredBin::Value(v)) => Err(NimbusError::BinTypeMismatch {
            bin: bin.to_string(),
            expected: ValueType::LargeList,
            found: v.value_type(),
        }),
        None => Ok(None),
    }
}

fn bin_not_found(bin: &str) -> NimbusError {
    NimbusError::BinNotFound {
        bin: bin.to_string(),
    }
}
