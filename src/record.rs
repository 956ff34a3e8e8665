//! Records
//!
//! A [`Record`] is what callers write and what reads hand back: a set of named
//! bins plus generation and TTL metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::key::UserKey;
use crate::value::Value;

/// Maximum bin name length in bytes
pub const MAX_BIN_NAME_LEN: usize = 15;

/// TTL value meaning "never expire"
pub const TTL_NEVER_EXPIRE: u32 = u32::MAX;

/// TTL value meaning "use the namespace default" (on write)
pub const TTL_NAMESPACE_DEFAULT: u32 = 0;

/// A record: bins plus metadata
///
/// On write, `generation` is ignored (generation checks travel in the policy)
/// and `ttl` selects the expiry. On read, both report the stored state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// User key, present on reads only if it was stored with the record
    pub key: Option<UserKey>,

    /// Bin name -> value; enumerated in name order
    pub bins: BTreeMap<String, Value>,

    /// Version counter, starts at 1 on creation
    pub generation: u32,

    /// Remaining time-to-live in seconds
    pub ttl: u32,
}

/// Record metadata returned by `exists`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub generation: u32,
    pub ttl: u32,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a bin (builder style)
    pub fn with_bin(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set the TTL to use on write (builder style)
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bins.insert(name.into(), value.into());
    }

    /// Mark a bin for deletion on the next write
    pub fn set_nil(&mut self, name: impl Into<String>) {
        self.bins.insert(name.into(), Value::Nil);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bins.get(name)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(Value::as_bytes)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_list(&self, name: &str) -> Option<&[Value]> {
        self.get(name).and_then(Value::as_list)
    }

    pub fn get_map(&self, name: &str) -> Option<&BTreeMap<Value, Value>> {
        self.get(name).and_then(Value::as_map)
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Iterate bins in name order
    pub fn bins(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bins.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            generation: self.generation,
            ttl: self.ttl,
        }
    }
}

/// Validate a bin name against the length limits
pub(crate) fn check_bin_name(name: &str) -> crate::Result<()> {
    if name.is_empty() || name.len() > MAX_BIN_NAME_LEN {
        return Err(crate::NimbusError::Parameter(format!(
            "bin name '{}' must be 1..={} bytes",
            name, MAX_BIN_NAME_LEN
        )));
    }
    Ok(())
}
