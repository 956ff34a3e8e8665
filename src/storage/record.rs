//! Stored record representation
//!
//! What the store keeps per key. Unlike the caller-facing [`Record`], a stored
//! record can hold large ordered list bins and tracks an absolute expiry.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::key::UserKey;
use crate::llist::LargeList;
use crate::record::{Record, RecordMetadata, TTL_NAMESPACE_DEFAULT, TTL_NEVER_EXPIRE};
use crate::value::{Value, ValueType};

/// A bin as held by the store
#[derive(Debug, Clone, PartialEq)]
pub enum StoredBin {
    /// Ordinary value; never `Value::Nil`
    Value(Value),

    /// Large ordered list; hidden from plain reads
    LargeList(LargeList),
}

impl StoredBin {
    pub fn value_type(&self) -> ValueType {
        match self {
            StoredBin::Value(v) => v.value_type(),
            StoredBin::LargeList(_) => ValueType::LargeList,
        }
    }
}

/// A live record
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub bins: BTreeMap<String, StoredBin>,
    pub generation: u32,

    /// `None` means the record never expires
    pub expires_at: Option<Instant>,

    /// Present only if some write asked for the key to be stored
    pub user_key: Option<UserKey>,
}

impl StoredRecord {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Remaining TTL in whole seconds, rounded up
    pub fn ttl(&self, now: Instant) -> u32 {
        match self.expires_at {
            None => TTL_NEVER_EXPIRE,
            Some(at) => {
                let remaining = at.saturating_duration_since(now);
                let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                secs.clamp(1, u64::from(TTL_NEVER_EXPIRE - 1)) as u32
            }
        }
    }

    pub fn metadata(&self, now: Instant) -> RecordMetadata {
        RecordMetadata {
            generation: self.generation,
            ttl: self.ttl(now),
        }
    }

    /// Caller-facing view, optionally restricted to the named bins
    ///
    /// List bins are never included; neither are names absent from the record.
    pub fn to_record(&self, bin_filter: Option<&[String]>, now: Instant) -> Record {
        let visible = |name: &str| bin_filter.map_or(true, |names| names.iter().any(|n| n == name));

        let bins = self
            .bins
            .iter()
            .filter(|(name, _)| visible(name.as_str()))
            .filter_map(|(name, bin)| match bin {
                StoredBin::Value(v) => Some((name.clone(), v.clone())),
                StoredBin::LargeList(_) => None,
            })
            .collect();

        Record {
            key: self.user_key.clone(),
            bins,
            generation: self.generation,
            ttl: self.ttl(now),
        }
    }
}

/// Next generation after `generation`, skipping 0 on wrap-around
pub fn next_generation(generation: u32) -> u32 {
    generation.checked_add(1).unwrap_or(1)
}

/// Absolute expiry for a requested TTL
///
/// `TTL_NAMESPACE_DEFAULT` picks `default_ttl`; a resulting 0 or
/// `TTL_NEVER_EXPIRE` means the record never expires.
pub fn expiry_for(ttl: u32, default_ttl: u32, now: Instant) -> Option<Instant> {
    let effective = if ttl == TTL_NAMESPACE_DEFAULT {
        default_ttl
    } else {
        ttl
    };
    match effective {
        0 | TTL_NEVER_EXPIRE => None,
        secs => Some(now + Duration::from_secs(u64::from(secs))),
    }
}
