//! Storage Manager
//!
//! Owns every configured namespace and routes keys to them.
//!
//! ## Responsibilities
//! - Build namespaces from configuration on startup
//! - Resolve a key's namespace (unknown names are an error, not a create)
//! - Run expiry sweeps across all namespaces

use std::collections::HashMap;

use crate::config::Config;
use crate::error::{NimbusError, Result};

use super::Namespace;

/// Manages the record store
///
/// ## Concurrency:
/// - The namespace map is fixed after `open`, so lookups take no lock
/// - All per-record locking happens inside [`Namespace`]
pub struct StorageManager {
    namespaces: HashMap<String, Namespace>,
}

impl StorageManager {
    /// Create storage for every namespace in the config
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;

        let namespaces = config
            .namespaces
            .iter()
            .map(|ns| {
                tracing::debug!(
                    "Namespace '{}' ready (default ttl {}s)",
                    ns.name,
                    ns.default_ttl_secs
                );
                (ns.name.clone(), Namespace::new(ns))
            })
            .collect();

        Ok(Self { namespaces })
    }

    /// Look up a namespace by name
    pub fn namespace(&self, name: &str) -> Result<&Namespace> {
        self.namespaces
            .get(name)
            .ok_or_else(|| NimbusError::NamespaceNotFound(name.to_string()))
    }

    /// Evict expired records everywhere; returns how many were dropped
    pub fn evict_expired(&self) -> usize {
        self.namespaces.values().map(Namespace::evict_expired).sum()
    }

    /// Names of the configured namespaces (unordered)
    pub fn namespace_names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }
}
