//! Configuration for NimbusKV
//!
//! Centralized configuration with sensible defaults.

use std::collections::HashSet;

use crate::error::{NimbusError, Result};

/// Default namespace TTL: 30 days
pub const DEFAULT_TTL_SECS: u32 = 30 * 24 * 60 * 60;

/// Main configuration for a NimbusKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Namespaces served by this instance. Keys naming any other namespace
    /// are rejected.
    pub namespaces: Vec<NamespaceConfig>,

    /// How often the background scan evicts expired records (milliseconds).
    /// 0 disables the scan; expired records are then only dropped on access.
    pub expiry_scan_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Pooled worker threads; a connection arriving while all are busy is
    /// served on its own thread instead
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// Per-namespace settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceConfig {
    pub name: String,

    /// TTL applied when a write asks for the namespace default.
    /// 0 means records never expire.
    pub default_ttl_secs: u32,
}

impl NamespaceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_ttl_secs: DEFAULT_TTL_SECS,
        }
    }

    pub fn default_ttl_secs(mut self, secs: u32) -> Self {
        self.default_ttl_secs = secs;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespaces: vec![NamespaceConfig::new("test")],
            expiry_scan_interval_ms: 1000,
            listen_addr: "127.0.0.1:3000".to_string(),
            max_connections: 1024,
            worker_threads: 8,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the configuration for values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.namespaces.is_empty() {
            return Err(NimbusError::Config(
                "at least one namespace is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for ns in &self.namespaces {
            if ns.name.is_empty() {
                return Err(NimbusError::Config("namespace name is empty".to_string()));
            }
            if !seen.insert(ns.name.as_str()) {
                return Err(NimbusError::Config(format!(
                    "duplicate namespace: {}",
                    ns.name
                )));
            }
        }

        if self.worker_threads == 0 {
            return Err(NimbusError::Config(
                "worker_threads must be at least 1".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(NimbusError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Replace the namespace list
    pub fn namespaces(mut self, namespaces: Vec<NamespaceConfig>) -> Self {
        self.config.namespaces = namespaces;
        self
    }

    /// Add a namespace, replacing any existing one of the same name
    pub fn namespace(mut self, namespace: NamespaceConfig) -> Self {
        self.config.namespaces.retain(|ns| ns.name != namespace.name);
        self.config.namespaces.push(namespace);
        self
    }

    /// Set the expiry scan interval (in milliseconds, 0 disables)
    pub fn expiry_scan_interval_ms(mut self, ms: u64) -> Self {
        self.config.expiry_scan_interval_ms = ms;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the number of connection worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
