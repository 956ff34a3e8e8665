//! # NimbusKV
//!
//! A record-oriented key-value store with:
//! - Records of named, typed bins keyed by (namespace, set, user key)
//! - Optimistic concurrency through per-record generation checks
//! - Atomic multi-operation batches on a single record
//! - Large ordered lists (LLIST) stored in a bin
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Client  /  TCP Server (worker pool)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Command
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │        (policy resolve → apply → generation bump)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Operate    │          │    LLIST    │
//!   │  (batches)  │          │ (sorted Vec)│
//!   └──────┬──────┘          └──────┬──────┘
//!          └────────────┬───────────┘
//!                       ▼
//!               ┌───────────────┐
//!               │ Record Store  │
//!               │ (per-key lock)│
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod key;
pub mod record;
pub mod value;

pub mod llist;
pub mod operate;
pub mod policy;
pub mod storage;

pub mod client;
pub mod engine;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use client::Client;
pub use config::{Config, NamespaceConfig};
pub use engine::Engine;
pub use error::{NimbusError, Result};
pub use key::{Key, UserKey};
pub use llist::ElementFilter;
pub use operate::{Operation, Operations};
pub use policy::{GenerationCheck, KeyStorage, RemovePolicy, WritePolicy};
pub use record::{Record, RecordMetadata};
pub use value::{Value, ValueType};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of NimbusKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
