//! Policy Module
//!
//! Per-call policies and the resolver that checks them against stored state.
//!
//! ## Options
//! - `generation_check`: `None` or `Eq(expected)`; compare-and-swap on the
//!   record generation
//! - `key_storage`: `DigestOnly` or `Send`; whether the user key is kept with
//!   the record
//!
//! Policies are immutable once built and carry only these options. Their
//! serialized forms reject unknown fields.

mod resolver;

use serde::{Deserialize, Serialize};

pub use resolver::{resolve, Resolution};

/// Generation check mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationCheck {
    /// Apply regardless of the stored generation
    #[default]
    None,

    /// Apply only if the stored generation equals the given one
    Eq(u32),
}

/// Whether the user key is persisted alongside its digest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStorage {
    #[default]
    DigestOnly,
    Send,
}

/// Policy for put and operate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WritePolicy {
    generation_check: GenerationCheck,
    key_storage: KeyStorage,
}

impl WritePolicy {
    pub const fn new() -> Self {
        Self {
            generation_check: GenerationCheck::None,
            key_storage: KeyStorage::DigestOnly,
        }
    }

    /// Require the stored generation to equal `generation`
    pub const fn generation_eq(mut self, generation: u32) -> Self {
        self.generation_check = GenerationCheck::Eq(generation);
        self
    }

    /// Store the user key with the record
    pub const fn send_key(mut self) -> Self {
        self.key_storage = KeyStorage::Send;
        self
    }

    pub fn generation_check(&self) -> GenerationCheck {
        self.generation_check
    }

    pub fn key_storage(&self) -> KeyStorage {
        self.key_storage
    }
}

/// Policy for remove
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemovePolicy {
    generation_check: GenerationCheck,
}

impl RemovePolicy {
    pub const fn new() -> Self {
        Self {
            generation_check: GenerationCheck::None,
        }
    }

    /// Require the stored generation to equal `generation`
    pub const fn generation_eq(mut self, generation: u32) -> Self {
        self.generation_check = GenerationCheck::Eq(generation);
        self
    }

    pub fn generation_check(&self) -> GenerationCheck {
        self.generation_check
    }
}
