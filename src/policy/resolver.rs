//! Policy resolver
//!
//! Decides whether a mutation may proceed given the generation visible at the
//! start of the transaction. Callers invoke it while holding the record's lock.

use super::GenerationCheck;
use crate::error::{NimbusError, Result};

/// Outcome of resolving a policy against stored state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Proceed,
    Reject { expected: u32, actual: u32 },
}

impl Resolution {
    pub fn into_result(self) -> Result<()> {
        match self {
            Resolution::Proceed => Ok(()),
            Resolution::Reject { expected, actual } => {
                Err(NimbusError::RecordGenerationMismatch { expected, actual })
            }
        }
    }
}

/// Resolve a generation check
///
/// `stored_generation` is 0 when the record does not exist, so `Eq(0)` only
/// lets a write through if it would create the record.
pub fn resolve(check: GenerationCheck, stored_generation: u32) -> Resolution {
    match check {
        GenerationCheck::None => Resolution::Proceed,
        GenerationCheck::Eq(expected) if expected == stored_generation => Resolution::Proceed,
        GenerationCheck::Eq(expected) => Resolution::Reject {
            expected,
            actual: stored_generation,
        },
    }
}
