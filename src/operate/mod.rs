//! Operate Module
//!
//! Atomic multi-operation batches against a single record.
//!
//! ## Guarantees
//! - Operations apply in caller order against one snapshot of the record
//! - Reads observe the effects of earlier operations in the same batch
//! - Any failure rejects the whole batch; nothing is written
//! - The record generation advances once per mutating batch

mod apply;
mod operation;

pub use apply::{apply_operations, BatchOutcome};
pub use operation::{Operation, Operations};

pub(crate) use apply::write_bin;
