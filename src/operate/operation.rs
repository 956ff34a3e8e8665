//! Operation definitions
//!
//! Sub-operations that make up one atomic `operate` call.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One step of an `operate` batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Set a bin (`Nil` deletes it)
    Write { bin: String, value: Value },

    /// Read a bin as of this point in the batch
    Read { bin: String },

    /// Add to an integer bin (absent counts as 0)
    Increment { bin: String, delta: i64 },

    /// Concatenate after a string or bytes bin
    Append { bin: String, value: Value },

    /// Concatenate before a string or bytes bin
    Prepend { bin: String, value: Value },

    /// Reset the record's expiry to the namespace default
    Touch,
}

impl Operation {
    /// Whether applying this operation changes the record
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Operation::Read { .. })
    }

    /// Bin this operation targets, if any
    pub fn bin(&self) -> Option<&str> {
        match self {
            Operation::Write { bin, .. }
            | Operation::Read { bin }
            | Operation::Increment { bin, .. }
            | Operation::Append { bin, .. }
            | Operation::Prepend { bin, .. } => Some(bin.as_str()),
            Operation::Touch => None,
        }
    }
}

/// Builder for an ordered batch of operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operations {
    ops: Vec<Operation>,
}

impl Operations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(mut self, bin: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(Operation::Write {
            bin: bin.into(),
            value: value.into(),
        });
        self
    }

    pub fn read(mut self, bin: impl Into<String>) -> Self {
        self.ops.push(Operation::Read { bin: bin.into() });
        self
    }

    pub fn incr(mut self, bin: impl Into<String>, delta: i64) -> Self {
        self.ops.push(Operation::Increment {
            bin: bin.into(),
            delta,
        });
        self
    }

    pub fn append(mut self, bin: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(Operation::Append {
            bin: bin.into(),
            value: value.into(),
        });
        self
    }

    pub fn prepend(mut self, bin: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(Operation::Prepend {
            bin: bin.into(),
            value: value.into(),
        });
        self
    }

    pub fn touch(mut self) -> Self {
        self.ops.push(Operation::Touch);
        self
    }
}

impl Deref for Operations {
    type Target = [Operation];

    fn deref(&self) -> &[Operation] {
        &self.ops
    }
}

impl From<Operations> for Vec<Operation> {
    fn from(ops: Operations) -> Self {
        ops.ops
    }
}
