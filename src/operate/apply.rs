//! Batch application
//!
//! Applies an operation batch to a working copy of a record's bins. The
//! engine commits the copy only if every operation succeeds, which is what
//! makes a batch all-or-nothing.

use std::collections::BTreeMap;

use super::Operation;
use crate::error::{NimbusError, Result};
use crate::record::check_bin_name;
use crate::storage::StoredBin;
use crate::value::{Value, ValueType};

/// What a successfully applied batch produced
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Values observed by read operations, keyed by bin
    pub reads: BTreeMap<String, Value>,

    /// Batch contained at least one read
    pub has_reads: bool,

    /// Batch contained at least one mutation
    pub mutated: bool,

    /// Batch asked for the expiry to be reset
    pub touched: bool,
}

/// Apply `ops` in order to `bins`
///
/// On error `bins` may be partially modified; callers must discard it.
pub fn apply_operations(
    bins: &mut BTreeMap<String, StoredBin>,
    ops: &[Operation],
) -> Result<BatchOutcome> {
    if ops.is_empty() {
        return Err(NimbusError::Parameter("operation list is empty".to_string()));
    }

    let mut outcome = BatchOutcome::default();

    for op in ops {
        if let Some(bin) = op.bin() {
            check_bin_name(bin)?;
        }
        outcome.mutated |= op.is_mutation();

        match op {
            Operation::Write { bin, value } => write_bin(bins, bin, value.clone())?,
            Operation::Read { bin } => {
                outcome.has_reads = true;
                // List bins stay hidden, as they are from plain gets
                if let Some(StoredBin::Value(v)) = bins.get(bin) {
                    outcome.reads.insert(bin.clone(), v.clone());
                }
            }
            Operation::Increment { bin, delta } => increment(bins, bin, *delta)?,
            Operation::Append { bin, value } => concat(bins, bin, value, false)?,
            Operation::Prepend { bin, value } => concat(bins, bin, value, true)?,
            Operation::Touch => outcome.touched = true,
        }
    }

    Ok(outcome)
}

/// Set or delete one bin; list bins cannot be overwritten
pub(crate) fn write_bin(
    bins: &mut BTreeMap<String, StoredBin>,
    bin: &str,
    value: Value,
) -> Result<()> {
    if let Some(StoredBin::LargeList(_)) = bins.get(bin) {
        return Err(mismatch(bin, value.value_type(), ValueType::LargeList));
    }

    if value.is_nil() {
        bins.remove(bin);
    } else {
        bins.insert(bin.to_string(), StoredBin::Value(value));
    }
    Ok(())
}

fn increment(bins: &mut BTreeMap<String, StoredBin>, bin: &str, delta: i64) -> Result<()> {
    let next = match bins.get(bin) {
        None => delta,
        Some(StoredBin::Value(Value::Integer(current))) => current.wrapping_add(delta),
        Some(other) => return Err(mismatch(bin, ValueType::Integer, other.value_type())),
    };
    bins.insert(bin.to_string(), StoredBin::Value(Value::Integer(next)));
    Ok(())
}

fn concat(
    bins: &mut BTreeMap<String, StoredBin>,
    bin: &str,
    operand: &Value,
    prepend: bool,
) -> Result<()> {
    if !matches!(operand, Value::String(_) | Value::Bytes(_)) {
        return Err(NimbusError::Parameter(format!(
            "append/prepend operand for '{}' must be string or bytes, got {}",
            bin,
            operand.value_type()
        )));
    }

    let next = match (bins.get(bin), operand) {
        (None, _) => operand.clone(),
        (Some(StoredBin::Value(Value::String(current))), Value::String(s)) => {
            Value::String(if prepend {
                format!("{}{}", s, current)
            } else {
                format!("{}{}", current, s)
            })
        }
        (Some(StoredBin::Value(Value::Bytes(current))), Value::Bytes(b)) => {
            let (head, tail) = if prepend { (b, current) } else { (current, b) };
            let mut joined = Vec::with_capacity(head.len() + tail.len());
            joined.extend_from_slice(head);
            joined.extend_from_slice(tail);
            Value::Bytes(joined)
        }
        (Some(other), _) => {
            return Err(mismatch(bin, operand.value_type(), other.value_type()));
        }
    };

    bins.insert(bin.to_string(), StoredBin::Value(next));
    Ok(())
}

fn mismatch(bin: &str, expected: ValueType, found: ValueType) -> NimbusError {
    NimbusError::BinTypeMismatch {
        bin: bin.to_string(),
        expected,
        found,
    }
}
