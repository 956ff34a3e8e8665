//! LargeList implementation
//!
//! Sorted `Vec` with binary-search insertion.

use super::ElementFilter;
use crate::error::{NimbusError, Result};
use crate::value::{Value, ValueType};

/// A sorted, type-homogeneous list held in one bin
///
/// Never empty: the store drops the bin when the last element goes.
#[derive(Debug, Clone, PartialEq)]
pub struct LargeList {
    /// Fixed by the first element
    element_type: ValueType,

    /// Sorted ascending; duplicates allowed
    elements: Vec<Value>,
}

impl LargeList {
    /// Create a list from its first element
    fn with_first(bin: &str, value: Value) -> Result<Self> {
        check_element(bin, &value)?;
        Ok(Self {
            element_type: value.value_type(),
            elements: vec![value],
        })
    }

    /// Create a list from a batch of elements (all must share one type)
    pub fn from_values(bin: &str, values: Vec<Value>) -> Result<Self> {
        let mut iter = values.into_iter();
        let first = iter.next().ok_or_else(|| {
            NimbusError::Parameter(format!("no values to add to list bin '{}'", bin))
        })?;
        let mut list = Self::with_first(bin, first)?;
        for value in iter {
            list.add(bin, value)?;
        }
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Insert keeping sort order; a new duplicate goes after existing equals
    ///
    /// Leaves the list untouched on a type mismatch.
    pub fn add(&mut self, bin: &str, value: Value) -> Result<()> {
        check_element(bin, &value)?;
        self.check_type(bin, &value)?;

        let pos = self.elements.partition_point(|e| e <= &value);
        self.elements.insert(pos, value);
        Ok(())
    }

    /// Insert every value, or none if any of them is rejected
    pub fn add_all(&mut self, bin: &str, values: Vec<Value>) -> Result<()> {
        for value in &values {
            check_element(bin, value)?;
            self.check_type(bin, value)?;
        }
        for value in values {
            let pos = self.elements.partition_point(|e| e <= &value);
            self.elements.insert(pos, value);
        }
        Ok(())
    }

    /// Remove one element equal to `value`
    pub fn remove(&mut self, bin: &str, value: &Value) -> Result<Value> {
        let pos = self
            .position(value)
            .ok_or_else(|| NimbusError::ElementNotFound {
                bin: bin.to_string(),
            })?;
        Ok(self.elements.remove(pos))
    }

    /// All elements equal to `value`
    pub fn find(&self, value: &Value) -> &[Value] {
        let start = self.elements.partition_point(|e| e < value);
        let end = self.elements.partition_point(|e| e <= value);
        &self.elements[start..end]
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.position(value).is_some()
    }

    /// Elements matching `filter` (all when `None`), in sorted order
    pub fn filter(&self, filter: Option<&ElementFilter>) -> Vec<Value> {
        match filter {
            None => self.elements.clone(),
            Some(filter) => filter.select(&self.elements),
        }
    }

    fn position(&self, value: &Value) -> Option<usize> {
        let start = self.elements.partition_point(|e| e < value);
        match self.elements.get(start) {
            Some(e) if e == value => Some(start),
            _ => None,
        }
    }

    fn check_type(&self, bin: &str, value: &Value) -> Result<()> {
        let found = value.value_type();
        if found != self.element_type {
            return Err(NimbusError::BinTypeMismatch {
                bin: bin.to_string(),
                expected: self.element_type,
                found,
            });
        }
        Ok(())
    }
}

fn check_element(bin: &str, value: &Value) -> Result<()> {
    if value.is_nil() {
        return Err(NimbusError::Parameter(format!(
            "nil cannot be stored in list bin '{}'",
            bin
        )));
    }
    Ok(())
}
