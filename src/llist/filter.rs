//! Declarative element filters
//!
//! Evaluated server-side against the sorted elements. Results keep the list's
//! sort order.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Predicate applied to list elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementFilter {
    /// Elements equal to the value
    Equal(Value),

    /// Elements within inclusive bounds; a missing bound is open
    Range {
        min: Option<Value>,
        max: Option<Value>,
    },

    /// Elements equal to any of the values
    OneOf(Vec<Value>),
}

impl ElementFilter {
    pub fn range(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        ElementFilter::Range {
            min: Some(min.into()),
            max: Some(max.into()),
        }
    }

    pub fn matches(&self, element: &Value) -> bool {
        match self {
            ElementFilter::Equal(v) => element == v,
            ElementFilter::Range { min, max } => {
                min.as_ref().map_or(true, |min| element >= min)
                    && max.as_ref().map_or(true, |max| element <= max)
            }
            ElementFilter::OneOf(values) => values.contains(element),
        }
    }

    /// Select matching elements from a sorted slice
    pub(crate) fn select(&self, sorted: &[Value]) -> Vec<Value> {
        match self {
            ElementFilter::Range { min, max } => {
                let start = match min {
                    Some(min) => sorted.partition_point(|e| e < min),
                    None => 0,
                };
                let end = match max {
                    Some(max) => sorted.partition_point(|e| e <= max),
                    None => sorted.len(),
                };
                if start >= end {
                    return Vec::new();
                }
                sorted[start..end].to_vec()
            }
            _ => sorted.iter().filter(|e| self.matches(e)).cloned().collect(),
        }
    }
}
