//! # Runtime Value Representation
//!
//! `Value` is the runtime representation for cell values flowing through
//! the engine: payloads, predicates, index keys, and aggregate results all
//! carry it. Values are owned (rows live in an in-memory cache, not in
//! mmap'd pages), so no lifetime parameter is needed.
//!
//! ## Comparison Semantics
//!
//! Two orderings exist, and they are intentionally different:
//!
//! - [`Value::compare`] implements SQL comparison: NULL compared to anything
//!   yields `None` (UNKNOWN), Int and Float compare numerically across the
//!   two variants, and cross-type comparison yields `None`. Predicates use
//!   this; an UNKNOWN outcome never satisfies a predicate.
//! - [`Value::sort_cmp`] is the total order used by ORDER BY and index key
//!   material: NULLs compare lowest, then the per-type orders. This order
//!   agrees with the byte order of the key encoding in `encoding::key`.
//!
//! ## Hashing
//!
//! `Value` implements `Hash` for hash-join build keys and DISTINCT
//! tracking. Floats hash by their bit pattern; NaN never reaches hashing
//! because predicate evaluation filters UNKNOWN comparisons first.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    /// Microseconds since the Unix epoch.
    DateTime(i64),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// SQL comparison: `None` is UNKNOWN (NULL involved or incomparable
    /// types). Int and Float are mutually comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order for sorting: NULL lowest, then numeric, bool, datetime,
    /// text, bytes. Mixed Int/Float compare numerically. NaN sorts above
    /// every other float so the order stays total.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Int(_) | Value::Float(_) => 2,
                Value::DateTime(_) => 3,
                Value::Text(_) => 4,
                Value::Bytes(_) => 5,
            }
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => total_f64(*a, *b),
            (Value::Int(a), Value::Float(b)) => total_f64(*a as f64, *b),
            (Value::Float(a), Value::Int(b)) => total_f64(*a, *b as f64),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }

    /// Numeric view used by sum/avg/stddev/geomean. Bool and non-numeric
    /// types are not aggregable.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "integer",
            Value::Float(_) => "number",
            Value::Text(_) => "text",
            Value::Bool(_) => "bool",
            Value::DateTime(_) => "datetime",
            Value::Bytes(_) => "bytes",
        }
    }
}

fn total_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| {
        // NaN handling: NaN == NaN for sorting purposes, NaN > everything.
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => Ordering::Equal,
        }
    })
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::DateTime(t) => t.hash(state),
            Value::Bytes(b) => b.hash(state),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
