//! Order-by operator.
//!
//! Stable sort over the declared key list with independent asc/desc per
//! key. NULLs (and absent fields) compare lowest, so they lead ascending
//! output and trail descending output.

use crate::query::{Order, SortSpec};
use crate::relation::Relation;
use crate::types::Value;
use std::cmp::Ordering;

pub fn sort(input: Relation, keys: &[SortSpec]) -> Relation {
    let tables = input.tables().clone();
    let mut entries = input.into_entries();
    entries.sort_by(|a, b| {
        for spec in keys {
            let left = a.get_field(&spec.column).cloned().unwrap_or(Value::Null);
            let right = b.get_field(&spec.column).cloned().unwrap_or(Value::Null);
            let ord = left.sort_cmp(&right);
            let ord = match spec.order {
                Order::Asc => ord,
                Order::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Relation::new(entries, tables)
}
