//! # Row Model
//!
//! A row is an internal identifier plus a payload: a mapping from column
//! name to [`Value`]. Row ids are monotonic non-negative integers, unique
//! within a table for the row's lifetime and allocated by the cache's
//! per-table high-water counters. Column order is defined by the schema,
//! not by the payload map.
//!
//! `DUMMY_ROW_ID` marks synthetic rows produced by joins; they are never
//! persisted and never enter an index.

use crate::types::Value;
use hashbrown::HashMap;

pub type RowId = u64;

/// Sentinel id for synthetic rows (join outputs). Never allocated to a
/// stored row and never persisted.
pub const DUMMY_ROW_ID: RowId = u64::MAX;

pub type Payload = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    payload: Payload,
}

impl Row {
    pub fn new(id: RowId, payload: Payload) -> Self {
        Self { id, payload }
    }

    /// Builds an unidentified row from column/value pairs; the insert path
    /// assigns the real id when the row enters the journal.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Self {
        let payload = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        Self {
            id: DUMMY_ROW_ID,
            payload,
        }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn set_id(&mut self, id: RowId) {
        self.id = id;
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.payload.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.payload.insert(column.into(), value);
    }

    pub fn is_dummy(&self) -> bool {
        self.id == DUMMY_ROW_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_pairs_starts_unidentified() {
        let row = Row::from_pairs([("id", Value::Int(1)), ("name", Value::from("ada"))]);
        assert!(row.is_dummy());
        assert_eq!(row.get("name"), Some(&Value::from("ada")));
    }

    #[test]
    fn set_id_claims_identity() {
        let mut row = Row::from_pairs([("id", Value::Int(1))]);
        row.set_id(42);
        assert_eq!(row.id(), 42);
        assert!(!row.is_dummy());
    }
}
