//! Row-id identity index.
//!
//! Every table carries one: the set of live row ids. Full table scans,
//! row counts, and the planner's fallback cardinality estimate all read
//! it. Keys are the encoded row id; values equal keys, so `set` and `add`
//! differ only in conflict behavior (there is none to conflict — the id
//! *is* the key).

use super::Index;
use crate::encoding::{encode_value, KeyRange};
use crate::error::unknown;
use crate::row::RowId;
use crate::types::Value;
use eyre::Result;
use hashbrown::HashSet;

pub fn row_id_key(row_id: RowId) -> Vec<u8> {
    encode_value(&Value::Int(row_id as i64))
}

#[derive(Debug, Clone)]
pub struct RowIdIndex {
    name: String,
    rows: HashSet<RowId>,
}

impl RowIdIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, row_id: RowId) -> bool {
        self.rows.contains(&row_id)
    }

    /// All live row ids, ascending.
    pub fn row_ids(&self) -> Vec<RowId> {
        let mut ids: Vec<RowId> = self.rows.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn insert(&mut self, row_id: RowId) {
        self.rows.insert(row_id);
    }

    pub fn delete(&mut self, row_id: RowId) {
        self.rows.remove(&row_id);
    }
}

impl Index for RowIdIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_unique(&self) -> bool {
        true
    }

    fn add(&mut self, _key: &[u8], value: RowId) -> Result<()> {
        if !self.rows.insert(value) {
            // Row ids are never reused while the row exists; a duplicate
            // add is an engine invariant breach, not a user error.
            return Err(unknown(format!(
                "row id {value} already present in '{}'",
                self.name
            )));
        }
        Ok(())
    }

    fn set(&mut self, _key: &[u8], value: RowId) {
        self.rows.insert(value);
    }

    fn get(&self, key: &[u8]) -> Vec<RowId> {
        self.rows
            .iter()
            .copied()
            .filter(|id| row_id_key(*id) == key)
            .collect()
    }

    fn get_range(&self, range: Option<&KeyRange>) -> Vec<RowId> {
        let mut ids: Vec<RowId> = match range {
            None => self.rows.iter().copied().collect(),
            Some(r) if r.is_all() => self.rows.iter().copied().collect(),
            Some(r) if r.is_empty() => Vec::new(),
            Some(r) => self
                .rows
                .iter()
                .copied()
                .filter(|id| r.contains(&row_id_key(*id)))
                .collect(),
        };
        ids.sort_unstable();
        ids
    }

    fn remove(&mut self, key: &[u8], value: Option<RowId>) {
        match value {
            Some(row_id) => {
                self.rows.remove(&row_id);
            }
            None => {
                self.rows.retain(|id| row_id_key(*id) != key);
            }
        }
    }

    fn cost(&self, range: Option<&KeyRange>) -> usize {
        match range {
            None => self.rows.len(),
            Some(r) if r.is_all() => self.rows.len(),
            Some(r) if r.is_empty() => 0,
            Some(r) => self
                .rows
                .iter()
                .filter(|id| r.contains(&row_id_key(**id)))
                .count(),
        }
    }

    fn contains_key(&self, key: &[u8]) -> bool {
        self.rows.iter().any(|id| row_id_key(*id) == key)
    }

    fn clear(&mut self) {
        self.rows.clear();
    }
}
