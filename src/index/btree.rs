//! Ordered multi-map index.
//!
//! Backed by a `BTreeMap` over encoded keys, so key comparison is a plain
//! byte compare and range scans walk the tree in order. Each key holds a
//! small vector of row ids in insertion order, which is the documented
//! tie-break for equal keys. Unique indices keep the vector at length one
//! and reject conflicting `add`s.

use super::Index;
use crate::encoding::KeyRange;
use crate::error::constraint;
use crate::row::RowId;
use eyre::Result;
use smallvec::SmallVec;
use std::collections::BTreeMap;

type RowIds = SmallVec<[RowId; 1]>;

#[derive(Debug, Clone)]
pub struct OrderedIndex {
    name: String,
    unique: bool,
    map: BTreeMap<Vec<u8>, RowIds>,
}

impl OrderedIndex {
    pub fn new(name: impl Into<String>, unique: bool) -> Self {
        Self {
            name: name.into(),
            unique,
            map: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Distinct keys, ascending. Used by range-monotonicity checks.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.map.keys().map(|k| k.as_slice())
    }
}

impl Index for OrderedIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_unique(&self) -> bool {
        self.unique
    }

    fn add(&mut self, key: &[u8], value: RowId) -> Result<()> {
        let slot = self.map.entry(key.to_vec()).or_default();
        if self.unique && !slot.is_empty() {
            return Err(constraint(format!(
                "unique index '{}' already holds a row for this key",
                self.name
            )));
        }
        slot.push(value);
        Ok(())
    }

    fn set(&mut self, key: &[u8], value: RowId) {
        let slot = self.map.entry(key.to_vec()).or_default();
        slot.clear();
        slot.push(value);
    }

    fn get(&self, key: &[u8]) -> Vec<RowId> {
        self.map.get(key).map(|v| v.to_vec()).unwrap_or_default()
    }

    fn get_range(&self, range: Option<&KeyRange>) -> Vec<RowId> {
        match range {
            None => self.map.values().flatten().copied().collect(),
            Some(r) if r.is_all() => self.map.values().flatten().copied().collect(),
            Some(r) if r.is_empty() => Vec::new(),
            Some(r) => self
                .map
                .range(r.to_bounds())
                .flat_map(|(_, v)| v.iter().copied())
                .collect(),
        }
    }

    fn remove(&mut self, key: &[u8], value: Option<RowId>) {
        match value {
            None => {
                self.map.remove(key);
            }
            Some(row_id) => {
                if let Some(slot) = self.map.get_mut(key) {
                    slot.retain(|v| *v != row_id);
                    if slot.is_empty() {
                        self.map.remove(key);
                    }
                }
            }
        }
    }

    fn cost(&self, range: Option<&KeyRange>) -> usize {
        match range {
            None => self.len(),
            Some(r) if r.is_all() => self.len(),
            Some(r) if r.is_empty() => 0,
            Some(r) => self.map.range(r.to_bounds()).map(|(_, v)| v.len()).sum(),
        }
    }

    fn contains_key(&self, key: &[u8]) -> bool {
        self.map.contains_key(key)
    }

    fn clear(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::encode_value;
    use crate::types::Value;
    use proptest::prelude::*;

    fn k(s: &str) -> Vec<u8> {
        encode_value(&Value::Text(s.into()))
    }

    #[test]
    fn add_then_get_round_trips() {
        let mut idx = OrderedIndex::new("idx", false);
        idx.add(&k("a"), 1).unwrap();
        idx.add(&k("a"), 2).unwrap();
        assert_eq!(idx.get(&k("a")), vec![1, 2]);
        idx.remove(&k("a"), Some(1));
        assert_eq!(idx.get(&k("a")), vec![2]);
    }

    #[test]
    fn unique_conflict_is_constraint() {
        use crate::error::ErrorCode;
        let mut idx = OrderedIndex::new("idx", true);
        idx.add(&k("a"), 1).unwrap();
        let err = idx.add(&k("a"), 2).unwrap_err();
        assert_eq!(ErrorCode::of(&err), ErrorCode::Constraint);
        // set replaces without complaint.
        idx.set(&k("a"), 3);
        assert_eq!(idx.get(&k("a")), vec![3]);
    }

    #[test]
    fn equal_keys_keep_insertion_order() {
        let mut idx = OrderedIndex::new("idx", false);
        for v in [30, 10, 20] {
            idx.add(&k("same"), v).unwrap();
        }
        assert_eq!(idx.get_range(None), vec![30, 10, 20]);
    }

    #[test]
    fn range_scan_is_key_ascending() {
        let mut idx = OrderedIndex::new("idx", false);
        idx.add(&k("c"), 3).unwrap();
        idx.add(&k("a"), 1).unwrap();
        idx.add(&k("b"), 2).unwrap();
        assert_eq!(idx.get_range(None), vec![1, 2, 3]);
        let range = KeyRange::new(Some(k("a")), Some(k("b")), true, false);
        assert_eq!(idx.get_range(Some(&range)), vec![2]);
    }

    #[test]
    fn cost_counts_range_cardinality() {
        let mut idx = OrderedIndex::new("idx", false);
        for (key, v) in [("a", 1), ("a", 2), ("b", 3)] {
            idx.add(&k(key), v).unwrap();
        }
        assert_eq!(idx.cost(None), 3);
        assert_eq!(idx.cost(Some(&KeyRange::only(k("a")))), 2);
        assert_eq!(idx.cost(Some(&KeyRange::only(k("z")))), 0);
    }

    #[test]
    fn remove_whole_key() {
        let mut idx = OrderedIndex::new("idx", false);
        idx.add(&k("a"), 1).unwrap();
        idx.add(&k("a"), 2).unwrap();
        idx.remove(&k("a"), None);
        assert!(!idx.contains_key(&k("a")));
        assert_eq!(idx.cost(Some(&KeyRange::only(k("a")))), 0);
    }

    proptest! {
        // Property: concatenating adjacent ranges equals the full range.
        #[test]
        fn prop_range_concatenation(keys in prop::collection::vec("[a-z]{1,8}", 1..40)) {
            let mut keys = keys;
            let mut idx = OrderedIndex::new("idx", false);
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                idx.add(&k(key), i as u64).unwrap();
            }
            let mid = k(&keys[keys.len() / 2]);
            let lo = KeyRange::upper_bound(mid.clone(), true);
            let hi = KeyRange::lower_bound(mid, false);
            let mut joined = idx.get_range(Some(&lo));
            joined.extend(idx.get_range(Some(&hi)));
            prop_assert_eq!(joined, idx.get_range(None));
        }
    }
}
