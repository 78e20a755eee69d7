//! Hash single-map index.
//!
//! Constant-time `get`/`set`/`remove` for point lookups on single-row
//! (primary or unique) keys. Range scans are supported for contract
//! completeness but sort the key set on demand; the planner prefers an
//! ordered index whenever a real range is involved.

use super::Index;
use crate::encoding::KeyRange;
use crate::error::constraint;
use crate::row::RowId;
use eyre::Result;
use hashbrown::HashMap;

#[derive(Debug, Clone)]
pub struct HashIndex {
    name: String,
    map: HashMap<Vec<u8>, RowId>,
}

impl HashIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            map: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Index for HashIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_unique(&self) -> bool {
        true
    }

    fn add(&mut self, key: &[u8], value: RowId) -> Result<()> {
        if self.map.contains_key(key) {
            return Err(constraint(format!(
                "unique index '{}' already holds a row for this key",
                self.name
            )));
        }
        self.map.insert(key.to_vec(), value);
        Ok(())
    }

    fn set(&mut self, key: &[u8], value: RowId) {
        self.map.insert(key.to_vec(), value);
    }

    fn get(&self, key: &[u8]) -> Vec<RowId> {
        self.map.get(key).map(|v| vec![*v]).unwrap_or_default()
    }

    fn get_range(&self, range: Option<&KeyRange>) -> Vec<RowId> {
        let mut pairs: Vec<(&Vec<u8>, &RowId)> = match range {
            None => self.map.iter().collect(),
            Some(r) if r.is_all() => self.map.iter().collect(),
            Some(r) if r.is_empty() => Vec::new(),
            Some(r) => self.map.iter().filter(|(k, _)| r.contains(k)).collect(),
        };
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs.into_iter().map(|(_, v)| *v).collect()
    }

    fn remove(&mut self, key: &[u8], value: Option<RowId>) {
        match value {
            None => {
                self.map.remove(key);
            }
            Some(row_id) => {
                if self.map.get(key) == Some(&row_id) {
                    self.map.remove(key);
                }
            }
        }
    }

    fn cost(&self, range: Option<&KeyRange>) -> usize {
        match range {
            None => self.map.len(),
            Some(r) if r.is_all() => self.map.len(),
            Some(r) if r.is_empty() => 0,
            Some(r) => self.map.keys().filter(|k| r.contains(k)).count(),
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
    use crate::error::ErrorCode;
    use crate::types::Value;

    fn k(i: i64) -> Vec<u8> {
        encode_value(&Value::Int(i))
    }

    #[test]
    fn point_lookup_round_trip() {
        let mut idx = HashIndex::new("pk");
        idx.add(&k(7), 70).unwrap();
        assert_eq!(idx.get(&k(7)), vec![70]);
        assert!(idx.get(&k(8)).is_empty());
        idx.remove(&k(7), None);
        assert!(idx.get(&k(7)).is_empty());
    }

    #[test]
    fn add_on_occupied_key_is_constraint() {
        let mut idx = HashIndex::new("pk");
        idx.add(&k(1), 10).unwrap();
        let err = idx.add(&k(1), 11).unwrap_err();
        assert_eq!(ErrorCode::of(&err), ErrorCode::Constraint);
    }

    #[test]
    fn remove_with_mismatched_value_is_noop() {
        let mut idx = HashIndex::new("pk");
        idx.add(&k(1), 10).unwrap();
        idx.remove(&k(1), Some(99));
        assert_eq!(idx.get(&k(1)), vec![10]);
    }

    #[test]
    fn range_scan_sorts_keys() {
        let mut idx = HashIndex::new("pk");
        for i in [5, 1, 3] {
            idx.add(&k(i), i as u64).unwrap();
        }
        assert_eq!(idx.get_range(None), vec![1, 3, 5]);
        let range = KeyRange::lower_bound(k(3), false);
        assert_eq!(idx.get_range(Some(&range)), vec![3, 5]);
    }
}
