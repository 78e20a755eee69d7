//! # Relations
//!
//! A `Relation` is the immutable tuple stream flowing between physical
//! operators: an ordered sequence of [`RelationEntry`] plus the set of
//! source table names its attributes originate from. Operators never
//! mutate a relation in place; they produce new ones. A relation whose
//! table set has more than one member is prefix-applied — its entries'
//! payloads are keyed `(table, column)`.
//!
//! Set operations (`union`, `intersect`) are defined over entry ids and
//! require all inputs to share one table set; zero inputs yield the empty
//! relation.

mod entry;

pub use entry::{EntryPayload, RelationEntry};

use crate::error::unknown;
use crate::row::Row;
use eyre::Result;
use hashbrown::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    entries: Vec<RelationEntry>,
    tables: HashSet<String>,
}

impl Relation {
    pub fn new(entries: Vec<RelationEntry>, tables: HashSet<String>) -> Self {
        Self { entries, tables }
    }

    /// The empty relation: no entries, empty table set. Returned by
    /// zero-input set operations and empty-input plan short circuits.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            tables: HashSet::new(),
        }
    }

    /// Wraps stored rows into fresh entries. Entries are flat; a caller
    /// passing multiple tables gets a prefix-applied relation only through
    /// [`RelationEntry::combine`], which joins use.
    pub fn from_rows(rows: Vec<Row>, tables: impl IntoIterator<Item = String>) -> Self {
        let entries = rows.into_iter().map(RelationEntry::from_row).collect();
        Self {
            entries,
            tables: tables.into_iter().collect(),
        }
    }

    pub fn entries(&self) -> &[RelationEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut Vec<RelationEntry> {
        &mut self.entries
    }

    pub fn into_entries(self) -> Vec<RelationEntry> {
        self.entries
    }

    pub fn tables(&self) -> &HashSet<String> {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the relation's attributes are addressed `(table, column)`.
    pub fn prefix_applied(&self) -> bool {
        self.tables.len() > 1
    }

    /// Set-operation compatibility: identical source-table sets.
    pub fn is_compatible(&self, other: &Relation) -> bool {
        self.tables == other.tables
    }

    /// Union over entry ids, deduped, preserving first-occurrence order.
    pub fn union(inputs: &[Relation]) -> Result<Relation> {
        let Some(first) = inputs.first() else {
            return Ok(Relation::empty());
        };
        check_compatibility(inputs, first)?;

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for relation in inputs {
            for entry in &relation.entries {
                if seen.insert(entry.id()) {
                    entries.push(entry.clone());
                }
            }
        }
        Ok(Relation::new(entries, first.tables.clone()))
    }

    /// Intersection over entry ids: entries of the first input present in
    /// every other input, in the first input's order.
    pub fn intersect(inputs: &[Relation]) -> Result<Relation> {
        let Some(first) = inputs.first() else {
            return Ok(Relation::empty());
        };
        check_compatibility(inputs, first)?;

        let id_sets: Vec<HashSet<u64>> = inputs[1..]
            .iter()
            .map(|r| r.entries.iter().map(|e| e.id()).collect())
            .collect();
        let entries = first
            .entries
            .iter()
            .filter(|e| id_sets.iter().all(|ids| ids.contains(&e.id())))
            .cloned()
            .collect();
        Ok(Relation::new(entries, first.tables.clone()))
    }

    /// Entries of `self` whose id does not occur in `other`.
    pub fn except(&self, other: &Relation) -> Result<Relation> {
        if !self.is_compatible(other) {
            return Err(incompatible(self, other));
        }
        let excluded: HashSet<u64> = other.entries.iter().map(|e| e.id()).collect();
        let entries = self
            .entries
            .iter()
            .filter(|e| !excluded.contains(&e.id()))
            .cloned()
            .collect();
        Ok(Relation::new(entries, self.tables.clone()))
    }

    /// Cross product used by the nested-loop join before predicate
    /// filtering; every output entry is prefix-applied.
    pub fn cross(&self, other: &Relation) -> Relation {
        let tables: HashSet<String> = self.tables.union(&other.tables).cloned().collect();
        let mut entries = Vec::with_capacity(self.len() * other.len());
        for left in &self.entries {
            for right in &other.entries {
                entries.push(RelationEntry::combine(
                    left,
                    &self.tables,
                    right,
                    &other.tables,
                ));
            }
        }
        Relation::new(entries, tables)
    }
}

fn check_compatibility(inputs: &[Relation], first: &Relation) -> Result<()> {
    for relation in &inputs[1..] {
        if !first.is_compatible(relation) {
            return Err(incompatible(first, relation));
        }
    }
    Ok(())
}

fn incompatible(a: &Relation, b: &Relation) -> eyre::Report {
    let fmt = |r: &Relation| {
        let mut names: Vec<&str> = r.tables.iter().map(String::as_str).collect();
        names.sort_unstable();
        names.join(",")
    };
    unknown(format!(
        "set operation over incompatible relations: [{}] vs [{}]",
        fmt(a),
        fmt(b)
    ))
}
