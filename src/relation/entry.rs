//! Relation entries.
//!
//! A `RelationEntry` wraps one row on its way through the operator tree,
//! together with a process-unique entry id used to dedupe in set
//! operations. Join outputs are *prefix-applied*: their payload is keyed
//! first by table name, then by column name, and the synthetic row carries
//! `DUMMY_ROW_ID`.
//!
//! Aliased columns bypass the prefix map entirely: alias writes always go
//! to a flat slot on the entry and alias reads consult that slot before
//! anything else.

use crate::row::{Payload, Row, RowId, DUMMY_ROW_ID};
use crate::schema::Column;
use crate::types::Value;
use hashbrown::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

// Process-wide entry id allocator; strictly increasing, never persisted.
static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

fn next_entry_id() -> u64 {
    NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryPayload {
    /// Single-table payload: column name → value.
    Flat(Payload),
    /// Prefix-applied payload: table name → column name → value.
    Prefixed(HashMap<String, Payload>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationEntry {
    id: u64,
    row_id: RowId,
    payload: EntryPayload,
    /// Flat slots for aliased projections; consulted before the payload.
    aliased: Payload,
}

impl RelationEntry {
    /// Wraps a stored row into a fresh entry.
    pub fn from_row(row: Row) -> Self {
        let row_id = row.id();
        Self {
            id: next_entry_id(),
            row_id,
            payload: EntryPayload::Flat(row.into_payload()),
            aliased: Payload::new(),
        }
    }

    pub(crate) fn from_parts(row_id: RowId, payload: EntryPayload, aliased: Payload) -> Self {
        Self {
            id: next_entry_id(),
            row_id,
            payload,
            aliased,
        }
    }

    /// Entry id for set-operation dedup. Strictly increasing within the
    /// process; not persisted.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn row_id(&self) -> RowId {
        self.row_id
    }

    pub fn prefix_applied(&self) -> bool {
        matches!(self.payload, EntryPayload::Prefixed(_))
    }

    pub fn payload(&self) -> &EntryPayload {
        &self.payload
    }

    /// Attribute access: alias slot first, then `(table, column)` when
    /// prefixed, plain column name otherwise.
    pub fn get_field(&self, column: &Column) -> Option<&Value> {
        if let Some(alias) = column.alias() {
            if let Some(v) = self.aliased.get(alias) {
                return Some(v);
            }
        }
        match &self.payload {
            EntryPayload::Flat(payload) => payload.get(column.name()),
            EntryPayload::Prefixed(tables) => tables
                .get(column.table())
                .and_then(|payload| payload.get(column.name())),
        }
    }

    /// Direct read of a flat alias slot. Aggregation results and aliased
    /// projections live here.
    pub fn get_slot(&self, name: &str) -> Option<&Value> {
        self.aliased.get(name)
    }

    /// Direct write of a flat alias slot.
    pub fn set_slot(&mut self, name: impl Into<String>, value: Value) {
        self.aliased.insert(name.into(), value);
    }

    /// Attribute write. Alias assignment always writes the flat slot.
    pub fn set_field(&mut self, column: &Column, value: Value) {
        if let Some(alias) = column.alias() {
            self.aliased.insert(alias.to_string(), value);
            return;
        }
        match &mut self.payload {
            EntryPayload::Flat(payload) => {
                payload.insert(column.name().to_string(), value);
            }
            EntryPayload::Prefixed(tables) => {
                tables
                    .entry(column.table().to_string())
                    .or_default()
                    .insert(column.name().to_string(), value);
            }
        }
    }

    /// Combines two entries into one prefix-applied entry, as a join does.
    /// A side that is already prefixed contributes its prefixes verbatim;
    /// a flat side is inserted under its single source-table name.
    pub fn combine(
        left: &RelationEntry,
        left_tables: &HashSet<String>,
        right: &RelationEntry,
        right_tables: &HashSet<String>,
    ) -> RelationEntry {
        let mut combined: HashMap<String, Payload> = HashMap::new();
        copy_side(&mut combined, left, left_tables);
        copy_side(&mut combined, right, right_tables);

        let mut aliased = left.aliased.clone();
        for (k, v) in &right.aliased {
            aliased.insert(k.clone(), v.clone());
        }

        RelationEntry::from_parts(DUMMY_ROW_ID, EntryPayload::Prefixed(combined), aliased)
    }
}

fn copy_side(
    combined: &mut HashMap<String, Payload>,
    entry: &RelationEntry,
    tables: &HashSet<String>,
) {
    match &entry.payload {
        EntryPayload::Prefixed(prefixes) => {
            for (table, payload) in prefixes {
                combined.insert(table.clone(), payload.clone());
            }
        }
        EntryPayload::Flat(payload) => {
            // A flat side originates from exactly one table.
            debug_assert_eq!(tables.len(), 1, "flat entry with multiple source tables");
            if let Some(table) = tables.iter().next() {
                combined.insert(table.clone(), payload.clone());
            }
        }
    }
}
