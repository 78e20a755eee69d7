//! # Row Cache
//!
//! Process-wide in-memory residence for table rows, keyed
//! `(table, row id)`. The cache is warmed from `Store::scan` when the
//! database opens and is the only thing the read path consults afterwards;
//! the asynchronous store is written, never read, during normal operation.
//!
//! Mutation happens only while a transaction is in its COMMITTING phase
//! holding the table's writer lock. The cache also owns the per-table
//! row-id high-water marks that drive monotonic row-id allocation; those
//! counters move during EXECUTING (id allocation is not row mutation) and
//! are persisted through the store's metadata entry.

use crate::config::CACHE_INITIAL_CAPACITY;
use crate::row::{Payload, Row, RowId};
use hashbrown::HashMap;
use parking_lot::RwLock;

struct TableCache {
    rows: HashMap<RowId, Payload>,
    high_water: RowId,
}

impl TableCache {
    fn new() -> Self {
        Self {
            rows: HashMap::with_capacity(CACHE_INITIAL_CAPACITY),
            high_water: 0,
        }
    }
}

pub struct RowCache {
    tables: RwLock<HashMap<String, TableCache>>,
}

impl RowCache {
    pub fn new(table_names: impl IntoIterator<Item = String>) -> Self {
        let tables = table_names
            .into_iter()
            .map(|name| (name, TableCache::new()))
            .collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Installs the scanned rows of `table` and advances its high-water
    /// mark past every row id seen. Called once per table at open.
    pub fn warm(&self, table: &str, rows: Vec<Row>) {
        let mut tables = self.tables.write();
        let Some(cache) = tables.get_mut(table) else {
            return;
        };
        for row in rows {
            cache.high_water = cache.high_water.max(row.id() + 1);
            cache.rows.insert(row.id(), row.into_payload());
        }
    }

    pub fn get(&self, table: &str, row_id: RowId) -> Option<Payload> {
        self.tables
            .read()
            .get(table)
            .and_then(|cache| cache.rows.get(&row_id).cloned())
    }

    pub fn contains(&self, table: &str, row_id: RowId) -> bool {
        self.tables
            .read()
            .get(table)
            .is_some_and(|cache| cache.rows.contains_key(&row_id))
    }

    /// Snapshot of every row in `table`, ascending by row id. The
    /// ascending order makes scan output deterministic.
    pub fn snapshot(&self, table: &str) -> Vec<Row> {
        let tables = self.tables.read();
        let Some(cache) = tables.get(table) else {
            return Vec::new();
        };
        let mut rows: Vec<Row> = cache
            .rows
            .iter()
            .map(|(id, payload)| Row::new(*id, payload.clone()))
            .collect();
        rows.sort_unstable_by_key(Row::id);
        rows
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .get(table)
            .map(|cache| cache.rows.len())
            .unwrap_or(0)
    }

    /// Allocates the next row id for `table`. Ids are never reused while
    /// a row exists; ids allocated by a transaction that rolls back are
    /// simply skipped.
    pub fn next_row_id(&self, table: &str) -> RowId {
        let mut tables = self.tables.write();
        let cache = tables.entry(table.to_string()).or_insert_with(TableCache::new);
        let id = cache.high_water;
        cache.high_water += 1;
        id
    }

    pub fn high_water(&self, table: &str) -> RowId {
        self.tables
            .read()
            .get(table)
            .map(|cache| cache.high_water)
            .unwrap_or(0)
    }

    /// Restores a persisted high-water mark at open. Keeps the larger of
    /// the persisted mark and whatever warming already derived.
    pub fn set_high_water(&self, table: &str, mark: RowId) {
        let mut tables = self.tables.write();
        if let Some(cache) = tables.get_mut(table) {
            cache.high_water = cache.high_water.max(mark);
        }
    }

    /// Commit-phase application. Only called while the table's writer
    /// lock is held.
    pub fn put(&self, table: &str, row_id: RowId, payload: Payload) {
        let mut tables = self.tables.write();
        if let Some(cache) = tables.get_mut(table) {
            cache.rows.insert(row_id, payload);
        }
    }

    /// Commit-phase removal. Only called while the table's writer lock is
    /// held.
    pub fn remove(&self, table: &str, row_id: RowId) {
        let mut tables = self.tables.write();
        if let Some(cache) = tables.get_mut(table) {
            cache.rows.remove(&row_id);
        }
    }
}
