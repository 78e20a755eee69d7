//! In-memory store adapter.
//!
//! The reference adapter: a per-table ordered map of row id → payload
//! behind a mutex. Useful on its own for ephemeral databases and as the
//! fixture every transaction/persistence test runs against. `write` can
//! be told to fail, which is how degraded-mode behavior is exercised.

use super::{Store, WriteEntry};
use crate::error::store_failure;
use crate::row::{Payload, Row, RowId};
use crate::schema::Schema;
use async_trait::async_trait;
use eyre::Result;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, BTreeMap<RowId, Payload>>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `write` fail with a STORE error until
    /// cleared. Test hook for degraded-mode paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Direct row count, bypassing the engine. Test observability.
    pub fn stored_row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .get(table)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn open(&self, schema: &Schema) -> Result<()> {
        let mut tables = self.tables.lock();
        for table in schema.tables() {
            tables.entry(table.name().to_string()).or_default();
        }
        Ok(())
    }

    async fn scan(&self, table: &str) -> Result<Vec<Row>> {
        let tables = self.tables.lock();
        Ok(tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .map(|(id, payload)| Row::new(*id, payload.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn write(&self, batch: Vec<WriteEntry>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(store_failure("memory store write failure injected"));
        }
        let mut tables = self.tables.lock();
        for entry in batch {
            let rows = tables.entry(entry.table).or_default();
            match entry.payload {
                Some(payload) => {
                    rows.insert(entry.row_id, payload);
                }
                None => {
                    rows.remove(&entry.row_id);
                }
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
