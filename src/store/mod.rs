//! # Backing-Store Adapter
//!
//! The engine persists through a uniform asynchronous page/row store
//! interface; concrete wires (a browser object store, a remote KV) live
//! outside the crate. The contract is exactly four operations:
//!
//! - `open(schema)` — load or initialize the store.
//! - `scan(table)` — read all rows of a table; used once at startup to
//!   warm the cache and rebuild indices.
//! - `write(batch)` — best-effort-atomic commit of a journal; an entry
//!   with a `None` payload is a tombstone.
//! - `close()`.
//!
//! ## Persisted Layout
//!
//! Rows are stored per table keyed by row id. A single `__metadata__`
//! entry (row id 0) carries the schema version and the per-table row-id
//! high-water marks, flowing through the same `scan`/`write` surface as
//! ordinary rows. Index state is never persisted; it is rebuilt from the
//! scan at open.

mod memory;
mod metadata;

pub use memory::MemoryStore;
pub use metadata::{decode_metadata, encode_metadata, StoreMetadata, METADATA_ROW_ID};

use crate::row::{Payload, Row, RowId};
use crate::schema::Schema;
use async_trait::async_trait;
use eyre::Result;

/// One element of a commit batch. `payload: None` is a tombstone.
#[derive(Debug, Clone)]
pub struct WriteEntry {
    pub table: String,
    pub row_id: RowId,
    pub payload: Option<Payload>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Loads or initializes the store for `schema`.
    async fn open(&self, schema: &Schema) -> Result<()>;

    /// All rows of `table`. Scanning an unknown table yields no rows.
    async fn scan(&self, table: &str) -> Result<Vec<Row>>;

    /// Applies a commit batch. Atomicity is best-effort, bounded by the
    /// adapter's own guarantees; a failure here puts the database into
    /// degraded mode.
    async fn write(&self, batch: Vec<WriteEntry>) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
