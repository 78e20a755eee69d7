//! # Index Subsystem
//!
//! In-memory indices with a common capability contract consumed by the
//! planner and the commit pipeline. Every index maps an encoded key (see
//! `encoding::key`) to one or more row ids.
//!
//! ## Capability Contract
//!
//! | Operation | Semantics |
//! |-----------|-----------|
//! | `add` | insert an association; CONSTRAINT if a unique index already holds the key |
//! | `set` | replace any existing association for the key |
//! | `get` | row ids for the key; single-row indices return 0 or 1 |
//! | `get_range` | row ids in ascending key order; `None` means all |
//! | `remove` | a specific mapping, or every mapping for the key |
//! | `cost` | cheap cardinality estimate for a range, consumed directly by the planner |
//! | `contains_key` | membership test |
//!
//! ## Implementations
//!
//! - [`OrderedIndex`] — BTreeMap-backed multi-map over encoded keys;
//!   logarithmic mutation and lookup, in-order range scans; equal-key
//!   tie-break is insertion order.
//! - [`HashIndex`] — constant-time single-map (primary/unique point
//!   lookups); range scans sort on demand.
//! - [`RowIdIndex`] — the table's row-id identity index backing full scans
//!   and row counts.
//!
//! Indices are never persisted; [`IndexStore`] rebuilds every index from
//! table content when a database opens.

mod btree;
mod hash;
mod row_id;
mod store;

pub use btree::OrderedIndex;
pub use hash::HashIndex;
pub use row_id::RowIdIndex;
pub use store::{key_for, key_has_null, IndexKind, IndexMeta, IndexStore, TableIndices};

use crate::encoding::KeyRange;
use crate::row::RowId;
use eyre::Result;

pub trait Index {
    fn name(&self) -> &str;

    fn is_unique(&self) -> bool;

    /// Inserts a new association. Fails with CONSTRAINT when a unique
    /// index already holds a different row under `key`.
    fn add(&mut self, key: &[u8], value: RowId) -> Result<()>;

    /// Replaces any existing association for `key`.
    fn set(&mut self, key: &[u8], value: RowId);

    fn get(&self, key: &[u8]) -> Vec<RowId>;

    /// Row ids in ascending key order. `None` yields everything.
    fn get_range(&self, range: Option<&KeyRange>) -> Vec<RowId>;

    /// Removes one mapping when `value` is given, otherwise every mapping
    /// for `key`.
    fn remove(&mut self, key: &[u8], value: Option<RowId>);

    /// Cardinality estimate for the range; exact for these in-memory
    /// implementations, which keeps the planner's cost model honest.
    fn cost(&self, range: Option<&KeyRange>) -> usize;

    fn contains_key(&self, key: &[u8]) -> bool;

    fn clear(&mut self);
}
