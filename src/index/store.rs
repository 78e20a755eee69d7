//! Index registry.
//!
//! `IndexStore` owns every index of a schema: one row-id identity index
//! per table, an ordered primary-key index when the table declares one,
//! and one ordered index per secondary declaration. It rebuilds them from
//! scanned rows at database open (index state is never persisted), applies
//! committed journal mutations, and hands the planner the per-index
//! metadata and cost figures access-path selection runs on.

use super::{Index, OrderedIndex, RowIdIndex};
use crate::encoding::{encode_row_key, Key, KeyRange};
use crate::error::{constraint, unknown};
use crate::row::{Payload, Row, RowId};
use crate::schema::{Schema, TableDef};
use eyre::Result;
use hashbrown::HashMap;

/// Spec-level index kind; drives the planner's tie-break
/// (primary > unique > non-unique).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexKind {
    Primary,
    Unique,
    NonUnique,
}

#[derive(Debug, Clone)]
pub struct IndexMeta {
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
    pub kind: IndexKind,
    /// Declaration position; the final tie-break for equal costs.
    pub decl_order: usize,
}

pub struct TableIndices {
    row_id: RowIdIndex,
    primary: Option<OrderedIndex>,
    secondary: Vec<OrderedIndex>,
}

impl TableIndices {
    fn new(table: &TableDef) -> Self {
        let primary = table
            .primary_key()
            .map(|_| OrderedIndex::new(format!("{}.pk", table.name()), true));
        let secondary = table
            .indices()
            .iter()
            .map(|idx| {
                OrderedIndex::new(format!("{}.{}", table.name(), idx.name()), idx.is_unique())
            })
            .collect();
        Self {
            row_id: RowIdIndex::new(format!("{}.#", table.name())),
            primary,
            secondary,
        }
    }

    pub fn row_id_index(&self) -> &RowIdIndex {
        &self.row_id
    }

    pub fn primary(&self) -> Option<&OrderedIndex> {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> &[OrderedIndex] {
        &self.secondary
    }
}

pub struct IndexStore {
    tables: HashMap<String, TableIndices>,
}

impl IndexStore {
    pub fn new(schema: &Schema) -> Self {
        let tables = schema
            .tables()
            .iter()
            .map(|t| (t.name().to_string(), TableIndices::new(t)))
            .collect();
        Self { tables }
    }

    fn table_indices(&self, table: &str) -> Result<&TableIndices> {
        self.tables
            .get(table)
            .ok_or_else(|| unknown(format!("no indices registered for table '{table}'")))
    }

    fn table_indices_mut(&mut self, table: &str) -> Result<&mut TableIndices> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| unknown(format!("no indices registered for table '{table}'")))
    }

    /// Drops and rebuilds every index of `table` from `rows`. Called at
    /// database open after the store scan.
    pub fn rebuild(&mut self, table: &TableDef, rows: &[Row]) -> Result<()> {
        let indices = self.table_indices_mut(table.name())?;
        indices.row_id.clear();
        if let Some(primary) = &mut indices.primary {
            primary.clear();
        }
        for index in &mut indices.secondary {
            index.clear();
        }
        for row in rows {
            Self::apply_insert_inner(table, indices, row.id(), row.payload())?;
        }
        Ok(())
    }

    /// Registers a committed insert across the table's indices.
    pub fn apply_insert(&mut self, table: &TableDef, row_id: RowId, payload: &Payload) -> Result<()> {
        let indices = self.table_indices_mut(table.name())?;
        Self::apply_insert_inner(table, indices, row_id, payload)
    }

    fn apply_insert_inner(
        table: &TableDef,
        indices: &mut TableIndices,
        row_id: RowId,
        payload: &Payload,
    ) -> Result<()> {
        indices.row_id.insert(row_id);
        if let (Some(primary), Some(pk_cols)) = (&mut indices.primary, table.primary_key()) {
            let key = key_for(table, pk_cols, payload)?;
            primary.add(&key, row_id)?;
        }
        for (def, index) in table.indices().iter().zip(&mut indices.secondary) {
            let key = key_for(table, def.columns(), payload)?;
            index.add(&key, row_id)?;
        }
        Ok(())
    }

    /// Unregisters a committed delete. `payload` is the before-image; the
    /// index keys are recomputed from it.
    pub fn apply_delete(&mut self, table: &TableDef, row_id: RowId, payload: &Payload) -> Result<()> {
        let indices = self.table_indices_mut(table.name())?;
        indices.row_id.delete(row_id);
        if let (Some(primary), Some(pk_cols)) = (&mut indices.primary, table.primary_key()) {
            let key = key_for(table, pk_cols, payload)?;
            primary.remove(&key, Some(row_id));
        }
        for (def, index) in table.indices().iter().zip(&mut indices.secondary) {
            let key = key_for(table, def.columns(), payload)?;
            index.remove(&key, Some(row_id));
        }
        Ok(())
    }

    /// Re-keys a committed update using its before and after images.
    pub fn apply_update(
        &mut self,
        table: &TableDef,
        row_id: RowId,
        before: &Payload,
        after: &Payload,
    ) -> Result<()> {
        let indices = self.table_indices_mut(table.name())?;
        if let (Some(primary), Some(pk_cols)) = (&mut indices.primary, table.primary_key()) {
            let old_key = key_for(table, pk_cols, before)?;
            let new_key = key_for(table, pk_cols, after)?;
            if old_key != new_key {
                primary.remove(&old_key, Some(row_id));
                primary.add(&new_key, row_id)?;
            }
        }
        for (def, index) in table.indices().iter().zip(&mut indices.secondary) {
            let old_key = key_for(table, def.columns(), before)?;
            let new_key = key_for(table, def.columns(), after)?;
            if old_key != new_key {
                index.remove(&old_key, Some(row_id));
                index.add(&new_key, row_id)?;
            }
        }
        Ok(())
    }

    /// Commit-time uniqueness probe against the *committed* index state.
    /// `exclude` names the row being replaced (updates and upserts).
    pub fn check_unique(
        &self,
        table: &TableDef,
        payload: &Payload,
        exclude: Option<RowId>,
    ) -> Result<()> {
        let excluded: hashbrown::HashSet<RowId> = exclude.into_iter().collect();
        self.check_unique_excluding(table, payload, &excluded)
    }

    /// Uniqueness probe that ignores a whole set of row ids — the rows a
    /// committing transaction is deleting or re-keying, whose committed
    /// index entries must not count as conflicts.
    ///
    /// A unique *secondary* key with a NULL component is exempt (NULLs do
    /// not collide); primary-key columns cannot be NULL by construction.
    pub fn check_unique_excluding(
        &self,
        table: &TableDef,
        payload: &Payload,
        excluded: &hashbrown::HashSet<RowId>,
    ) -> Result<()> {
        let indices = self.table_indices(table.name())?;
        if let (Some(primary), Some(pk_cols)) = (&indices.primary, table.primary_key()) {
            let key = key_for(table, pk_cols, payload)?;
            if holds_unexcluded_row(primary, &key, excluded) {
                return Err(constraint(format!(
                    "primary key violation on table '{}'",
                    table.name()
                )));
            }
        }
        for (def, index) in table.indices().iter().zip(&indices.secondary) {
            if !def.is_unique() {
                continue;
            }
            if key_has_null(def.columns(), payload) {
                continue;
            }
            let key = key_for(table, def.columns(), payload)?;
            if holds_unexcluded_row(index, &key, excluded) {
                return Err(constraint(format!(
                    "unique index '{}' violation on table '{}'",
                    def.name(),
                    table.name()
                )));
            }
        }
        Ok(())
    }

    /// Row count of a table; the planner's full-scan cost.
    pub fn table_cardinality(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.row_id.len()).unwrap_or(0)
    }

    /// All live row ids of a table, ascending.
    pub fn table_row_ids(&self, table: &str) -> Vec<RowId> {
        self.tables
            .get(table)
            .map(|t| t.row_id.row_ids())
            .unwrap_or_default()
    }

    /// Metadata for every ordered index on `table` the planner may pick:
    /// the primary index first, then secondaries in declaration order.
    pub fn metas(&self, table: &TableDef) -> Vec<IndexMeta> {
        let mut metas = Vec::new();
        if let Some(pk_cols) = table.primary_key() {
            metas.push(IndexMeta {
                table: table.name().to_string(),
                name: format!("{}.pk", table.name()),
                columns: pk_cols.to_vec(),
                kind: IndexKind::Primary,
                decl_order: 0,
            });
        }
        for (i, def) in table.indices().iter().enumerate() {
            metas.push(IndexMeta {
                table: table.name().to_string(),
                name: format!("{}.{}", table.name(), def.name()),
                columns: def.columns().to_vec(),
                kind: if def.is_unique() {
                    IndexKind::Unique
                } else {
                    IndexKind::NonUnique
                },
                decl_order: i + 1,
            });
        }
        metas
    }

    fn ordered_index(&self, table: &str, index_name: &str) -> Result<&OrderedIndex> {
        let indices = self.table_indices(table)?;
        if let Some(primary) = &indices.primary {
            if primary.name() == index_name {
                return Ok(primary);
            }
        }
        indices
            .secondary
            .iter()
            .find(|idx| idx.name() == index_name)
            .ok_or_else(|| unknown(format!("index '{index_name}' not registered on '{table}'")))
    }

    /// Range cost of a named index; consumed directly by the planner.
    pub fn cost(&self, table: &str, index_name: &str, range: Option<&KeyRange>) -> Result<usize> {
        Ok(self.ordered_index(table, index_name)?.cost(range))
    }

    /// Row ids matching `range` on a named index, ascending key order.
    pub fn scan(&self, table: &str, index_name: &str, range: Option<&KeyRange>) -> Result<Vec<RowId>> {
        Ok(self.ordered_index(table, index_name)?.get_range(range))
    }

    /// Point lookup on the primary-key index.
    pub fn primary_lookup(&self, table: &str, key: &[u8]) -> Result<Vec<RowId>> {
        let indices = self.table_indices(table)?;
        let Some(primary) = &indices.primary else {
            return Err(unknown(format!("table '{table}' has no primary index")));
        };
        Ok(primary.get(key))
    }
}

fn holds_unexcluded_row(
    index: &OrderedIndex,
    key: &[u8],
    excluded: &hashbrown::HashSet<RowId>,
) -> bool {
    index.get(key).iter().any(|h| !excluded.contains(h))
}

/// Whether any key-column slot of `payload` is NULL (or absent).
pub fn key_has_null(columns: &[String], payload: &Payload) -> bool {
    columns.iter().any(|c| {
        payload
            .get(c.as_str())
            .map(crate::types::Value::is_null)
            .unwrap_or(true)
    })
}

/// Encodes the index key of `payload` over the named columns.
pub fn key_for(table: &TableDef, columns: &[String], payload: &Payload) -> Result<Key> {
    let mut defs = Vec::with_capacity(columns.len());
    for name in columns {
        defs.push(table.column(name)?);
    }
    encode_row_key(&defs, payload)
}
