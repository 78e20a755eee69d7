//! Scan leaves: full table scan, index scan, primary-key lookup.
//!
//! All three produce single-table, non-prefixed relations. The full scan
//! is the only operator that sees the journal overlay; index-based paths
//! read committed state exclusively, which the planner guarantees is
//! equivalent by refusing them for journal-touched tables.

use super::ExecContext;
use crate::encoding::KeyRange;
use crate::error::not_found;
use crate::relation::Relation;
use crate::row::{Row, RowId};
use eyre::Result;

pub fn table_scan(table: &str, exec: &mut ExecContext<'_>) -> Result<Relation> {
    exec.ctx.schema().table(table)?;
    let base = exec.ctx.cache().snapshot(table);
    let rows = exec.journal.overlay(table, base);
    Ok(Relation::from_rows(rows, [table.to_string()]))
}

pub fn index_scan(
    table: &str,
    index: &str,
    range: &KeyRange,
    exec: &mut ExecContext<'_>,
) -> Result<Relation> {
    let row_ids = exec
        .ctx
        .indices()
        .read()
        .scan(table, index, Some(range))?;
    materialize(table, row_ids, exec)
}

pub fn primary_key_lookup(
    table: &str,
    key: &[u8],
    exec: &mut ExecContext<'_>,
) -> Result<Relation> {
    let row_ids = exec.ctx.indices().read().primary_lookup(table, key)?;
    materialize(table, row_ids, exec)
}

fn materialize(table: &str, row_ids: Vec<RowId>, exec: &mut ExecContext<'_>) -> Result<Relation> {
    let mut rows = Vec::with_capacity(row_ids.len());
    for row_id in row_ids {
        let payload = exec.ctx.cache().get(table, row_id).ok_or_else(|| {
            not_found(format!(
                "row {row_id} of '{table}' is indexed but not cached"
            ))
        })?;
        rows.push(Row::new(row_id, payload));
    }
    Ok(Relation::from_rows(rows, [table.to_string()]))
}
