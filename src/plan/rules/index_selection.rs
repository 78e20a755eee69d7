//! Access-path substitution.
//!
//! Two rules replace `TableAccess + Select` stacks with cheaper leaves:
//!
//! - [`PrimaryKeyLookupRule`]: every primary-key column constrained by an
//!   equality becomes a point lookup on the primary index.
//! - [`IndexScanRule`]: a range-expressible conjunct over an indexed
//!   column becomes an index scan. Among usable indices the minimum
//!   `cost(range)` wins; ties break primary > unique > non-unique, then
//!   declaration order.
//!
//! Consumed conjuncts disappear from the filter; the remainder stays as
//! a residual `Select` above the new leaf. Neither rule fires for a
//! table with pending journal mutations in the executing transaction:
//! the journal overlay is only visible to full scans.

use super::{transform_up, RewriteRule};
use crate::encoding::{Key, KeyRange};
use crate::plan::logical::{
    IndexScanNode, LogicalNode, PrimaryKeyLookupNode, SelectNode, TableAccessNode,
};
use crate::plan::PlanContext;
use crate::predicate::{and, Predicate};
use crate::schema::TableDef;
use eyre::Result;
use hashbrown::HashMap;
use tracing::debug;

pub struct PrimaryKeyLookupRule;

impl RewriteRule for PrimaryKeyLookupRule {
    fn name(&self) -> &'static str {
        "primary-key-lookup"
    }

    fn apply(&self, node: &LogicalNode, ctx: &PlanContext<'_>) -> Result<Option<LogicalNode>> {
        transform_up(node, &|n| substitute_pk_lookup(n, ctx))
    }
}

pub struct IndexScanRule;

impl RewriteRule for IndexScanRule {
    fn name(&self) -> &'static str {
        "index-scan"
    }

    fn apply(&self, node: &LogicalNode, ctx: &PlanContext<'_>) -> Result<Option<LogicalNode>> {
        transform_up(node, &|n| substitute_index_scan(n, ctx))
    }
}

/// Per-column range material extracted from a filter's conjuncts:
/// intersected range plus the conjunct positions it consumes.
struct ColumnRanges {
    ranges: HashMap<String, (KeyRange, Vec<usize>)>,
}

fn scan_target<'a>(
    node: &'a LogicalNode,
    ctx: &PlanContext<'_>,
) -> Option<(&'a SelectNode, &'a TableAccessNode)> {
    let LogicalNode::Select(select) = node else {
        return None;
    };
    let LogicalNode::TableAccess(access) = select.input.as_ref() else {
        return None;
    };
    if ctx.journal_touched.contains(&access.table) {
        return None;
    }
    Some((select, access))
}

fn column_ranges(conjuncts: &[&Predicate], table: &TableDef) -> Result<ColumnRanges> {
    let mut ranges: HashMap<String, (KeyRange, Vec<usize>)> = HashMap::new();
    for (i, conjunct) in conjuncts.iter().enumerate() {
        if let Some((column, range)) = conjunct.as_key_range(table)? {
            match ranges.get_mut(&column) {
                Some((existing, consumed)) => {
                    *existing = existing.intersect(&range);
                    consumed.push(i);
                }
                None => {
                    ranges.insert(column, (range, vec![i]));
                }
            }
        }
    }
    Ok(ColumnRanges { ranges })
}

/// The single key of a degenerate `[k, k]` range, if that is what the
/// range is.
fn exact_key(range: &KeyRange) -> Option<Key> {
    if range.is_lower_open() || range.is_upper_open() {
        return None;
    }
    match (range.lower(), range.upper()) {
        (Some(lo), Some(hi)) if lo == hi => Some(lo.clone()),
        _ => None,
    }
}

fn residual_select(
    input: LogicalNode,
    conjuncts: &[&Predicate],
    consumed: &[usize],
) -> LogicalNode {
    let residual: Vec<Predicate> = conjuncts
        .iter()
        .enumerate()
        .filter(|(i, _)| !consumed.contains(i))
        .map(|(_, p)| (*p).clone())
        .collect();
    if residual.is_empty() {
        input
    } else {
        LogicalNode::Select(SelectNode {
            input: Box::new(input),
            predicate: and(residual),
        })
    }
}

fn substitute_pk_lookup(
    node: &LogicalNode,
    ctx: &PlanContext<'_>,
) -> Result<Option<LogicalNode>> {
    let Some((select, access)) = scan_target(node, ctx) else {
        return Ok(None);
    };
    let table = ctx.schema.table(&access.table)?;
    let Some(pk_columns) = table.primary_key() else {
        return Ok(None);
    };

    let conjuncts = select.predicate.conjuncts();
    let ranges = column_ranges(&conjuncts, table)?;

    let mut key = Key::new();
    let mut consumed = Vec::new();
    for pk_column in pk_columns {
        let Some((range, conjunct_ids)) = ranges.ranges.get(pk_column) else {
            return Ok(None);
        };
        let Some(part) = exact_key(range) else {
            return Ok(None);
        };
        key.extend_from_slice(&part);
        consumed.extend_from_slice(conjunct_ids);
    }

    debug!(table = %access.table, "substituting primary-key lookup");
    let lookup = LogicalNode::PrimaryKeyLookup(PrimaryKeyLookupNode {
        table: access.table.clone(),
        key,
    });
    Ok(Some(residual_select(lookup, &conjuncts, &consumed)))
}

fn substitute_index_scan(
    node: &LogicalNode,
    ctx: &PlanContext<'_>,
) -> Result<Option<LogicalNode>> {
    let Some((select, access)) = scan_target(node, ctx) else {
        return Ok(None);
    };
    let table = ctx.schema.table(&access.table)?;

    let conjuncts = select.predicate.conjuncts();
    let ranges = column_ranges(&conjuncts, table)?;
    if ranges.ranges.is_empty() {
        return Ok(None);
    }

    // Candidate access paths: single-column indices with a range on
    // their column, and multi-column indices where every column is
    // pinned by an equality.
    struct Candidate {
        index: String,
        range: KeyRange,
        consumed: Vec<usize>,
        cost: usize,
        kind: crate::index::IndexKind,
        decl_order: usize,
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for meta in ctx.indices.metas(table) {
        let candidate = if let [column] = meta.columns.as_slice() {
            ranges.ranges.get(column).map(|(range, consumed)| {
                (range.clone(), consumed.clone())
            })
        } else {
            let mut key = Key::new();
            let mut consumed = Vec::new();
            let mut all_exact = true;
            for column in &meta.columns {
                match ranges.ranges.get(column).and_then(|(r, ids)| {
                    exact_key(r).map(|k| (k, ids.clone()))
                }) {
                    Some((part, ids)) => {
                        key.extend_from_slice(&part);
                        consumed.extend(ids);
                    }
                    None => {
                        all_exact = false;
                        break;
                    }
                }
            }
            all_exact.then(|| (KeyRange::only(key), consumed))
        };

        if let Some((range, consumed)) = candidate {
            let cost = ctx.indices.cost(&access.table, &meta.name, Some(&range))?;
            candidates.push(Candidate {
                index: meta.name.clone(),
                range,
                consumed,
                cost,
                kind: meta.kind,
                decl_order: meta.decl_order,
            });
        }
    }

    let Some(best) = candidates
        .into_iter()
        .min_by(|a, b| {
            a.cost
                .cmp(&b.cost)
                .then(a.kind.cmp(&b.kind))
                .then(a.decl_order.cmp(&b.decl_order))
        })
    else {
        return Ok(None);
    };

    debug!(
        table = %access.table,
        index = %best.index,
        cost = best.cost,
        "substituting index scan"
    );
    let scan = LogicalNode::IndexScan(IndexScanNode {
        table: access.table.clone(),
        index: best.index,
        range: best.range,
    });
    Ok(Some(residual_select(scan, &conjuncts, &best.consumed)))
}
