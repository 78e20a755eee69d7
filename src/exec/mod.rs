//! # Physical Operator Execution
//!
//! Executes a physical plan tree bottom-up, each operator fully
//! materializing its output [`Relation`] before the parent consumes it.
//! Batched materialization (rather than pull-per-row iteration) keeps
//! memory accounting trivial for the small-to-medium datasets the engine
//! targets and lets the relation calculus of `relation` do the heavy
//! lifting.
//!
//! Execution is entirely synchronous: reads come from the warmed row
//! cache (overlaid with the transaction's journal), never from the
//! asynchronous store. DML operators append to the journal; nothing here
//! touches shared state.

mod aggregate;
mod dml;
mod filter;
mod join;
mod limit;
mod project;
mod scan;
mod set_ops;
mod sort;

pub use dml::validate_payload;

use crate::context::Context;
use crate::journal::Journal;
use crate::plan::PhysicalNode;
use crate::relation::Relation;
use eyre::Result;

/// Per-execution state handed down the operator tree: the shared engine
/// context plus the owning transaction's journal.
pub struct ExecContext<'a> {
    pub ctx: &'a Context,
    pub journal: &'a mut Journal,
}

pub fn execute(node: &PhysicalNode, exec: &mut ExecContext<'_>) -> Result<Relation> {
    match node {
        PhysicalNode::TableScan(n) => scan::table_scan(&n.table, exec),
        PhysicalNode::IndexScan(n) => scan::index_scan(&n.table, &n.index, &n.range, exec),
        PhysicalNode::PrimaryKeyLookup(n) => scan::primary_key_lookup(&n.table, &n.key, exec),
        PhysicalNode::Filter(n) => {
            let input = execute(&n.input, exec)?;
            Ok(filter::filter(input, &n.predicate))
        }
        PhysicalNode::Project(n) => {
            let input = execute(&n.input, exec)?;
            project::project(input, &n.items)
        }
        PhysicalNode::NestedLoopJoin(n) => {
            let left = execute(&n.left, exec)?;
            let right = execute(&n.right, exec)?;
            join::nested_loop_join(left, right, n.join_type, n.predicate.as_ref(), exec.ctx)
        }
        PhysicalNode::HashJoin(n) => {
            let left = execute(&n.left, exec)?;
            let right = execute(&n.right, exec)?;
            Ok(join::hash_join(
                left,
                right,
                &n.left_column,
                &n.right_column,
                n.residual.as_ref(),
            ))
        }
        PhysicalNode::Sort(n) => {
            let input = execute(&n.input, exec)?;
            Ok(sort::sort(input, &n.keys))
        }
        PhysicalNode::Skip(n) => {
            let input = execute(&n.input, exec)?;
            Ok(limit::skip(input, n.count))
        }
        PhysicalNode::Limit(n) => {
            let input = execute(&n.input, exec)?;
            Ok(limit::limit(input, n.count))
        }
        PhysicalNode::GroupAggregate(n) => {
            let input = execute(&n.input, exec)?;
            aggregate::group_aggregate(input, &n.group_columns, &n.aggregates)
        }
        PhysicalNode::SetOp(n) => {
            let mut children = Vec::with_capacity(n.children.len());
            for child in &n.children {
                children.push(execute(child, exec)?);
            }
            set_ops::set_op(n.kind, children)
        }
        PhysicalNode::Insert(n) => dml::insert(&n.table, &n.rows, n.or_replace, exec),
        PhysicalNode::Update(n) => dml::update(&n.table, &n.assignments, n.filter.as_ref(), exec),
        PhysicalNode::Delete(n) => dml::delete(&n.table, n.filter.as_ref(), exec),
        PhysicalNode::Empty => Ok(Relation::empty()),
    }
}
