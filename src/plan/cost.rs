//! Cardinality estimation.
//!
//! The planner's cost currency is estimated output cardinality. Leaves
//! read exact figures from the index store (row counts, range costs);
//! interior nodes apply the usual blunt selectivity factors. The numbers
//! only need to rank alternatives, not predict runtimes.

use super::logical::LogicalNode;
use super::PlanContext;

/// Selectivity assumed for a filter predicate.
const FILTER_SELECTIVITY: f64 = 0.1;
/// Selectivity assumed for a join predicate over the cross product.
const JOIN_SELECTIVITY: f64 = 0.1;

pub fn estimated_cardinality(node: &LogicalNode, ctx: &PlanContext<'_>) -> usize {
    match node {
        LogicalNode::TableAccess(n) => ctx.indices.table_cardinality(&n.table),
        LogicalNode::PrimaryKeyLookup(_) => 1,
        LogicalNode::IndexScan(n) => ctx
            .indices
            .cost(&n.table, &n.index, Some(&n.range))
            .unwrap_or(0),
        LogicalNode::Select(n) => scaled(estimated_cardinality(&n.input, ctx), FILTER_SELECTIVITY),
        LogicalNode::Join(n) => {
            let left = estimated_cardinality(&n.left, ctx);
            let right = estimated_cardinality(&n.right, ctx);
            let cross = left.saturating_mul(right);
            if n.predicate.is_some() {
                scaled(cross, JOIN_SELECTIVITY)
            } else {
                cross
            }
        }
        LogicalNode::Project(n) => estimated_cardinality(&n.input, ctx),
        LogicalNode::OrderBy(n) => estimated_cardinality(&n.input, ctx),
        LogicalNode::GroupBy(n) => {
            scaled(estimated_cardinality(&n.input, ctx), FILTER_SELECTIVITY)
        }
        // Grouped aggregation keeps roughly the group count; scalar
        // aggregation collapses to one row.
        LogicalNode::Aggregation(n) => match n.input.as_ref() {
            LogicalNode::GroupBy(g) => {
                scaled(estimated_cardinality(&g.input, ctx), FILTER_SELECTIVITY)
            }
            _ => 1,
        },
        LogicalNode::Skip(n) => {
            estimated_cardinality(&n.input, ctx).saturating_sub(n.count)
        }
        LogicalNode::Limit(n) => estimated_cardinality(&n.input, ctx).min(n.count),
        LogicalNode::SetOp(n) => n
            .children
            .iter()
            .map(|c| estimated_cardinality(c, ctx))
            .max()
            .unwrap_or(0),
        LogicalNode::InsertValues(n) => n.rows.len(),
        LogicalNode::Update(_) | LogicalNode::Delete(_) => 0,
        LogicalNode::Empty => 0,
    }
}

fn scaled(cardinality: usize, selectivity: f64) -> usize {
    ((cardinality as f64 * selectivity).ceil() as usize).max(1)
}
