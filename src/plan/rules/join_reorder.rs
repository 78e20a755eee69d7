//! Join reordering.
//!
//! Left-deep greedy: for every inner join the smaller estimated input
//! goes left. Swapping join sides is safe because joined payloads are
//! keyed by table name, not by position, so attribute resolution is
//! order-independent. Outer joins are never reordered.

use super::{transform_up, RewriteRule};
use crate::plan::cost::estimated_cardinality;
use crate::plan::logical::{JoinNode, LogicalNode};
use crate::plan::PlanContext;
use crate::query::JoinType;
use eyre::Result;

pub struct JoinReorderRule;

impl RewriteRule for JoinReorderRule {
    fn name(&self) -> &'static str {
        "join-reorder"
    }

    fn apply(&self, node: &LogicalNode, ctx: &PlanContext<'_>) -> Result<Option<LogicalNode>> {
        transform_up(node, &|n| Ok(reorder_one(n, ctx)))
    }
}

fn reorder_one(node: &LogicalNode, ctx: &PlanContext<'_>) -> Option<LogicalNode> {
    let LogicalNode::Join(join) = node else {
        return None;
    };
    if join.join_type != JoinType::Inner {
        return None;
    }
    let left = estimated_cardinality(&join.left, ctx);
    let right = estimated_cardinality(&join.right, ctx);
    // Strictly-less keeps the rule idempotent: after one swap the sides
    // compare equal-or-ascending and the rule goes quiet.
    if right < left {
        Some(LogicalNode::Join(JoinNode {
            left: join.right.clone(),
            right: join.left.clone(),
            join_type: join.join_type,
            predicate: join.predicate.clone(),
        }))
    } else {
        None
    }
}
