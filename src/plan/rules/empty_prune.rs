//! Empty-relation elimination.
//!
//! Any operator whose output is provably empty collapses to the `Empty`
//! leaf: access to a table with no rows (and no pending journal writes),
//! an index scan over an empty range, row-preserving operators over an
//! empty input, inner joins with an empty side, and `Limit(0)`.
//! Aggregation is deliberately left alone — a scalar aggregate over an
//! empty input still yields one row — as is `GroupBy`, whose pruning
//! would turn a grouped aggregation into a scalar one.

use super::{transform_up, RewriteRule};
use crate::plan::logical::{LogicalNode, SetOpNode};
use crate::plan::PlanContext;
use crate::query::{JoinType, SetOpKind};
use eyre::Result;

pub struct EmptyPruneRule;

impl RewriteRule for EmptyPruneRule {
    fn name(&self) -> &'static str {
        "empty-prune"
    }

    fn apply(&self, node: &LogicalNode, ctx: &PlanContext<'_>) -> Result<Option<LogicalNode>> {
        transform_up(node, &|n| Ok(prune_one(n, ctx)))
    }
}

fn is_empty(node: &LogicalNode) -> bool {
    matches!(node, LogicalNode::Empty)
}

fn prune_one(node: &LogicalNode, ctx: &PlanContext<'_>) -> Option<LogicalNode> {
    match node {
        LogicalNode::TableAccess(n) => {
            let untouched = !ctx.journal_touched.contains(&n.table);
            (untouched && ctx.indices.table_cardinality(&n.table) == 0)
                .then_some(LogicalNode::Empty)
        }
        LogicalNode::IndexScan(n) => n.range.is_empty().then_some(LogicalNode::Empty),
        LogicalNode::Select(n) => is_empty(&n.input).then_some(LogicalNode::Empty),
        LogicalNode::Project(n) => is_empty(&n.input).then_some(LogicalNode::Empty),
        LogicalNode::OrderBy(n) => is_empty(&n.input).then_some(LogicalNode::Empty),
        LogicalNode::Skip(n) => is_empty(&n.input).then_some(LogicalNode::Empty),
        LogicalNode::Limit(n) => {
            (is_empty(&n.input) || n.count == 0).then_some(LogicalNode::Empty)
        }
        LogicalNode::Join(n) => {
            let prune = match n.join_type {
                JoinType::Inner => is_empty(&n.left) || is_empty(&n.right),
                // The preserved side alone decides for outer joins.
                JoinType::LeftOuter => is_empty(&n.left),
            };
            prune.then_some(LogicalNode::Empty)
        }
        LogicalNode::SetOp(n) => prune_set_op(n),
        _ => None,
    }
}

fn prune_set_op(node: &SetOpNode) -> Option<LogicalNode> {
    match node.kind {
        SetOpKind::Intersect => node
            .children
            .iter()
            .any(is_empty)
            .then_some(LogicalNode::Empty),
        SetOpKind::Union => {
            let non_empty: Vec<LogicalNode> = node
                .children
                .iter()
                .filter(|c| !is_empty(c))
                .cloned()
                .collect();
            match non_empty.len() {
                0 => Some(LogicalNode::Empty),
                1 => Some(non_empty.into_iter().next().unwrap()),
                n if n < node.children.len() => Some(LogicalNode::SetOp(SetOpNode {
                    kind: node.kind,
                    children: non_empty,
                })),
                _ => None,
            }
        }
        SetOpKind::Except => {
            let [left, right] = node.children.as_slice() else {
                return None;
            };
            if is_empty(left) {
                Some(LogicalNode::Empty)
            } else if is_empty(right) {
                Some(left.clone())
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexStore;
    use crate::plan::logical::{SelectNode, TableAccessNode};
    use crate::schema::{Schema, TableBuilder};
    use crate::types::DataType;
    use hashbrown::HashSet;

    fn fixture() -> (Schema, IndexStore) {
        let schema = Schema::builder("s", 1)
            .table(TableBuilder::new("empty_t").column("x", DataType::Integer))
            .build()
            .unwrap();
        let indices = IndexStore::new(&schema);
        (schema, indices)
    }

    #[test]
    fn empty_table_access_collapses() {
        let (schema, indices) = fixture();
        let ctx = PlanContext {
            schema: &schema,
            indices: &indices,
            journal_touched: HashSet::new(),
        };
        let x = schema.table("empty_t").unwrap().column_handle("x").unwrap();
        let plan = LogicalNode::Select(SelectNode {
            input: Box::new(LogicalNode::TableAccess(TableAccessNode {
                table: "empty_t".into(),
            })),
            predicate: x.gt(0i64),
        });
        let rewritten = EmptyPruneRule.apply(&plan, &ctx).unwrap().unwrap();
        assert!(matches!(rewritten, LogicalNode::Empty));
    }

    #[test]
    fn journal_touched_table_is_not_pruned() {
        let (schema, indices) = fixture();
        let mut touched = HashSet::new();
        touched.insert("empty_t".to_string());
        let ctx = PlanContext {
            schema: &schema,
            indices: &indices,
            journal_touched: touched,
        };
        let plan = LogicalNode::TableAccess(TableAccessNode {
            table: "empty_t".into(),
        });
        assert!(EmptyPruneRule.apply(&plan, &ctx).unwrap().is_none());
    }
}
