//! Predicate pushdown.
//!
//! Moves `Select` nodes toward the leaves: below `Project` (a reshape
//! never hides the columns a builder predicate references) and into the
//! join side that owns the predicate's tables. Conjunctions are split so
//! each conjunct sinks as far as its column ownership allows; cross-side
//! conjuncts stay above the join as the join's residual filter.
//!
//! Outer joins only accept pushdown into their preserved (left) side;
//! filtering the null-supplying side below the join would change which
//! rows get null-padded.

use super::{transform_up, RewriteRule};
use crate::plan::logical::{JoinNode, LogicalNode, ProjectNode, SelectNode};
use crate::plan::PlanContext;
use crate::predicate::{and, Predicate};
use crate::query::JoinType;
use eyre::Result;
use hashbrown::HashSet;

pub struct PushdownSelectRule;

impl RewriteRule for PushdownSelectRule {
    fn name(&self) -> &'static str {
        "pushdown-select"
    }

    fn apply(&self, node: &LogicalNode, ctx: &PlanContext<'_>) -> Result<Option<LogicalNode>> {
        let _ = ctx;
        transform_up(node, &|n| Ok(push_one(n)))
    }
}

fn push_one(node: &LogicalNode) -> Option<LogicalNode> {
    let LogicalNode::Select(select) = node else {
        return None;
    };
    match select.input.as_ref() {
        LogicalNode::Project(project) => Some(LogicalNode::Project(ProjectNode {
            input: Box::new(LogicalNode::Select(SelectNode {
                input: project.input.clone(),
                predicate: select.predicate.clone(),
            })),
            items: project.items.clone(),
        })),
        LogicalNode::Join(join) => push_into_join(select, join),
        _ => None,
    }
}

fn push_into_join(select: &SelectNode, join: &JoinNode) -> Option<LogicalNode> {
    let left_tables = join.left.source_tables();
    let right_tables = join.right.source_tables();

    let mut left_preds = Vec::new();
    let mut right_preds = Vec::new();
    let mut residual = Vec::new();

    for conjunct in select.predicate.conjuncts() {
        let tables = conjunct.tables();
        if is_subset(&tables, &left_tables) {
            left_preds.push(conjunct.clone());
        } else if is_subset(&tables, &right_tables) && join.join_type == JoinType::Inner {
            right_preds.push(conjunct.clone());
        } else {
            residual.push(conjunct.clone());
        }
    }

    if left_preds.is_empty() && right_preds.is_empty() {
        return None;
    }

    let left = wrap_select(join.left.as_ref().clone(), left_preds);
    let right = wrap_select(join.right.as_ref().clone(), right_preds);
    let new_join = LogicalNode::Join(JoinNode {
        left: Box::new(left),
        right: Box::new(right),
        join_type: join.join_type,
        predicate: join.predicate.clone(),
    });

    Some(wrap_select(new_join, residual))
}

fn wrap_select(input: LogicalNode, predicates: Vec<Predicate>) -> LogicalNode {
    if predicates.is_empty() {
        input
    } else {
        LogicalNode::Select(SelectNode {
            input: Box::new(input),
            predicate: and(predicates),
        })
    }
}

fn is_subset(tables: &HashSet<String>, of: &HashSet<String>) -> bool {
    !tables.is_empty() && tables.iter().all(|t| of.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexStore;
    use crate::plan::logical::TableAccessNode;
    use crate::schema::{Schema, TableBuilder};
    use crate::types::DataType;

    fn schema() -> Schema {
        Schema::builder("s", 1)
            .table(
                TableBuilder::new("a")
                    .column("id", DataType::Integer)
                    .column("x", DataType::Integer),
            )
            .table(
                TableBuilder::new("b")
                    .column("id", DataType::Integer)
                    .column("y", DataType::Integer),
            )
            .build()
            .unwrap()
    }

    fn access(table: &str) -> LogicalNode {
        LogicalNode::TableAccess(TableAccessNode {
            table: table.into(),
        })
    }

    #[test]
    fn single_side_conjunct_sinks_below_join() {
        let schema = schema();
        let indices = IndexStore::new(&schema);
        let ctx = PlanContext {
            schema: &schema,
            indices: &indices,
            journal_touched: HashSet::new(),
        };

        let ax = schema.table("a").unwrap().column_handle("x").unwrap();
        let a_id = schema.table("a").unwrap().column_handle("id").unwrap();
        let b_id = schema.table("b").unwrap().column_handle("id").unwrap();

        let plan = LogicalNode::Select(SelectNode {
            input: Box::new(LogicalNode::Join(JoinNode {
                left: Box::new(access("a")),
                right: Box::new(access("b")),
                join_type: JoinType::Inner,
                predicate: Some(a_id.eq_col(&b_id)),
            })),
            predicate: and([ax.gt(5i64), a_id.eq_col(&b_id)]),
        });

        let rewritten = PushdownSelectRule.apply(&plan, &ctx).unwrap().unwrap();
        // The a-only conjunct now sits on the left join input; the
        // cross-side conjunct stays above the join.
        let LogicalNode::Select(top) = &rewritten else {
            panic!("expected residual select on top");
        };
        let LogicalNode::Join(join) = top.input.as_ref() else {
            panic!("expected join under residual select");
        };
        assert!(matches!(join.left.as_ref(), LogicalNode::Select(_)));
        assert!(matches!(join.right.as_ref(), LogicalNode::TableAccess(_)));
    }

    #[test]
    fn select_moves_below_project() {
        let schema = schema();
        let indices = IndexStore::new(&schema);
        let ctx = PlanContext {
            schema: &schema,
            indices: &indices,
            journal_touched: HashSet::new(),
        };
        let ax = schema.table("a").unwrap().column_handle("x").unwrap();

        let plan = LogicalNode::Select(SelectNode {
            input: Box::new(LogicalNode::Project(ProjectNode {
                input: Box::new(access("a")),
                items: vec![ax.clone().into()],
            })),
            predicate: ax.gt(5i64),
        });

        let rewritten = PushdownSelectRule.apply(&plan, &ctx).unwrap().unwrap();
        let LogicalNode::Project(project) = &rewritten else {
            panic!("expected project on top after pushdown");
        };
        assert!(matches!(project.input.as_ref(), LogicalNode::Select(_)));
    }
}
