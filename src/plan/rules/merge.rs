//! Clause merging.
//!
//! Collapses stacked `Select` nodes into one conjunction and nested
//! `Project` nodes into the outer projection when the outer list is a
//! subset of the inner one (the only composition the builder can
//! produce). Runs after pushdown so the stacks it sees are final.

use super::{transform_up, RewriteRule};
use crate::plan::logical::{LogicalNode, ProjectNode, SelectNode};
use crate::plan::PlanContext;
use crate::predicate::and;
use crate::query::ProjectItem;
use eyre::Result;

pub struct MergeRule;

impl RewriteRule for MergeRule {
    fn name(&self) -> &'static str {
        "merge-clauses"
    }

    fn apply(&self, node: &LogicalNode, ctx: &PlanContext<'_>) -> Result<Option<LogicalNode>> {
        let _ = ctx;
        transform_up(node, &|n| Ok(merge_one(n)))
    }
}

fn merge_one(node: &LogicalNode) -> Option<LogicalNode> {
    match node {
        LogicalNode::Select(outer) => {
            let LogicalNode::Select(inner) = outer.input.as_ref() else {
                return None;
            };
            Some(LogicalNode::Select(SelectNode {
                input: inner.input.clone(),
                predicate: and([inner.predicate.clone(), outer.predicate.clone()]),
            }))
        }
        LogicalNode::Project(outer) => {
            let LogicalNode::Project(inner) = outer.input.as_ref() else {
                return None;
            };
            if projects_subset(&outer.items, &inner.items) {
                Some(LogicalNode::Project(ProjectNode {
                    input: inner.input.clone(),
                    items: outer.items.clone(),
                }))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// The outer projection composes with the inner one only when every
/// outer item is produced verbatim by the inner list; aggregates never
/// compose (the inner aggregation changes cardinality).
fn projects_subset(outer: &[ProjectItem], inner: &[ProjectItem]) -> bool {
    outer.iter().all(|item| match item {
        ProjectItem::Column(_) => inner.contains(item),
        ProjectItem::Aggregate(_) => false,
    })
}
