//! # Rewrite Rules
//!
//! The optimizer applies one category of rewrite per rule, in a fixed
//! order matched to the semantics each rule assumes of its predecessors:
//!
//! 1. [`PushdownSelectRule`] — move filters below projections and toward
//!    the join side that owns their columns.
//! 2. [`MergeRule`] — collapse stacked `Select`s into a conjunction and
//!    nested `Project`s into one.
//! 3. [`JoinReorderRule`] — left-deep greedy reorder of inner joins by
//!    estimated cardinality.
//! 4. [`PrimaryKeyLookupRule`] — `TableAccess + Select(pk = literal)`
//!    becomes a point lookup.
//! 5. [`IndexScanRule`] — range-expressible filters over indexed columns
//!    become index scans, chosen by minimum cost.
//! 6. [`EmptyPruneRule`] — subtrees reducible to the empty relation
//!    collapse to the `Empty` leaf.
//!
//! Rules are individually idempotent; the driver loops them to a fixed
//! point with an iteration ceiling as a guard against oscillation bugs.

mod empty_prune;
mod index_selection;
mod join_reorder;
mod merge;
mod pushdown;

pub use empty_prune::EmptyPruneRule;
pub use index_selection::{IndexScanRule, PrimaryKeyLookupRule};
pub use join_reorder::JoinReorderRule;
pub use merge::MergeRule;
pub use pushdown::PushdownSelectRule;

use super::logical::{JoinNode, LogicalNode, SetOpNode};
use super::PlanContext;
use crate::config::OPTIMIZER_MAX_ITERATIONS;
use eyre::Result;
use tracing::{debug, warn};

pub trait RewriteRule {
    fn name(&self) -> &'static str;

    /// Returns the rewritten tree, or `None` when the rule does not
    /// apply anywhere in it.
    fn apply(&self, node: &LogicalNode, ctx: &PlanContext<'_>) -> Result<Option<LogicalNode>>;
}

pub struct Optimizer {
    rules: Vec<Box<dyn RewriteRule + Send + Sync>>,
    max_iterations: usize,
}

impl Optimizer {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(PushdownSelectRule),
                Box::new(MergeRule),
                Box::new(JoinReorderRule),
                Box::new(PrimaryKeyLookupRule),
                Box::new(IndexScanRule),
                Box::new(EmptyPruneRule),
            ],
            max_iterations: OPTIMIZER_MAX_ITERATIONS,
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn RewriteRule + Send + Sync>>) -> Self {
        Self {
            rules,
            max_iterations: OPTIMIZER_MAX_ITERATIONS,
        }
    }

    pub fn optimize(&self, plan: LogicalNode, ctx: &PlanContext<'_>) -> Result<LogicalNode> {
        let mut current = plan;
        for iteration in 0..self.max_iterations {
            let mut changed = false;
            for rule in &self.rules {
                if let Some(rewritten) = rule.apply(&current, ctx)? {
                    debug!(rule = rule.name(), iteration, "rewrite applied");
                    current = rewritten;
                    changed = true;
                }
            }
            if !changed {
                return Ok(current);
            }
        }
        warn!(
            max_iterations = self.max_iterations,
            "optimizer hit its iteration ceiling; returning the current plan"
        );
        Ok(current)
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Bottom-up traversal helper shared by the rules: rewrites children
/// first, then offers the (possibly rebuilt) node to `f`. Returns `None`
/// when nothing changed anywhere in the subtree.
pub(crate) fn transform_up<F>(node: &LogicalNode, f: &F) -> Result<Option<LogicalNode>>
where
    F: Fn(&LogicalNode) -> Result<Option<LogicalNode>>,
{
    let rebuilt = rebuild_children(node, f)?;
    let target = rebuilt.as_ref().unwrap_or(node);
    match f(target)? {
        Some(new_node) => Ok(Some(new_node)),
        None => Ok(rebuilt),
    }
}

fn rebuild_children<F>(node: &LogicalNode, f: &F) -> Result<Option<LogicalNode>>
where
    F: Fn(&LogicalNode) -> Result<Option<LogicalNode>>,
{
    macro_rules! one_child {
        ($variant:ident, $node:expr) => {{
            match transform_up(&$node.input, f)? {
                Some(input) => Ok(Some(LogicalNode::$variant({
                    let mut n = $node.clone();
                    n.input = Box::new(input);
                    n
                }))),
                None => Ok(None),
            }
        }};
    }

    match node {
        LogicalNode::Select(n) => one_child!(Select, n),
        LogicalNode::Project(n) => one_child!(Project, n),
        LogicalNode::GroupBy(n) => one_child!(GroupBy, n),
        LogicalNode::Aggregation(n) => one_child!(Aggregation, n),
        LogicalNode::OrderBy(n) => one_child!(OrderBy, n),
        LogicalNode::Skip(n) => one_child!(Skip, n),
        LogicalNode::Limit(n) => one_child!(Limit, n),
        LogicalNode::Join(n) => {
            let left = transform_up(&n.left, f)?;
            let right = transform_up(&n.right, f)?;
            if left.is_none() && right.is_none() {
                return Ok(None);
            }
            Ok(Some(LogicalNode::Join(JoinNode {
                left: Box::new(left.unwrap_or_else(|| (*n.left).clone())),
                right: Box::new(right.unwrap_or_else(|| (*n.right).clone())),
                join_type: n.join_type,
                predicate: n.predicate.clone(),
            })))
        }
        LogicalNode::SetOp(n) => {
            let mut changed = false;
            let mut children = Vec::with_capacity(n.children.len());
            for child in &n.children {
                match transform_up(child, f)? {
                    Some(new_child) => {
                        changed = true;
                        children.push(new_child);
                    }
                    None => children.push(child.clone()),
                }
            }
            if changed {
                Ok(Some(LogicalNode::SetOp(SetOpNode {
                    kind: n.kind,
                    children,
                })))
            } else {
                Ok(None)
            }
        }
        // Leaves and DML roots have no relational children to rewrite.
        _ => Ok(None),
    }
}
