//! # Query Planner
//!
//! Transforms builder queries into executable operator trees through two
//! phases:
//!
//! 1. **Logical planning** — the query becomes a [`LogicalNode`] tree of
//!    relational operators (`logical`).
//! 2. **Rewrites + physical choice** — the rule-based [`Optimizer`]
//!    applies a fixed order of rewrites (predicate pushdown, clause
//!    merging, join reordering, access-path substitution, empty-relation
//!    pruning), then `physical` emits the [`PhysicalNode`] tree the
//!    executor runs (`rules`, `physical`, `cost`).
//!
//! Access-path decisions consume index cost figures directly from the
//! [`IndexStore`]; the planner carries no separate statistics.

pub mod cost;
pub mod logical;
pub mod physical;
pub mod rules;

pub use logical::{build_logical, LogicalNode};
pub use physical::{build_physical, PhysicalNode};
pub use rules::Optimizer;

use crate::index::IndexStore;
use crate::query::Query;
use crate::schema::Schema;
use eyre::Result;
use hashbrown::HashSet;

/// Everything a planning pass may consult. Borrowed from the engine
/// context for the duration of one (synchronous) planning call.
pub struct PlanContext<'a> {
    pub schema: &'a Schema,
    pub indices: &'a IndexStore,
    /// Tables with pending journal mutations in the executing
    /// transaction. Index access paths are refused for these: the journal
    /// overlay is not index-maintained until commit, so an index scan
    /// would miss uncommitted rows.
    pub journal_touched: HashSet<String>,
}

/// Full pipeline: logical plan, rewrites, physical plan.
pub fn plan_query(query: &Query, ctx: &PlanContext<'_>) -> Result<PhysicalNode> {
    let logical = build_logical(query);
    let optimized = Optimizer::new().optimize(logical, ctx)?;
    build_physical(&optimized, ctx)
}

/// The unoptimized pipeline; plan-equivalence tests compare its results
/// against [`plan_query`].
pub fn plan_query_unoptimized(query: &Query, ctx: &PlanContext<'_>) -> Result<PhysicalNode> {
    let logical = build_logical(query);
    build_physical(&logical, ctx)
}
