//! Physical operators.
//!
//! Physical nodes pin the execution strategy the executor runs: access
//! paths chosen by the rewrite rules map to scan leaves, joins pick
//! between hash and nested-loop, and the `GroupBy`/`Aggregation` pair
//! fuses into one grouping operator. Conversion is mechanical; every
//! cost-based decision has already been taken on the logical tree,
//! except the join-algorithm choice which needs both children's
//! cardinalities and so happens here.

use super::cost::estimated_cardinality;
use super::logical::LogicalNode;
use super::PlanContext;
use crate::config::HASH_JOIN_BUILD_THRESHOLD;
use crate::encoding::{Key, KeyRange};
use crate::predicate::{and, Predicate};
use crate::query::{AggregateFn, JoinType, ProjectItem, SetOpKind, SortSpec};
use crate::row::Row;
use crate::schema::Column;
use crate::types::Value;
use eyre::Result;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalNode {
    TableScan(PhysicalTableScan),
    IndexScan(PhysicalIndexScan),
    PrimaryKeyLookup(PhysicalPrimaryKeyLookup),
    Filter(PhysicalFilter),
    Project(PhysicalProject),
    NestedLoopJoin(PhysicalNestedLoopJoin),
    HashJoin(PhysicalHashJoin),
    Sort(PhysicalSort),
    Skip(PhysicalSkip),
    Limit(PhysicalLimit),
    GroupAggregate(PhysicalGroupAggregate),
    SetOp(PhysicalSetOp),
    Insert(PhysicalInsert),
    Update(PhysicalUpdate),
    Delete(PhysicalDelete),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalTableScan {
    pub table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalIndexScan {
    pub table: String,
    pub index: String,
    pub range: KeyRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalPrimaryKeyLookup {
    pub table: String,
    pub key: Key,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalFilter {
    pub input: Box<PhysicalNode>,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalProject {
    pub input: Box<PhysicalNode>,
    pub items: Vec<ProjectItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalNestedLoopJoin {
    pub left: Box<PhysicalNode>,
    pub right: Box<PhysicalNode>,
    pub join_type: JoinType,
    pub predicate: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalHashJoin {
    pub left: Box<PhysicalNode>,
    pub right: Box<PhysicalNode>,
    /// Hash key column on the left (build) side.
    pub left_column: Column,
    /// Hash key column on the right (probe) side.
    pub right_column: Column,
    /// Equi-join conjuncts beyond the hash pair, evaluated on matches.
    pub residual: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalSort {
    pub input: Box<PhysicalNode>,
    pub keys: Vec<SortSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalSkip {
    pub input: Box<PhysicalNode>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalLimit {
    pub input: Box<PhysicalNode>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalGroupAggregate {
    pub input: Box<PhysicalNode>,
    pub group_columns: Vec<Column>,
    pub aggregates: Vec<AggregateFn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalSetOp {
    pub kind: SetOpKind,
    pub children: Vec<PhysicalNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalInsert {
    pub table: String,
    pub rows: Vec<Row>,
    pub or_replace: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalUpdate {
    pub table: String,
    pub assignments: Vec<(Column, Value)>,
    pub filter: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalDelete {
    pub table: String,
    pub filter: Option<Predicate>,
}

/// Emits the physical tree for an optimized (or deliberately raw)
/// logical tree.
pub fn build_physical(node: &LogicalNode, ctx: &PlanContext<'_>) -> Result<PhysicalNode> {
    Ok(match node {
        LogicalNode::TableAccess(n) => PhysicalNode::TableScan(PhysicalTableScan {
            table: n.table.clone(),
        }),
        LogicalNode::IndexScan(n) => PhysicalNode::IndexScan(PhysicalIndexScan {
            table: n.table.clone(),
            index: n.index.clone(),
            range: n.range.clone(),
        }),
        LogicalNode::PrimaryKeyLookup(n) => {
            PhysicalNode::PrimaryKeyLookup(PhysicalPrimaryKeyLookup {
                table: n.table.clone(),
                key: n.key.clone(),
            })
        }
        LogicalNode::Select(n) => PhysicalNode::Filter(PhysicalFilter {
            input: Box::new(build_physical(&n.input, ctx)?),
            predicate: n.predicate.clone(),
        }),
        LogicalNode::Project(n) => PhysicalNode::Project(PhysicalProject {
            input: Box::new(build_physical(&n.input, ctx)?),
            items: n.items.clone(),
        }),
        LogicalNode::Join(n) => build_join(n, ctx)?,
        LogicalNode::GroupBy(n) => PhysicalNode::GroupAggregate(PhysicalGroupAggregate {
            input: Box::new(build_physical(&n.input, ctx)?),
            group_columns: n.columns.clone(),
            aggregates: Vec::new(),
        }),
        LogicalNode::Aggregation(n) => match n.input.as_ref() {
            LogicalNode::GroupBy(group) => {
                PhysicalNode::GroupAggregate(PhysicalGroupAggregate {
                    input: Box::new(build_physical(&group.input, ctx)?),
                    group_columns: group.columns.clone(),
                    aggregates: n.aggregates.clone(),
                })
            }
            other => PhysicalNode::GroupAggregate(PhysicalGroupAggregate {
                input: Box::new(build_physical(other, ctx)?),
                group_columns: Vec::new(),
                aggregates: n.aggregates.clone(),
            }),
        },
        LogicalNode::OrderBy(n) => PhysicalNode::Sort(PhysicalSort {
            input: Box::new(build_physical(&n.input, ctx)?),
            keys: n.keys.clone(),
        }),
        LogicalNode::Skip(n) => PhysicalNode::Skip(PhysicalSkip {
            input: Box::new(build_physical(&n.input, ctx)?),
            count: n.count,
        }),
        LogicalNode::Limit(n) => PhysicalNode::Limit(PhysicalLimit {
            input: Box::new(build_physical(&n.input, ctx)?),
            count: n.count,
        }),
        LogicalNode::SetOp(n) => {
            let children = n
                .children
                .iter()
                .map(|c| build_physical(c, ctx))
                .collect::<Result<Vec<_>>>()?;
            PhysicalNode::SetOp(PhysicalSetOp {
                kind: n.kind,
                children,
            })
        }
        LogicalNode::InsertValues(n) => PhysicalNode::Insert(PhysicalInsert {
            table: n.table.clone(),
            rows: n.rows.clone(),
            or_replace: n.or_replace,
        }),
        LogicalNode::Update(n) => PhysicalNode::Update(PhysicalUpdate {
            table: n.table.clone(),
            assignments: n.assignments.clone(),
            filter: n.filter.clone(),
        }),
        LogicalNode::Delete(n) => PhysicalNode::Delete(PhysicalDelete {
            table: n.table.clone(),
            filter: n.filter.clone(),
        }),
        LogicalNode::Empty => PhysicalNode::Empty,
    })
}

fn build_join(
    join: &crate::plan::logical::JoinNode,
    ctx: &PlanContext<'_>,
) -> Result<PhysicalNode> {
    let left = Box::new(build_physical(&join.left, ctx)?);
    let right = Box::new(build_physical(&join.right, ctx)?);

    if join.join_type == JoinType::Inner {
        if let Some(predicate) = &join.predicate {
            if let Some((build_col, probe_col, residual)) =
                hash_join_shape(predicate, &join.left)
            {
                let build_cardinality = estimated_cardinality(&join.left, ctx)
                    .min(estimated_cardinality(&join.right, ctx));
                if build_cardinality <= HASH_JOIN_BUILD_THRESHOLD {
                    debug!(
                        left = %build_col.qualified_name(),
                        right = %probe_col.qualified_name(),
                        "selecting hash join"
                    );
                    return Ok(PhysicalNode::HashJoin(PhysicalHashJoin {
                        left,
                        right,
                        left_column: build_col,
                        right_column: probe_col,
                        residual,
                    }));
                }
            }
        }
    }

    Ok(PhysicalNode::NestedLoopJoin(PhysicalNestedLoopJoin {
        left,
        right,
        join_type: join.join_type,
        predicate: join.predicate.clone(),
    }))
}

/// Hash-joinable shape: every conjunct is a column equality with one
/// side in the left subtree and the other in the right. The first pair
/// becomes the hash key; the rest stay as a residual equality filter.
fn hash_join_shape(
    predicate: &Predicate,
    left: &LogicalNode,
) -> Option<(Column, Column, Option<Predicate>)> {
    let left_tables = left.source_tables();
    let mut pairs = Vec::new();
    for conjunct in predicate.conjuncts() {
        let (a, b) = conjunct.as_equi_join()?;
        if left_tables.contains(a.table()) && !left_tables.contains(b.table()) {
            pairs.push((a.clone(), b.clone()));
        } else if left_tables.contains(b.table()) && !left_tables.contains(a.table()) {
            pairs.push((b.clone(), a.clone()));
        } else {
            return None;
        }
    }
    let (build, probe) = pairs.first()?.clone();
    let residual = if pairs.len() > 1 {
        Some(and(pairs[1..].iter().map(|(l, r)| l.eq_col(r))))
    } else {
        None
    };
    Some((build, probe, residual))
}
