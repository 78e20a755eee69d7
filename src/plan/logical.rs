//! Logical plan nodes.
//!
//! The logical tree mirrors relational semantics, not execution strategy:
//! `TableAccess` leaves, `Select`/`Project`/`Join`/`GroupBy`/`Aggregation`
//! interior nodes, ordering and pagination on top, and DML roots for
//! INSERT/UPDATE/DELETE. Rewrite rules replace `TableAccess + Select`
//! stacks with the access-path leaves `PrimaryKeyLookup` and `IndexScan`;
//! `Empty` is the empty-relation short circuit.

use crate::encoding::{Key, KeyRange};
use crate::predicate::Predicate;
use crate::query::{
    AggregateFn, JoinSpec, JoinType, ProjectItem, Query, SelectQuery, SetOpKind, SortSpec,
};
use crate::row::Row;
use crate::schema::Column;
use crate::types::Value;
use hashbrown::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub enum LogicalNode {
    TableAccess(TableAccessNode),
    Select(SelectNode),
    Project(ProjectNode),
    Join(JoinNode),
    GroupBy(GroupByNode),
    Aggregation(AggregationNode),
    OrderBy(OrderByNode),
    Skip(SkipNode),
    Limit(LimitNode),
    SetOp(SetOpNode),
    PrimaryKeyLookup(PrimaryKeyLookupNode),
    IndexScan(IndexScanNode),
    InsertValues(InsertValuesNode),
    Update(UpdateNode),
    Delete(DeleteNode),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableAccessNode {
    pub table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectNode {
    pub input: Box<LogicalNode>,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectNode {
    pub input: Box<LogicalNode>,
    pub items: Vec<ProjectItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinNode {
    pub left: Box<LogicalNode>,
    pub right: Box<LogicalNode>,
    pub join_type: JoinType,
    pub predicate: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupByNode {
    pub input: Box<LogicalNode>,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationNode {
    pub input: Box<LogicalNode>,
    pub aggregates: Vec<AggregateFn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByNode {
    pub input: Box<LogicalNode>,
    pub keys: Vec<SortSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkipNode {
    pub input: Box<LogicalNode>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LimitNode {
    pub input: Box<LogicalNode>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetOpNode {
    pub kind: SetOpKind,
    pub children: Vec<LogicalNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKeyLookupNode {
    pub table: String,
    pub key: Key,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexScanNode {
    pub table: String,
    pub index: String,
    pub range: KeyRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertValuesNode {
    pub table: String,
    pub rows: Vec<Row>,
    pub or_replace: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateNode {
    pub table: String,
    pub assignments: Vec<(Column, Value)>,
    pub filter: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteNode {
    pub table: String,
    pub filter: Option<Predicate>,
}

impl LogicalNode {
    /// Source tables feeding this subtree; pushdown legality checks run
    /// on it.
    pub fn source_tables(&self) -> HashSet<String> {
        let mut tables = HashSet::new();
        self.collect_tables(&mut tables);
        tables
    }

    fn collect_tables(&self, out: &mut HashSet<String>) {
        match self {
            LogicalNode::TableAccess(n) => {
                out.insert(n.table.clone());
            }
            LogicalNode::PrimaryKeyLookup(n) => {
                out.insert(n.table.clone());
            }
            LogicalNode::IndexScan(n) => {
                out.insert(n.table.clone());
            }
            LogicalNode::Select(n) => n.input.collect_tables(out),
            LogicalNode::Project(n) => n.input.collect_tables(out),
            LogicalNode::GroupBy(n) => n.input.collect_tables(out),
            LogicalNode::Aggregation(n) => n.input.collect_tables(out),
            LogicalNode::OrderBy(n) => n.input.collect_tables(out),
            LogicalNode::Skip(n) => n.input.collect_tables(out),
            LogicalNode::Limit(n) => n.input.collect_tables(out),
            LogicalNode::Join(n) => {
                n.left.collect_tables(out);
                n.right.collect_tables(out);
            }
            LogicalNode::SetOp(n) => {
                for child in &n.children {
                    child.collect_tables(out);
                }
            }
            LogicalNode::InsertValues(n) => {
                out.insert(n.table.clone());
            }
            LogicalNode::Update(n) => {
                out.insert(n.table.clone());
            }
            LogicalNode::Delete(n) => {
                out.insert(n.table.clone());
            }
            LogicalNode::Empty => {}
        }
    }
}

/// Builds the logical tree for a query. Pure structural translation; all
/// optimization is left to the rewrite rules.
pub fn build_logical(query: &Query) -> LogicalNode {
    match query {
        Query::Select(select) => build_select(select),
        Query::Insert(insert) => LogicalNode::InsertValues(InsertValuesNode {
            table: insert.table.clone(),
            rows: insert.rows.clone(),
            or_replace: insert.or_replace,
        }),
        Query::Update(update) => LogicalNode::Update(UpdateNode {
            table: update.table.clone(),
            assignments: update.assignments.clone(),
            filter: update.filter.clone(),
        }),
        Query::Delete(delete) => LogicalNode::Delete(DeleteNode {
            table: delete.table.clone(),
            filter: delete.filter.clone(),
        }),
    }
}

fn build_select(query: &SelectQuery) -> LogicalNode {
    let from = query.from.as_deref().unwrap_or_default();
    let mut node = LogicalNode::TableAccess(TableAccessNode {
        table: from.to_string(),
    });

    for JoinSpec {
        table,
        join_type,
        predicate,
    } in &query.joins
    {
        node = LogicalNode::Join(JoinNode {
            left: Box::new(node),
            right: Box::new(LogicalNode::TableAccess(TableAccessNode {
                table: table.clone(),
            })),
            join_type: *join_type,
            predicate: Some(predicate.clone()),
        });
    }

    if let Some(filter) = &query.filter {
        node = LogicalNode::Select(SelectNode {
            input: Box::new(node),
            predicate: filter.clone(),
        });
    }

    let aggregates: Vec<AggregateFn> = query
        .items
        .iter()
        .filter_map(|item| match item {
            ProjectItem::Aggregate(f) => Some(f.clone()),
            ProjectItem::Column(_) => None,
        })
        .collect();

    if !query.group_by.is_empty() {
        node = LogicalNode::GroupBy(GroupByNode {
            input: Box::new(node),
            columns: query.group_by.clone(),
        });
    }
    if !aggregates.is_empty() {
        node = LogicalNode::Aggregation(AggregationNode {
            input: Box::new(node),
            aggregates,
        });
    }

    if !query.order_by.is_empty() {
        node = LogicalNode::OrderBy(OrderByNode {
            input: Box::new(node),
            keys: query.order_by.clone(),
        });
    }
    if let Some(count) = query.skip {
        node = LogicalNode::Skip(SkipNode {
            input: Box::new(node),
            count,
        });
    }
    if let Some(count) = query.limit {
        node = LogicalNode::Limit(LimitNode {
            input: Box::new(node),
            count,
        });
    }

    if !query.items.is_empty() {
        node = LogicalNode::Project(ProjectNode {
            input: Box::new(node),
            items: query.items.clone(),
        });
    }

    for (kind, sub) in &query.compound {
        node = LogicalNode::SetOp(SetOpNode {
            kind: *kind,
            children: vec![node, build_select(sub)],
        });
    }

    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SelectQuery;

    fn select_from(table: &str) -> SelectQuery {
        SelectQuery {
            from: Some(table.to_string()),
            ..SelectQuery::default()
        }
    }

    #[test]
    fn bare_select_is_table_access() {
        let query = Query::Select(select_from("users"));
        let node = build_logical(&query);
        assert!(matches!(
            node,
            LogicalNode::TableAccess(TableAccessNode { ref table }) if table == "users"
        ));
    }

    #[test]
    fn clause_stacking_order() {
        let mut q = select_from("users");
        q.limit = Some(10);
        q.skip = Some(5);
        let node = build_logical(&Query::Select(q));
        // Limit sits above Skip so skip applies first at execution.
        let LogicalNode::Limit(limit) = node else {
            panic!("expected limit on top");
        };
        assert!(matches!(*limit.input, LogicalNode::Skip(_)));
    }

    #[test]
    fn source_tables_unions_join_sides() {
        use crate::predicate::Predicate;
        use crate::query::JoinType;
        let join = LogicalNode::Join(JoinNode {
            left: Box::new(LogicalNode::TableAccess(TableAccessNode {
                table: "a".into(),
            })),
            right: Box::new(LogicalNode::TableAccess(TableAccessNode {
                table: "b".into(),
            })),
            join_type: JoinType::Inner,
            predicate: None::<Predicate>,
        });
        let tables = join.source_tables();
        assert!(tables.contains("a") && tables.contains("b"));
    }
}
