//! # Query Model and Builder DSL
//!
//! The public query surface: typed fluent builders producing the `Query`
//! values the planner consumes. Builder methods are fallible and check
//! fluent-call legality at call time — a doubled `into()` or `values()`
//! is a SYNTAX error at the call site, not at `exec()`. `exec()` checks
//! clause completeness (SYNTAX) and the semantic preconditions listed in
//! the error design (CONSTRAINT), then runs the query in an implicit
//! single-query transaction.
//!
//! ```ignore
//! let adults = db
//!     .select([users.column_handle("name")?.into()])
//!     .from("users")?
//!     .where_(users.column_handle("age")?.gte(21i64))?
//!     .order_by(users.column_handle("name")?, Order::Asc)
//!     .exec()
//!     .await?;
//! ```

mod delete;
mod insert;
mod select;
mod update;

pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use select::SelectBuilder;
pub use update::UpdateBuilder;

use crate::predicate::Predicate;
use crate::row::Row;
use crate::schema::Column;
use crate::types::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Distinct,
    Stddev,
    Geomean,
}

impl AggregateKind {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Count => "count",
            AggregateKind::Sum => "sum",
            AggregateKind::Avg => "avg",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
            AggregateKind::Distinct => "distinct",
            AggregateKind::Stddev => "stddev",
            AggregateKind::Geomean => "geomean",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateFn {
    pub kind: AggregateKind,
    pub column: Column,
    pub alias: Option<String>,
}

impl AggregateFn {
    pub fn new(kind: AggregateKind, column: Column) -> Self {
        Self {
            kind,
            column,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The flat slot the aggregation operator writes its result to, and
    /// the name the projection exposes absent an alias.
    pub fn slot_name(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => format!("{}({})", self.kind.name(), self.column.qualified_name()),
        }
    }
}

/// Aggregate constructors for the select list.
pub mod agg {
    use super::{AggregateFn, AggregateKind};
    use crate::schema::Column;

    macro_rules! agg_ctor {
        ($name:ident, $kind:ident) => {
            pub fn $name(column: Column) -> AggregateFn {
                AggregateFn::new(AggregateKind::$kind, column)
            }
        };
    }

    agg_ctor!(count, Count);
    agg_ctor!(sum, Sum);
    agg_ctor!(avg, Avg);
    agg_ctor!(min, Min);
    agg_ctor!(max, Max);
    agg_ctor!(distinct, Distinct);
    agg_ctor!(stddev, Stddev);
    agg_ctor!(geomean, Geomean);
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectItem {
    Column(Column),
    Aggregate(AggregateFn),
}

impl From<Column> for ProjectItem {
    fn from(column: Column) -> Self {
        ProjectItem::Column(column)
    }
}

impl From<AggregateFn> for ProjectItem {
    fn from(f: AggregateFn) -> Self {
        ProjectItem::Aggregate(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub table: String,
    pub join_type: JoinType,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub column: Column,
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    pub items: Vec<ProjectItem>,
    pub from: Option<String>,
    pub joins: Vec<JoinSpec>,
    pub filter: Option<Predicate>,
    pub group_by: Vec<Column>,
    pub order_by: Vec<SortSpec>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub compound: Vec<(SetOpKind, SelectQuery)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    pub table: String,
    pub rows: Vec<Row>,
    pub or_replace: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    pub table: String,
    pub assignments: Vec<(Column, Value)>,
    pub filter: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    pub table: String,
    pub filter: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Select(SelectQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
}

impl Query {
    /// Tables the query reads. Lock scope; lexicographically ordered.
    pub fn read_tables(&self) -> BTreeSet<String> {
        match self {
            Query::Select(q) => q.scanned_tables(),
            Query::Insert(_) => BTreeSet::new(),
            Query::Update(q) => [q.table.clone()].into_iter().collect(),
            Query::Delete(q) => [q.table.clone()].into_iter().collect(),
        }
    }

    /// Tables the query mutates.
    pub fn write_tables(&self) -> BTreeSet<String> {
        match self {
            Query::Select(_) => BTreeSet::new(),
            Query::Insert(q) => [q.table.clone()].into_iter().collect(),
            Query::Update(q) => [q.table.clone()].into_iter().collect(),
            Query::Delete(q) => [q.table.clone()].into_iter().collect(),
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Query::Select(_))
    }
}

impl SelectQuery {
    fn scanned_tables(&self) -> BTreeSet<String> {
        let mut tables = BTreeSet::new();
        if let Some(from) = &self.from {
            tables.insert(from.clone());
        }
        for join in &self.joins {
            tables.insert(join.table.clone());
        }
        for (_, sub) in &self.compound {
            tables.extend(sub.scanned_tables());
        }
        tables
    }
}
