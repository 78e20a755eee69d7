//! SELECT builder.

use super::{
    AggregateKind, JoinSpec, JoinType, Order, ProjectItem, Query, SelectQuery, SetOpKind, SortSpec,
};
use crate::context::Context;
use crate::error::syntax;
use crate::predicate::Predicate;
use crate::relation::Relation;
use crate::schema::Column;
use crate::txn::Transaction;
use eyre::Result;
use std::sync::Arc;

pub struct SelectBuilder {
    ctx: Arc<Context>,
    query: SelectQuery,
}

impl std::fmt::Debug for SelectBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectBuilder")
            .field("query", &self.query)
            .finish()
    }
}

impl SelectBuilder {
    pub(crate) fn new(ctx: Arc<Context>, items: Vec<ProjectItem>) -> Self {
        Self {
            ctx,
            query: SelectQuery {
                items,
                ..SelectQuery::default()
            },
        }
    }

    pub fn from(mut self, table: &str) -> Result<Self> {
        if self.query.from.is_some() {
            return Err(syntax("from() may only be called once"));
        }
        self.ctx.schema().table(table)?;
        self.query.from = Some(table.to_string());
        Ok(self)
    }

    pub fn where_(mut self, predicate: Predicate) -> Result<Self> {
        if self.query.filter.is_some() {
            return Err(syntax("where_() may only be called once"));
        }
        self.query.filter = Some(predicate);
        Ok(self)
    }

    pub fn inner_join(self, table: &str, predicate: Predicate) -> Result<Self> {
        self.join(table, JoinType::Inner, predicate)
    }

    pub fn left_outer_join(self, table: &str, predicate: Predicate) -> Result<Self> {
        self.join(table, JoinType::LeftOuter, predicate)
    }

    fn join(mut self, table: &str, join_type: JoinType, predicate: Predicate) -> Result<Self> {
        self.ctx.schema().table(table)?;
        self.query.joins.push(JoinSpec {
            table: table.to_string(),
            join_type,
            predicate,
        });
        Ok(self)
    }

    pub fn group_by(mut self, columns: impl IntoIterator<Item = Column>) -> Result<Self> {
        if !self.query.group_by.is_empty() {
            return Err(syntax("group_by() may only be called once"));
        }
        self.query.group_by = columns.into_iter().collect();
        if self.query.group_by.is_empty() {
            return Err(syntax("group_by() requires at least one column"));
        }
        Ok(self)
    }

    pub fn order_by(mut self, column: Column, order: Order) -> Self {
        self.query.order_by.push(SortSpec { column, order });
        self
    }

    pub fn limit(mut self, count: usize) -> Result<Self> {
        if self.query.limit.is_some() {
            return Err(syntax("limit() may only be called once"));
        }
        self.query.limit = Some(count);
        Ok(self)
    }

    pub fn skip(mut self, count: usize) -> Result<Self> {
        if self.query.skip.is_some() {
            return Err(syntax("skip() may only be called once"));
        }
        self.query.skip = Some(count);
        Ok(self)
    }

    pub fn union(self, other: SelectBuilder) -> Result<Self> {
        self.compound(SetOpKind::Union, other)
    }

    pub fn intersect(self, other: SelectBuilder) -> Result<Self> {
        self.compound(SetOpKind::Intersect, other)
    }

    pub fn except(self, other: SelectBuilder) -> Result<Self> {
        self.compound(SetOpKind::Except, other)
    }

    fn compound(mut self, kind: SetOpKind, other: SelectBuilder) -> Result<Self> {
        let sub = other.into_select_query()?;
        self.query.compound.push((kind, sub));
        Ok(self)
    }

    /// Clause-completeness and aggregate-shape validation; produces the
    /// planner's input.
    pub fn into_query(self) -> Result<Query> {
        Ok(Query::Select(self.into_select_query()?))
    }

    fn into_select_query(self) -> Result<SelectQuery> {
        let query = self.query;
        if query.from.is_none() {
            return Err(syntax("select requires from()"));
        }

        let aggregates: Vec<_> = query
            .items
            .iter()
            .filter_map(|item| match item {
                ProjectItem::Aggregate(f) => Some(f),
                ProjectItem::Column(_) => None,
            })
            .collect();

        if aggregates.iter().any(|f| f.kind == AggregateKind::Distinct) && query.items.len() > 1 {
            return Err(syntax("distinct() must be the only projected item"));
        }

        if !aggregates.is_empty() {
            // Plain projected columns must be grouping columns.
            for item in &query.items {
                if let ProjectItem::Column(col) = item {
                    let grouped = query
                        .group_by
                        .iter()
                        .any(|g| g.table() == col.table() && g.name() == col.name());
                    if !grouped {
                        return Err(syntax(format!(
                            "column '{}' must appear in group_by() when aggregates are projected",
                            col.qualified_name()
                        )));
                    }
                }
            }
        }

        Ok(query)
    }

    /// Runs the query in an implicit single-query transaction.
    pub async fn exec(self) -> Result<Relation> {
        let ctx = self.ctx.clone();
        let query = self.into_query()?;
        let mut results = Transaction::new(ctx).exec(vec![query]).await?;
        Ok(results.pop().unwrap_or_else(Relation::empty))
    }
}
