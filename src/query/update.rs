//! UPDATE builder.

use super::{Query, UpdateQuery};
use crate::context::Context;
use crate::error::syntax;
use crate::predicate::Predicate;
use crate::relation::Relation;
use crate::schema::Column;
use crate::txn::Transaction;
use crate::types::Value;
use eyre::Result;
use std::sync::Arc;

pub struct UpdateBuilder {
    ctx: Arc<Context>,
    table: String,
    assignments: Vec<(Column, Value)>,
    filter: Option<Predicate>,
}

impl std::fmt::Debug for UpdateBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateBuilder")
            .field("table", &self.table)
            .field("assignments", &self.assignments)
            .field("filter", &self.filter)
            .finish()
    }
}

impl UpdateBuilder {
    pub(crate) fn new(ctx: Arc<Context>, table: &str) -> Self {
        Self {
            ctx,
            table: table.to_string(),
            assignments: Vec::new(),
            filter: None,
        }
    }

    pub fn set(mut self, column: Column, value: impl Into<Value>) -> Result<Self> {
        if column.table() != self.table {
            return Err(syntax(format!(
                "set() column '{}' does not belong to table '{}'",
                column.qualified_name(),
                self.table
            )));
        }
        self.assignments.push((column, value.into()));
        Ok(self)
    }

    pub fn where_(mut self, predicate: Predicate) -> Result<Self> {
        if self.filter.is_some() {
            return Err(syntax("where_() may only be called once"));
        }
        self.filter = Some(predicate);
        Ok(self)
    }

    pub fn into_query(self) -> Result<Query> {
        self.ctx.schema().table(&self.table)?;
        if self.assignments.is_empty() {
            return Err(syntax("update requires at least one set()"));
        }
        Ok(Query::Update(UpdateQuery {
            table: self.table,
            assignments: self.assignments,
            filter: self.filter,
        }))
    }

    pub async fn exec(self) -> Result<Relation> {
        let ctx = self.ctx.clone();
        let query = self.into_query()?;
        let mut results = Transaction::new(ctx).exec(vec![query]).await?;
        Ok(results.pop().unwrap_or_else(Relation::empty))
    }
}
