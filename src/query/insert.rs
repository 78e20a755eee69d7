//! INSERT builder.

use super::{InsertQuery, Query};
use crate::context::Context;
use crate::error::{constraint, syntax};
use crate::relation::Relation;
use crate::row::Row;
use crate::txn::Transaction;
use eyre::Result;
use std::sync::Arc;

pub struct InsertBuilder {
    ctx: Arc<Context>,
    table: Option<String>,
    rows: Option<Vec<Row>>,
    or_replace: bool,
}

impl std::fmt::Debug for InsertBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsertBuilder")
            .field("table", &self.table)
            .field("rows", &self.rows)
            .field("or_replace", &self.or_replace)
            .finish()
    }
}

impl InsertBuilder {
    pub(crate) fn new(ctx: Arc<Context>, or_replace: bool) -> Self {
        Self {
            ctx,
            table: None,
            rows: None,
            or_replace,
        }
    }

    pub fn into(mut self, table: &str) -> Result<Self> {
        if self.table.is_some() {
            return Err(syntax("into() may only be called once"));
        }
        self.ctx.schema().table(table)?;
        self.table = Some(table.to_string());
        Ok(self)
    }

    pub fn values(mut self, rows: Vec<Row>) -> Result<Self> {
        if self.rows.is_some() {
            return Err(syntax("values() may only be called once"));
        }
        self.rows = Some(rows);
        Ok(self)
    }

    pub fn into_query(self) -> Result<Query> {
        let Some(table) = self.table else {
            return Err(syntax("insert requires into()"));
        };
        let Some(rows) = self.rows else {
            return Err(syntax("insert requires values()"));
        };
        if rows.is_empty() {
            return Err(syntax("values() requires at least one row"));
        }
        if self.or_replace {
            let def = self.ctx.schema().table(&table)?;
            if def.primary_key().is_none() {
                return Err(constraint(format!(
                    "insert_or_replace into '{table}' requires a primary key"
                )));
            }
        }
        Ok(Query::Insert(InsertQuery {
            table,
            rows,
            or_replace: self.or_replace,
        }))
    }

    pub async fn exec(self) -> Result<Relation> {
        let ctx = self.ctx.clone();
        let query = self.into_query()?;
        let mut results = Transaction::new(ctx).exec(vec![query]).await?;
        Ok(results.pop().unwrap_or_else(Relation::empty))
    }
}
