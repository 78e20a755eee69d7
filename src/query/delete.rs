//! DELETE builder.

use super::{DeleteQuery, Query};
use crate::context::Context;
use crate::error::syntax;
use crate::predicate::Predicate;
use crate::relation::Relation;
use crate::txn::Transaction;
use eyre::Result;
use std::sync::Arc;

pub struct DeleteBuilder {
    ctx: Arc<Context>,
    table: Option<String>,
    filter: Option<Predicate>,
}

impl DeleteBuilder {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self {
            ctx,
            table: None,
            filter: None,
        }
    }

    pub fn from(mut self, table: &str) -> Result<Self> {
        if self.table.is_some() {
            return Err(syntax("from() may only be called once"));
        }
        self.ctx.schema().table(table)?;
        self.table = Some(table.to_string());
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
        let Some(table) = self.table else {
            return Err(syntax("delete requires from()"));
        };
        Ok(Query::Delete(DeleteQuery {
            table,
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
