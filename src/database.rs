//! # Database Façade
//!
//! The public entry point: opens a schema over a store adapter, hands
//! out query builders, and creates explicit transactions. Opening warms
//! the row cache from a full store scan, restores the persisted row-id
//! high-water marks, and rebuilds every index from the scanned rows —
//! index state is never persisted.

use crate::config::METADATA_TABLE;
use crate::context::Context;
use crate::query::{
    DeleteBuilder, InsertBuilder, ProjectItem, SelectBuilder, UpdateBuilder,
};
use crate::schema::{Schema, TableDef};
use crate::store::{decode_metadata, Store, METADATA_ROW_ID};
use crate::txn::Transaction;
use eyre::Result;
use std::sync::Arc;
use tracing::info;

pub struct Database {
    ctx: Arc<Context>,
}

impl Database {
    /// Opens (or initializes) a database for `schema` on top of `store`:
    /// store open, full scan per table, cache warm, high-water restore,
    /// index rebuild.
    pub async fn open(schema: Schema, store: Arc<dyn Store>) -> Result<Database> {
        store.open(&schema).await?;
        let ctx = Context::new(schema, store);

        let metadata = ctx
            .store()
            .scan(METADATA_TABLE)
            .await?
            .into_iter()
            .find(|row| row.id() == METADATA_ROW_ID)
            .map(|row| decode_metadata(row.payload()))
            .unwrap_or_default();

        let mut total_rows = 0usize;
        for table in ctx.schema().tables() {
            let rows = ctx.store().scan(table.name()).await?;
            total_rows += rows.len();
            ctx.cache().warm(table.name(), rows.clone());
            if let Some(mark) = metadata.high_water.get(table.name()) {
                ctx.cache().set_high_water(table.name(), *mark);
            }
            ctx.indices().write().rebuild(table, &rows)?;
        }

        info!(
            schema = ctx.schema().name(),
            version = ctx.schema().version(),
            tables = ctx.schema().tables().len(),
            rows = total_rows,
            "database open"
        );
        Ok(Database { ctx: Arc::new(ctx) })
    }

    pub fn schema(&self) -> &Schema {
        self.ctx.schema()
    }

    /// Typed column-handle source for the builder DSL.
    pub fn table(&self, name: &str) -> Result<&TableDef> {
        self.ctx.schema().table(name)
    }

    pub fn is_degraded(&self) -> bool {
        self.ctx.is_degraded()
    }

    /// Clears degraded mode after external reconciliation.
    pub fn clear_degraded(&self) {
        self.ctx.clear_degraded()
    }

    pub fn select(&self, items: impl IntoIterator<Item = ProjectItem>) -> SelectBuilder {
        SelectBuilder::new(self.ctx.clone(), items.into_iter().collect())
    }

    /// `select()` with no items: every column of every scanned table.
    pub fn select_all(&self) -> SelectBuilder {
        SelectBuilder::new(self.ctx.clone(), Vec::new())
    }

    pub fn insert(&self) -> InsertBuilder {
        InsertBuilder::new(self.ctx.clone(), false)
    }

    /// Insert that replaces the existing row on a primary-key match.
    /// Requires the target table to declare a primary key.
    pub fn insert_or_replace(&self) -> InsertBuilder {
        InsertBuilder::new(self.ctx.clone(), true)
    }

    pub fn update(&self, table: &str) -> UpdateBuilder {
        UpdateBuilder::new(self.ctx.clone(), table)
    }

    pub fn delete(&self) -> DeleteBuilder {
        DeleteBuilder::new(self.ctx.clone())
    }

    /// An explicit transaction for multi-query batches.
    pub fn create_transaction(&self) -> Transaction {
        Transaction::new(self.ctx.clone())
    }

    /// Flushes nothing (commits already flushed) and closes the adapter.
    pub async fn close(self) -> Result<()> {
        info!(schema = self.ctx.schema().name(), "database close");
        self.ctx.store().close().await
    }
}
