//! # Transaction Runtime
//!
//! A transaction is the unit of execution and isolation: it owns a
//! journal, acquires every per-table lock it needs up front, runs its
//! queries synchronously against the cache (with the journal overlaid),
//! and commits through an explicit state machine.
//!
//! ## States
//!
//! ```text
//! CREATED ──> ACQUIRING_LOCKS ──> EXECUTING ──> COMMITTING ──> FINISHED
//!                   │                  │             │
//!                   └──────────────────┴──> ROLLING_BACK ──> FAILED
//! ```
//!
//! ## Commit Phases
//!
//! 1. Validate foreign-key and unique constraints against the journal.
//! 2. Apply the journal to every affected index.
//! 3. Apply it to the row cache.
//! 4. Flush to the backing store as one batch (the only await).
//! 5. Release locks (guards drop).
//!
//! Failure in (1)–(3) is a full rollback: the journal is discarded and,
//! because application is deferred until validation passed, shared state
//! is untouched. Failure in (4) cannot be rolled back locally — the
//! in-memory state is already ahead of the store — so the transaction
//! ends `FAILED` and the database degrades to read-only until a
//! reconciliation pass.
//!
//! ## Cancellation
//!
//! A [`CancelHandle`] may cancel the transaction at any point before
//! COMMITTING; the exec call resolves with `CANCELLED` and the journal
//! is dropped. Once COMMITTING begins, cancellation is ignored.

mod locks;
mod validate;

pub use locks::{LockManager, LockSet};

use crate::config::METADATA_TABLE;
use crate::context::Context;
use crate::error::{cancelled, scope, store_failure};
use crate::exec::{execute, ExecContext};
use crate::journal::{Journal, NetEffect};
use crate::plan::{plan_query, PlanContext};
use crate::query::Query;
use crate::relation::Relation;
use crate::store::{encode_metadata, StoreMetadata, WriteEntry, METADATA_ROW_ID};
use eyre::Result;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    Created,
    AcquiringLocks,
    Executing,
    Committing,
    Finished,
    RollingBack,
    Failed,
}

/// Cancels the owning transaction when triggered before COMMITTING.
#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

pub struct Transaction {
    ctx: Arc<Context>,
    state: TxnState,
    journal: Journal,
    cancel_flag: Arc<AtomicBool>,
}

impl Transaction {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            ctx,
            state: TxnState::Created,
            journal: Journal::new(),
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> TxnState {
        self.state
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: self.cancel_flag.clone(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    /// Runs `queries` in order and commits. Consuming `self` makes reuse
    /// after completion unrepresentable; the state checks remain for
    /// defense in depth.
    pub async fn exec(mut self, queries: Vec<Query>) -> Result<Vec<Relation>> {
        if self.state != TxnState::Created {
            return Err(scope("transaction already executed"));
        }
        if queries.is_empty() {
            self.state = TxnState::Finished;
            return Ok(Vec::new());
        }

        let has_writes = queries.iter().any(Query::is_write);
        if has_writes && self.ctx.is_degraded() {
            return Err(store_failure(
                "database is in read-only degraded mode after a store failure",
            ));
        }

        // Lock scope: every table any query touches, writers exclusive.
        // Writers also read-lock their foreign-key neighbors so the
        // commit-phase referential checks see a stable snapshot.
        let mut read_tables: BTreeSet<String> = BTreeSet::new();
        let mut write_tables: BTreeSet<String> = BTreeSet::new();
        for query in &queries {
            read_tables.extend(query.read_tables());
            write_tables.extend(query.write_tables());
        }
        for table in write_tables.clone() {
            read_tables.extend(self.ctx.schema().fk_neighbors(&table));
        }
        let read_tables: BTreeSet<String> = read_tables
            .difference(&write_tables)
            .cloned()
            .collect();

        self.state = TxnState::AcquiringLocks;
        let locks = self.ctx.locks().acquire(&read_tables, &write_tables).await?;

        if self.is_cancelled() {
            return Err(self.roll_back(cancelled("transaction cancelled"), locks));
        }

        self.state = TxnState::Executing;
        let mut results = Vec::with_capacity(queries.len());
        for query in &queries {
            if self.is_cancelled() {
                return Err(self.roll_back(cancelled("transaction cancelled"), locks));
            }
            match self.run_query(query) {
                Ok(relation) => results.push(relation),
                Err(err) => return Err(self.roll_back(err, locks)),
            }
        }

        if self.is_cancelled() {
            return Err(self.roll_back(cancelled("transaction cancelled"), locks));
        }

        self.state = TxnState::Committing;
        if self.journal.is_empty() {
            self.state = TxnState::Finished;
            drop(locks);
            return Ok(results);
        }

        // (1) Validation failures leave shared state untouched, so they
        // still roll back cleanly.
        if let Err(err) = validate::validate_constraints(&self.ctx, &self.journal) {
            return Err(self.roll_back(err, locks));
        }

        // (2)–(4) mutate shared state; any failure past this point can
        // only be resolved by a reconciliation pass.
        match self.apply_and_flush().await {
            Ok(()) => {
                self.state = TxnState::Finished;
                drop(locks);
                Ok(results)
            }
            Err(err) => {
                self.ctx.mark_degraded();
                self.state = TxnState::Failed;
                warn!("commit application failed; database degraded to read-only");
                drop(locks);
                Err(err)
            }
        }
    }

    /// Plans and executes one query against the journal-overlaid state.
    fn run_query(&mut self, query: &Query) -> Result<Relation> {
        let plan = {
            let indices = self.ctx.indices().read();
            let plan_ctx = PlanContext {
                schema: self.ctx.schema(),
                indices: &*indices,
                journal_touched: self.journal.touched_tables().clone(),
            };
            plan_query(query, &plan_ctx)?
        };
        let mut exec_ctx = ExecContext {
            ctx: &self.ctx,
            journal: &mut self.journal,
        };
        execute(&plan, &mut exec_ctx)
    }

    /// Discards the journal and reports the failure. Nothing was applied
    /// to shared state, so rollback is purely local.
    fn roll_back(&mut self, err: eyre::Report, locks: LockSet) -> eyre::Report {
        self.state = TxnState::RollingBack;
        self.journal = Journal::new();
        self.state = TxnState::Failed;
        drop(locks);
        err
    }

    /// Commit phases (2)–(4); phase (5) is the caller dropping the lock
    /// set. No suspension point exists between index and cache
    /// application.
    async fn apply_and_flush(&mut self) -> Result<()> {
        let net = self.journal.net_effects();

        // (2) Indices.
        {
            let mut indices = self.ctx.indices().write();
            for (table_name, effects) in &net {
                let table = self.ctx.schema().table(table_name)?;
                for (row_id, effect) in effects {
                    match effect {
                        NetEffect::Inserted { after } => {
                            indices.apply_insert(table, *row_id, after)?;
                        }
                        NetEffect::Updated { before, after } => {
                            indices.apply_update(table, *row_id, before, after)?;
                        }
                        NetEffect::Deleted { before } => {
                            indices.apply_delete(table, *row_id, before)?;
                        }
                    }
                }
            }
        }

        // (3) Cache.
        for (table_name, effects) in &net {
            for (row_id, effect) in effects {
                match effect {
                    NetEffect::Inserted { after } | NetEffect::Updated { after, .. } => {
                        self.ctx.cache().put(table_name, *row_id, after.clone());
                    }
                    NetEffect::Deleted { .. } => {
                        self.ctx.cache().remove(table_name, *row_id);
                    }
                }
            }
        }

        // (4) Store flush, one logical batch including metadata.
        let mut batch = Vec::new();
        for (table_name, effects) in &net {
            for (row_id, effect) in effects {
                let payload = match effect {
                    NetEffect::Inserted { after } | NetEffect::Updated { after, .. } => {
                        Some(after.clone())
                    }
                    NetEffect::Deleted { .. } => None,
                };
                batch.push(WriteEntry {
                    table: table_name.clone(),
                    row_id: *row_id,
                    payload,
                });
            }
        }
        let metadata = StoreMetadata {
            version: self.ctx.schema().version(),
            high_water: self
                .ctx
                .schema()
                .tables()
                .iter()
                .map(|t| (t.name().to_string(), self.ctx.cache().high_water(t.name())))
                .collect(),
        };
        batch.push(WriteEntry {
            table: METADATA_TABLE.to_string(),
            row_id: METADATA_ROW_ID,
            payload: Some(encode_metadata(&metadata)),
        });

        debug!(entries = batch.len(), "flushing commit batch to store");
        self.ctx.store().write(batch).await?;

        self.journal = Journal::new();
        Ok(())
    }
}
