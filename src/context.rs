//! # Engine Context
//!
//! The long-lived shared state of one open database: schema, row cache,
//! index store, lock manager, backing-store adapter, and the degraded
//! flag. An explicit `Context` handle is passed into every component at
//! construction time — there is no process-global registry — so tests
//! instantiate fresh, fully-isolated contexts.
//!
//! The cache and index store are shared across transactions; both are
//! mutated only during a transaction's COMMITTING phase while the
//! affected tables' writer locks are held.

use crate::cache::RowCache;
use crate::index::IndexStore;
use crate::schema::Schema;
use crate::store::Store;
use crate::txn::LockManager;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Context {
    schema: Schema,
    cache: RowCache,
    indices: RwLock<IndexStore>,
    store: Arc<dyn Store>,
    locks: LockManager,
    degraded: AtomicBool,
}

impl Context {
    pub fn new(schema: Schema, store: Arc<dyn Store>) -> Self {
        let cache = RowCache::new(schema.tables().iter().map(|t| t.name().to_string()));
        let indices = RwLock::new(IndexStore::new(&schema));
        let locks = LockManager::new(&schema);
        Self {
            schema,
            cache,
            indices,
            store,
            locks,
            degraded: AtomicBool::new(false),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn cache(&self) -> &RowCache {
        &self.cache
    }

    pub fn indices(&self) -> &RwLock<IndexStore> {
        &self.indices
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Whether a commit-phase store failure has put the database into
    /// read-only degraded mode.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn mark_degraded(&self) {
        self.degraded.store(true, Ordering::SeqCst);
    }

    /// Clears degraded mode after an external reconciliation pass has
    /// restored store consistency.
    pub fn clear_degraded(&self) {
        self.degraded.store(false, Ordering::SeqCst);
    }
}
