//! Per-table reader-writer locks.
//!
//! Transactions acquire every lock they need before entering EXECUTING:
//! read locks for scanned tables, write locks for mutated ones. Locks are
//! always taken in lexicographic table-name order, which precludes
//! deadlock without a cycle detector. Acquisition is asynchronous — a
//! contended lock suspends the acquiring task rather than blocking the
//! scheduler.

use eyre::Result;
use hashbrown::HashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::error::scope;
use crate::schema::Schema;

enum TableGuard {
    Read(#[allow(dead_code)] OwnedRwLockReadGuard<()>),
    Write(#[allow(dead_code)] OwnedRwLockWriteGuard<()>),
}

/// The guards a transaction holds; dropping it releases every lock.
pub struct LockSet {
    guards: Vec<TableGuard>,
}

impl LockSet {
    pub fn table_count(&self) -> usize {
        self.guards.len()
    }
}

impl std::fmt::Debug for LockSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockSet")
            .field("table_count", &self.guards.len())
            .finish()
    }
}

pub struct LockManager {
    tables: HashMap<String, Arc<RwLock<()>>>,
}

impl LockManager {
    pub fn new(schema: &Schema) -> Self {
        let tables = schema
            .tables()
            .iter()
            .map(|t| (t.name().to_string(), Arc::new(RwLock::new(()))))
            .collect();
        Self { tables }
    }

    /// Acquires read locks on `read` and write locks on `write`, in
    /// lexicographic order over the union. A table in both sets gets the
    /// write lock.
    pub async fn acquire(
        &self,
        read: &BTreeSet<String>,
        write: &BTreeSet<String>,
    ) -> Result<LockSet> {
        let mut guards = Vec::with_capacity(read.len() + write.len());
        // BTreeSet union iterates in lexicographic order.
        for table in read.union(write) {
            let lock = self
                .tables
                .get(table)
                .ok_or_else(|| scope(format!("table '{table}' is outside the database scope")))?
                .clone();
            if write.contains(table) {
                guards.push(TableGuard::Write(lock.write_owned().await));
            } else {
                guards.push(TableGuard::Read(lock.read_owned().await));
            }
        }
        Ok(LockSet { guards })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableBuilder;
    use crate::types::DataType;

    fn schema() -> Schema {
        Schema::builder("s", 1)
            .table(TableBuilder::new("a").column("x", DataType::Integer))
            .table(TableBuilder::new("b").column("x", DataType::Integer))
            .build()
            .unwrap()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn readers_share_writers_exclude() {
        let manager = LockManager::new(&schema());
        let r1 = manager.acquire(&set(&["a"]), &set(&[])).await.unwrap();
        let r2 = manager.acquire(&set(&["a"]), &set(&[])).await.unwrap();
        assert_eq!(r1.table_count() + r2.table_count(), 2);
        drop((r1, r2));

        let w = manager.acquire(&set(&[]), &set(&["a"])).await.unwrap();
        // A second writer must not acquire until the first releases.
        let manager2 = &manager;
        let contended = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            manager2.acquire(&set(&[]), &set(&["a"])),
        )
        .await;
        assert!(contended.is_err(), "write lock should be exclusive");
        drop(w);
    }

    #[tokio::test]
    async fn write_wins_when_table_in_both_sets() {
        let manager = LockManager::new(&schema());
        let locks = manager.acquire(&set(&["a"]), &set(&["a"])).await.unwrap();
        assert_eq!(locks.table_count(), 1);
        let contended = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            manager.acquire(&set(&["a"]), &set(&[])),
        )
        .await;
        assert!(contended.is_err(), "reader must wait behind the writer");
    }

    #[tokio::test]
    async fn unknown_table_is_scope_error() {
        use crate::error::ErrorCode;
        let manager = LockManager::new(&schema());
        let err = manager
            .acquire(&set(&["ghost"]), &set(&[]))
            .await
            .unwrap_err();
        assert_eq!(ErrorCode::of(&err), ErrorCode::Scope);
    }
}
