//! # Transaction Journal
//!
//! Each transaction owns one journal: the ordered list of its pending
//! mutations, each carrying before/after images. Nothing outside the
//! transaction sees the journal; read-your-writes comes from overlaying
//! it on cache snapshots during execution, and commit folds it into a net
//! per-row effect that is validated, applied to the indices and cache,
//! and flushed to the backing store as one batch. Rollback is simply
//! dropping the journal.
//!
//! The net fold matters for correctness of commit application: a row
//! inserted and then deleted inside one transaction must touch neither
//! the indices nor the store, and an insert followed by updates must
//! apply as a single insert of the final image.

use crate::row::{Payload, Row, RowId};
use hashbrown::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
pub struct Mutation {
    pub table: String,
    pub row_id: RowId,
    pub op: MutationOp,
    pub before: Option<Payload>,
    pub after: Option<Payload>,
}

/// Net per-row effect of a journal, produced by [`Journal::net_effects`].
#[derive(Debug, Clone)]
pub enum NetEffect {
    Inserted { after: Payload },
    Updated { before: Payload, after: Payload },
    Deleted { before: Payload },
}

#[derive(Debug, Default)]
pub struct Journal {
    mutations: Vec<Mutation>,
    touched: HashSet<String>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Tables with at least one pending mutation. The planner refuses
    /// index access paths for these within the owning transaction.
    pub fn touched_tables(&self) -> &HashSet<String> {
        &self.touched
    }

    pub fn touches(&self, table: &str) -> bool {
        self.touched.contains(table)
    }

    pub fn record_insert(&mut self, table: impl Into<String>, row_id: RowId, after: Payload) {
        let table = table.into();
        self.touched.insert(table.clone());
        self.mutations.push(Mutation {
            table,
            row_id,
            op: MutationOp::Insert,
            before: None,
            after: Some(after),
        });
    }

    pub fn record_update(
        &mut self,
        table: impl Into<String>,
        row_id: RowId,
        before: Payload,
        after: Payload,
    ) {
        let table = table.into();
        self.touched.insert(table.clone());
        self.mutations.push(Mutation {
            table,
            row_id,
            op: MutationOp::Update,
            before: Some(before),
            after: Some(after),
        });
    }

    pub fn record_delete(&mut self, table: impl Into<String>, row_id: RowId, before: Payload) {
        let table = table.into();
        self.touched.insert(table.clone());
        self.mutations.push(Mutation {
            table,
            row_id,
            op: MutationOp::Delete,
            before: Some(before),
            after: None,
        });
    }

    /// Read-your-writes view: applies this journal's mutations for
    /// `table`, in order, over a committed-state snapshot.
    pub fn overlay(&self, table: &str, base: Vec<Row>) -> Vec<Row> {
        if !self.touches(table) {
            return base;
        }
        let mut rows = base;
        for mutation in self.mutations.iter().filter(|m| m.table == table) {
            match mutation.op {
                MutationOp::Insert => {
                    if let Some(after) = &mutation.after {
                        rows.push(Row::new(mutation.row_id, after.clone()));
                    }
                }
                MutationOp::Update => {
                    if let Some(after) = &mutation.after {
                        if let Some(row) = rows.iter_mut().find(|r| r.id() == mutation.row_id) {
                            *row = Row::new(mutation.row_id, after.clone());
                        }
                    }
                }
                MutationOp::Delete => {
                    rows.retain(|r| r.id() != mutation.row_id);
                }
            }
        }
        rows
    }

    /// Folds the journal into its net per-row effects, grouped by table.
    /// Row order within a table follows first appearance in the journal.
    pub fn net_effects(&self) -> HashMap<String, Vec<(RowId, NetEffect)>> {
        let mut per_table: HashMap<String, Vec<(RowId, NetEffect)>> = HashMap::new();
        for mutation in &self.mutations {
            let effects = per_table.entry(mutation.table.clone()).or_default();
            let slot = effects.iter_mut().find(|(id, _)| *id == mutation.row_id);
            match (slot, mutation.op) {
                (None, MutationOp::Insert) => {
                    effects.push((
                        mutation.row_id,
                        NetEffect::Inserted {
                            after: mutation.after.clone().unwrap_or_default(),
                        },
                    ));
                }
                (None, MutationOp::Update) => {
                    effects.push((
                        mutation.row_id,
                        NetEffect::Updated {
                            before: mutation.before.clone().unwrap_or_default(),
                            after: mutation.after.clone().unwrap_or_default(),
                        },
                    ));
                }
                (None, MutationOp::Delete) => {
                    effects.push((
                        mutation.row_id,
                        NetEffect::Deleted {
                            before: mutation.before.clone().unwrap_or_default(),
                        },
                    ));
                }
                (Some((_, effect)), op) => {
                    match merge_effect(effect, op, &mutation.before, &mutation.after) {
                        Some(merged) => *effect = merged,
                        // Inserted-then-deleted rows net to nothing.
                        None => {
                            effects.retain(|(id, _)| *id != mutation.row_id);
                        }
                    }
                }
            }
        }
        per_table.retain(|_, effects| !effects.is_empty());
        per_table
    }
}

fn merge_effect(
    current: &NetEffect,
    op: MutationOp,
    _before: &Option<Payload>,
    after: &Option<Payload>,
) -> Option<NetEffect> {
    match (current, op) {
        // Insert then update: still a net insert of the newest image.
        (NetEffect::Inserted { .. }, MutationOp::Update) => Some(NetEffect::Inserted {
            after: after.clone().unwrap_or_default(),
        }),
        // Insert then delete: nets to nothing.
        (NetEffect::Inserted { .. }, MutationOp::Delete) => None,
        (NetEffect::Updated { before: first, .. }, MutationOp::Update) => Some(NetEffect::Updated {
            before: first.clone(),
            after: after.clone().unwrap_or_default(),
        }),
        (NetEffect::Updated { before: first, .. }, MutationOp::Delete) => Some(NetEffect::Deleted {
            before: first.clone(),
        }),
        // A delete resurrected by an insert of the same row id behaves as
        // an update from the original image.
        (NetEffect::Deleted { before: first }, MutationOp::Insert) => Some(NetEffect::Updated {
            before: first.clone(),
            after: after.clone().unwrap_or_default(),
        }),
        // Remaining combinations are engine misuse; keep the newest
        // consistent interpretation rather than panic.
        (_, MutationOp::Insert) => Some(NetEffect::Inserted {
            after: after.clone().unwrap_or_default(),
        }),
        (NetEffect::Inserted { after: a }, _) => Some(NetEffect::Inserted { after: a.clone() }),
        (NetEffect::Deleted { before: b }, _) => Some(NetEffect::Deleted { before: b.clone() }),
    }
}
