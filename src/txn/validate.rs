//! Commit-phase constraint validation.
//!
//! Phase (1) of commit: the journal's net effect is checked against the
//! committed state and against itself before anything is applied. A
//! failure here rolls the whole transaction back with nothing touched —
//! the commit-atomicity property rests on this ordering.
//!
//! Checks, in order:
//! 1. **Uniqueness** — every net-inserted/updated payload probes the
//!    committed unique indices (excluding rows this transaction deletes
//!    or re-keys) and an intra-journal seen-set (two new rows may not
//!    claim one key).
//! 2. **Foreign keys outbound** — new/updated rows with non-null FK
//!    columns must reference an existing row in the effective state of
//!    the remote table (committed overlaid with this journal).
//! 3. **Foreign keys inbound** — rows this transaction deletes (or whose
//!    referenced columns it changes) must not be referenced by any
//!    effective row of a referencing table.

use crate::context::Context;
use crate::error::constraint;
use crate::index::{key_for, key_has_null};
use crate::journal::{Journal, NetEffect};
use crate::row::{Payload, Row, RowId};
use crate::schema::{ForeignKeyDef, TableDef};
use eyre::Result;
use hashbrown::{HashMap, HashSet};

pub fn validate_constraints(ctx: &Context, journal: &Journal) -> Result<()> {
    let net = journal.net_effects();
    if net.is_empty() {
        return Ok(());
    }

    // Effective (committed + journal) row snapshots, built on demand.
    let mut effective: HashMap<String, Vec<Row>> = HashMap::new();
    let mut effective_rows = |table: &str| -> Vec<Row> {
        effective
            .entry(table.to_string())
            .or_insert_with(|| journal.overlay(table, ctx.cache().snapshot(table)))
            .clone()
    };

    let indices = ctx.indices().read();

    for (table_name, effects) in &net {
        let table = ctx.schema().table(table_name)?;

        // Rows whose committed index entries must not count as conflicts.
        let displaced: HashSet<RowId> = effects
            .iter()
            .filter(|(_, e)| matches!(e, NetEffect::Updated { .. } | NetEffect::Deleted { .. }))
            .map(|(row_id, _)| *row_id)
            .collect();

        let mut seen_keys: HashMap<String, HashSet<Vec<u8>>> = HashMap::new();
        for (_, effect) in effects {
            let after = match effect {
                NetEffect::Inserted { after } => after,
                NetEffect::Updated { after, .. } => after,
                NetEffect::Deleted { .. } => continue,
            };
            indices.check_unique_excluding(table, after, &displaced)?;
            check_intra_journal_unique(table, after, &mut seen_keys)?;
        }
    }

    // Outbound references of new and updated rows.
    for (table_name, effects) in &net {
        let table = ctx.schema().table(table_name)?;
        for (_, effect) in effects {
            let after = match effect {
                NetEffect::Inserted { after } => after,
                NetEffect::Updated { after, .. } => after,
                NetEffect::Deleted { .. } => continue,
            };
            for fk in table.foreign_keys() {
                if key_has_null(fk.local_columns(), after) {
                    continue;
                }
                let remote = effective_rows(fk.remote_table());
                if !remote.iter().any(|row| references(fk, after, row)) {
                    return Err(constraint(format!(
                        "foreign key '{}' on '{}' references a missing row in '{}'",
                        fk.name(),
                        table_name,
                        fk.remote_table()
                    )));
                }
            }
        }
    }

    // Inbound references to rows this transaction removes or re-keys.
    for (table_name, effects) in &net {
        for (row_id, effect) in effects {
            let removed_image = match effect {
                NetEffect::Deleted { before } => before,
                NetEffect::Updated { before, .. } => before,
                NetEffect::Inserted { .. } => continue,
            };
            for referencing in ctx.schema().tables() {
                for fk in referencing
                    .foreign_keys()
                    .iter()
                    .filter(|fk| fk.remote_table() == table_name)
                {
                    if let NetEffect::Updated { after, .. } = effect {
                        // An update only endangers references when it
                        // moves the referenced columns.
                        let changed = fk.remote_columns().iter().any(|c| {
                            removed_image.get(c.as_str()) != after.get(c.as_str())
                        });
                        if !changed {
                            continue;
                        }
                    }
                    let rows = effective_rows(referencing.name());
                    let broken = rows.iter().any(|row| {
                        !(referencing.name() == table_name && row.id() == *row_id)
                            && !key_has_null(fk.local_columns(), row.payload())
                            && references_image(fk, row.payload(), removed_image)
                    });
                    if broken {
                        return Err(constraint(format!(
                            "row {row_id} of '{table_name}' is still referenced through foreign key '{}' on '{}'",
                            fk.name(),
                            referencing.name()
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Intra-journal uniqueness: two net-new images may not share a unique
/// key. The per-index seen-sets live across calls for one table.
fn check_intra_journal_unique(
    table: &TableDef,
    after: &Payload,
    seen_keys: &mut HashMap<String, HashSet<Vec<u8>>>,
) -> Result<()> {
    if let Some(pk_cols) = table.primary_key() {
        let key = key_for(table, pk_cols, after)?;
        if !seen_keys.entry("pk".to_string()).or_default().insert(key) {
            return Err(constraint(format!(
                "primary key violation on table '{}' within one transaction",
                table.name()
            )));
        }
    }
    for def in table.indices().iter().filter(|d| d.is_unique()) {
        if key_has_null(def.columns(), after) {
            continue;
        }
        let key = key_for(table, def.columns(), after)?;
        if !seen_keys
            .entry(def.name().to_string())
            .or_default()
            .insert(key)
        {
            return Err(constraint(format!(
                "unique index '{}' violation on table '{}' within one transaction",
                def.name(),
                table.name()
            )));
        }
    }
    Ok(())
}

/// Whether `row` (in the remote table) satisfies `local`'s reference.
fn references(fk: &ForeignKeyDef, local: &Payload, row: &Row) -> bool {
    fk.local_columns()
        .iter()
        .zip(fk.remote_columns())
        .all(|(lc, rc)| local.get(lc.as_str()) == row.get(rc))
}

/// Whether `referencing` points at the removed image of a remote row.
fn references_image(fk: &ForeignKeyDef, referencing: &Payload, removed: &Payload) -> bool {
    fk.local_columns()
        .iter()
        .zip(fk.remote_columns())
        .all(|(lc, rc)| referencing.get(lc.as_str()) == removed.get(rc.as_str()))
}
