//! DML operators: insert, insert-or-replace, update, delete.
//!
//! All three only append to the owning transaction's journal; shared
//! state (cache, indices, store) is untouched until commit. Payloads are
//! validated here — type conformance (TYPE) and nullability (CONSTRAINT)
//! fail the executing query and roll the transaction back. Key-based
//! constraints (primary/unique/foreign) are commit-phase checks run
//! against the journal's net effect.
//!
//! The executing transaction already holds the table's writer lock, so
//! the committed state consulted by `insert_or_replace` cannot move
//! underneath it.

use super::ExecContext;
use crate::error::{constraint, syntax, type_mismatch};
use crate::predicate::Predicate;
use crate::relation::{Relation, RelationEntry};
use crate::row::{Payload, Row};
use crate::schema::{Column, TableDef};
use crate::types::Value;
use eyre::Result;

/// Normalizes a payload against the table schema: every declared column
/// present (absent slots become NULL), values type-checked and coerced,
/// unknown slots rejected.
pub fn validate_payload(table: &TableDef, payload: &Payload) -> Result<Payload> {
    for slot in payload.keys() {
        if table.try_column(slot).is_none() {
            return Err(syntax(format!(
                "unknown column '{}' for table '{}'",
                slot,
                table.name()
            )));
        }
    }

    let mut normalized = Payload::with_capacity(table.columns().len());
    for column in table.columns() {
        let value = payload.get(column.name()).cloned().unwrap_or(Value::Null);
        if value.is_null() {
            if !column.is_nullable() {
                return Err(constraint(format!(
                    "column '{}.{}' is not nullable",
                    table.name(),
                    column.name()
                )));
            }
            normalized.insert(column.name().to_string(), Value::Null);
            continue;
        }
        if !column.data_type().accepts(&value) {
            return Err(type_mismatch(format!(
                "value of type {} not valid for column '{}.{}' ({})",
                value.type_name(),
                table.name(),
                column.name(),
                column.data_type()
            )));
        }
        let value = match (column.data_type(), value) {
            (crate::types::DataType::Number, Value::Int(i)) => Value::Float(i as f64),
            (_, v) => v,
        };
        normalized.insert(column.name().to_string(), value);
    }
    Ok(normalized)
}

pub fn insert(
    table: &str,
    rows: &[Row],
    or_replace: bool,
    exec: &mut ExecContext<'_>,
) -> Result<Relation> {
    let def = exec.ctx.schema().table(table)?.clone();
    let mut inserted = Vec::with_capacity(rows.len());

    for row in rows {
        let payload = validate_payload(&def, row.payload())?;
        let replaced = if or_replace {
            find_by_primary_key(&def, &payload, exec)?
        } else {
            None
        };
        match replaced {
            Some(existing) => {
                let row_id = existing.id();
                exec.journal
                    .record_update(table, row_id, existing.into_payload(), payload.clone());
                inserted.push(Row::new(row_id, payload));
            }
            None => {
                let row_id = exec.ctx.cache().next_row_id(table);
                exec.journal.record_insert(table, row_id, payload.clone());
                inserted.push(Row::new(row_id, payload));
            }
        }
    }

    Ok(Relation::from_rows(inserted, [table.to_string()]))
}

/// The currently-effective row (committed state plus this transaction's
/// journal) whose primary-key columns equal the candidate payload's.
fn find_by_primary_key(
    table: &TableDef,
    payload: &Payload,
    exec: &mut ExecContext<'_>,
) -> Result<Option<Row>> {
    let Some(pk_columns) = table.primary_key() else {
        return Err(constraint(format!(
            "insert_or_replace into '{}' requires a primary key",
            table.name()
        )));
    };
    let effective = exec
        .journal
        .overlay(table.name(), exec.ctx.cache().snapshot(table.name()));
    Ok(effective.into_iter().find(|row| {
        pk_columns
            .iter()
            .all(|pk| row.get(pk) == payload.get(pk.as_str()))
    }))
}

pub fn update(
    table: &str,
    assignments: &[(Column, Value)],
    filter: Option<&Predicate>,
    exec: &mut ExecContext<'_>,
) -> Result<Relation> {
    let def = exec.ctx.schema().table(table)?.clone();
    let effective = exec
        .journal
        .overlay(table, exec.ctx.cache().snapshot(table));

    let mut updated = Vec::new();
    for row in effective {
        let entry = RelationEntry::from_row(row.clone());
        if filter.map(|p| p.evaluate(&entry)).unwrap_or(true) {
            let before = row.payload().clone();
            let mut after = before.clone();
            for (column, value) in assignments {
                after.insert(column.name().to_string(), value.clone());
            }
            let after = validate_payload(&def, &after)?;
            exec.journal
                .record_update(table, row.id(), before, after.clone());
            updated.push(Row::new(row.id(), after));
        }
    }

    Ok(Relation::from_rows(updated, [table.to_string()]))
}

pub fn delete(
    table: &str,
    filter: Option<&Predicate>,
    exec: &mut ExecContext<'_>,
) -> Result<Relation> {
    exec.ctx.schema().table(table)?;
    let effective = exec
        .journal
        .overlay(table, exec.ctx.cache().snapshot(table));

    let mut deleted = Vec::new();
    for row in effective {
        let entry = RelationEntry::from_row(row.clone());
        if filter.map(|p| p.evaluate(&entry)).unwrap_or(true) {
            exec.journal
                .record_delete(table, row.id(), row.payload().clone());
            deleted.push(row);
        }
    }

    Ok(Relation::from_rows(deleted, [table.to_string()]))
}
