//! Projection operator.
//!
//! Reshapes entries to the selected items. Plain columns copy their
//! value into the output payload (through the alias slot when aliased);
//! aggregate items copy the result slot the aggregation operator left on
//! the entry. The output keeps the input's source-table set, so
//! multi-table projections stay prefix-applied.

use crate::error::syntax;
use crate::query::ProjectItem;
use crate::relation::{EntryPayload, Relation, RelationEntry};
use crate::row::Payload;
use crate::types::Value;
use eyre::Result;
use hashbrown::HashMap;

pub fn project(input: Relation, items: &[ProjectItem]) -> Result<Relation> {
    if items.is_empty() {
        return Ok(input);
    }
    let tables = input.tables().clone();
    let prefixed = tables.len() > 1;

    let mut entries = Vec::with_capacity(input.len());
    for entry in input.entries() {
        let payload = if prefixed {
            EntryPayload::Prefixed(HashMap::new())
        } else {
            EntryPayload::Flat(Payload::new())
        };
        let mut out = RelationEntry::from_parts(entry.row_id(), payload, Payload::new());

        for item in items {
            match item {
                ProjectItem::Column(column) => {
                    let value = entry.get_field(column).cloned().unwrap_or(Value::Null);
                    out.set_field(column, value);
                }
                ProjectItem::Aggregate(f) => {
                    let slot = f.slot_name();
                    let value = entry.get_slot(&slot).cloned().ok_or_else(|| {
                        syntax(format!(
                            "aggregate '{slot}' projected without a preceding aggregation"
                        ))
                    })?;
                    out.set_slot(slot, value);
                }
            }
        }
        entries.push(out);
    }
    Ok(Relation::new(entries, tables))
}
