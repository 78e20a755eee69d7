//! Join operators.
//!
//! Both joins produce prefix-applied output via
//! [`RelationEntry::combine`]. The nested loop is the default and the
//! only one handling arbitrary predicates and outer joins; the hash join
//! takes over for single-pair equi-joins when the planner judged the
//! build side small enough. NULL keys never match in either algorithm.

use crate::context::Context;
use crate::predicate::Predicate;
use crate::query::JoinType;
use crate::relation::{EntryPayload, Relation, RelationEntry};
use crate::row::{Payload, DUMMY_ROW_ID};
use crate::schema::Column;
use crate::types::Value;
use eyre::Result;
use hashbrown::{HashMap, HashSet};

pub fn nested_loop_join(
    left: Relation,
    right: Relation,
    join_type: JoinType,
    predicate: Option<&Predicate>,
    ctx: &Context,
) -> Result<Relation> {
    let tables: HashSet<String> = left.tables().union(right.tables()).cloned().collect();
    let mut entries = Vec::new();

    for left_entry in left.entries() {
        let mut matched = false;
        for right_entry in right.entries() {
            let combined =
                RelationEntry::combine(left_entry, left.tables(), right_entry, right.tables());
            if predicate.map(|p| p.evaluate(&combined)).unwrap_or(true) {
                entries.push(combined);
                matched = true;
            }
        }
        if !matched && join_type == JoinType::LeftOuter {
            let padding = null_entry(right.tables(), ctx)?;
            entries.push(RelationEntry::combine(
                left_entry,
                left.tables(),
                &padding,
                right.tables(),
            ));
        }
    }

    Ok(Relation::new(entries, tables))
}

/// A synthetic all-NULL entry covering `tables`, used to pad unmatched
/// preserved-side rows in outer joins.
fn null_entry(tables: &HashSet<String>, ctx: &Context) -> Result<RelationEntry> {
    let mut prefixes: HashMap<String, Payload> = HashMap::new();
    for table in tables {
        let def = ctx.schema().table(table)?;
        let payload: Payload = def
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), Value::Null))
            .collect();
        prefixes.insert(table.clone(), payload);
    }
    Ok(RelationEntry::from_parts(
        DUMMY_ROW_ID,
        EntryPayload::Prefixed(prefixes),
        Payload::new(),
    ))
}

pub fn hash_join(
    left: Relation,
    right: Relation,
    left_column: &Column,
    right_column: &Column,
    residual: Option<&Predicate>,
) -> Relation {
    let tables: HashSet<String> = left.tables().union(right.tables()).cloned().collect();

    // Build on the left, probe with the right. NULL keys are dropped on
    // both sides.
    let mut build: HashMap<Value, Vec<&RelationEntry>> = HashMap::new();
    for entry in left.entries() {
        if let Some(key) = entry.get_field(left_column) {
            if !key.is_null() {
                build.entry(key.clone()).or_default().push(entry);
            }
        }
    }

    let mut entries = Vec::new();
    for right_entry in right.entries() {
        let Some(key) = right_entry.get_field(right_column) else {
            continue;
        };
        if key.is_null() {
            continue;
        }
        let Some(matches) = build.get(key) else {
            continue;
        };
        for left_entry in matches {
            let combined =
                RelationEntry::combine(left_entry, left.tables(), right_entry, right.tables());
            if residual.map(|p| p.evaluate(&combined)).unwrap_or(true) {
                entries.push(combined);
            }
        }
    }

    Relation::new(entries, tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;
    use crate::schema::{Schema, TableBuilder};
    use crate::store::MemoryStore;
    use crate::types::DataType;
    use std::sync::Arc;

    fn ctx() -> Context {
        let schema = Schema::builder("s", 1)
            .table(
                TableBuilder::new("l")
                    .column("id", DataType::Integer)
                    .column("k", DataType::Integer),
            )
            .table(
                TableBuilder::new("r")
                    .column("id", DataType::Integer)
                    .column("k", DataType::Integer),
            )
            .build()
            .unwrap();
        Context::new(schema, Arc::new(MemoryStore::new()))
    }

    fn rel(table: &str, keys: &[i64]) -> Relation {
        let rows: Vec<Row> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| {
                let mut row =
                    Row::from_pairs([("id", Value::Int(i as i64)), ("k", Value::Int(*k))]);
                row.set_id(i as u64);
                row
            })
            .collect();
        Relation::from_rows(rows, [table.to_string()])
    }

    fn key_col(ctx: &Context, table: &str) -> Column {
        ctx.schema().table(table).unwrap().column_handle("k").unwrap()
    }

    #[test]
    fn inner_join_matches_on_predicate() {
        let ctx = ctx();
        let left = rel("l", &[1, 2, 3]);
        let right = rel("r", &[2, 3, 4]);
        let pred = key_col(&ctx, "l").eq_col(&key_col(&ctx, "r"));

        let joined =
            nested_loop_join(left, right, JoinType::Inner, Some(&pred), &ctx).unwrap();
        assert_eq!(joined.len(), 2);
        assert!(joined.prefix_applied());
        for entry in joined.entries() {
            assert_eq!(entry.row_id(), DUMMY_ROW_ID);
        }
    }

    #[test]
    fn left_outer_join_pads_unmatched_rows() {
        let ctx = ctx();
        let left = rel("l", &[1, 9]);
        let right = rel("r", &[1]);
        let pred = key_col(&ctx, "l").eq_col(&key_col(&ctx, "r"));

        let joined =
            nested_loop_join(left, right, JoinType::LeftOuter, Some(&pred), &ctx).unwrap();
        assert_eq!(joined.len(), 2);
        let padded = joined
            .entries()
            .iter()
            .find(|e| e.get_field(&key_col(&ctx, "r")) == Some(&Value::Null));
        assert!(padded.is_some(), "unmatched left row must be null-padded");
    }

    #[test]
    fn hash_join_equals_nested_loop_on_equi_predicate() {
        let ctx = ctx();
        let pred = key_col(&ctx, "l").eq_col(&key_col(&ctx, "r"));

        let nl = nested_loop_join(
            rel("l", &[1, 2, 2, 5]),
            rel("r", &[2, 5, 7]),
            JoinType::Inner,
            Some(&pred),
            &ctx,
        )
        .unwrap();
        let hj = hash_join(
            rel("l", &[1, 2, 2, 5]),
            rel("r", &[2, 5, 7]),
            &key_col(&ctx, "l"),
            &key_col(&ctx, "r"),
            None,
        );
        assert_eq!(nl.len(), hj.len());
    }

    #[test]
    fn null_keys_never_match() {
        let ctx = ctx();
        let mut left_row = Row::from_pairs([("id", Value::Int(0)), ("k", Value::Null)]);
        left_row.set_id(0);
        let left = Relation::from_rows(vec![left_row], ["l".to_string()]);
        let right = rel("r", &[1]);

        let hj = hash_join(
            left,
            right,
            &key_col(&ctx, "l"),
            &key_col(&ctx, "r"),
            None,
        );
        assert!(hj.is_empty());
    }
}
