//! Grouping and aggregation.
//!
//! Single-pass hash grouping: entries are bucketed by their group-key
//! values (first-seen group order is preserved), then each aggregate is
//! computed per bucket and written onto a representative entry's flat
//! result slots, where the projection picks it up.
//!
//! Scalar aggregation (no group columns) runs over one bucket holding
//! all input — including the empty input, which still yields one output
//! row (`count` of nothing is 0).
//!
//! `distinct` changes cardinality instead of folding: one output entry
//! per distinct value, in first-occurrence order.

use crate::query::{AggregateFn, AggregateKind};
use crate::relation::{EntryPayload, Relation, RelationEntry};
use crate::row::{Payload, DUMMY_ROW_ID};
use crate::schema::Column;
use crate::types::Value;
use eyre::Result;

pub fn group_aggregate(
    input: Relation,
    group_columns: &[Column],
    aggregates: &[AggregateFn],
) -> Result<Relation> {
    if let [f] = aggregates {
        if f.kind == AggregateKind::Distinct {
            return Ok(distinct(input, f));
        }
    }

    let tables = input.tables().clone();
    let entries = input.entries();

    // Bucket by group key; scalar aggregation uses one implicit bucket.
    let mut buckets: Vec<(Vec<Value>, Vec<&RelationEntry>)> = Vec::new();
    if group_columns.is_empty() {
        buckets.push((Vec::new(), entries.iter().collect()));
    } else {
        for entry in entries {
            let key: Vec<Value> = group_columns
                .iter()
                .map(|c| entry.get_field(c).cloned().unwrap_or(Value::Null))
                .collect();
            match buckets.iter_mut().find(|(k, _)| *k == key) {
                Some((_, bucket)) => bucket.push(entry),
                None => buckets.push((key, vec![entry])),
            }
        }
    }

    let mut output = Vec::with_capacity(buckets.len());
    for (_, bucket) in buckets {
        let mut out = match bucket.first() {
            Some(first) => (*first).clone(),
            // Scalar aggregation over empty input: a bare synthetic row.
            None => RelationEntry::from_parts(
                DUMMY_ROW_ID,
                EntryPayload::Flat(Payload::new()),
                Payload::new(),
            ),
        };
        for f in aggregates {
            let value = compute(f, &bucket);
            out.set_slot(f.slot_name(), value);
        }
        output.push(out);
    }

    Ok(Relation::new(output, tables))
}

fn distinct(input: Relation, f: &AggregateFn) -> Relation {
    let tables = input.tables().clone();
    let mut seen: Vec<Value> = Vec::new();
    let mut output = Vec::new();
    for entry in input.entries() {
        let value = entry.get_field(&f.column).cloned().unwrap_or(Value::Null);
        if seen.contains(&value) {
            continue;
        }
        seen.push(value.clone());
        let mut out = entry.clone();
        out.set_slot(f.slot_name(), value);
        output.push(out);
    }
    Relation::new(output, tables)
}

fn compute(f: &AggregateFn, bucket: &[&RelationEntry]) -> Value {
    // Aggregates ignore NULL inputs, SQL-style.
    let values: Vec<Value> = bucket
        .iter()
        .filter_map(|e| e.get_field(&f.column).cloned())
        .filter(|v| !v.is_null())
        .collect();

    match f.kind {
        AggregateKind::Count => Value::Int(values.len() as i64),
        AggregateKind::Min => values
            .iter()
            .cloned()
            .min_by(|a, b| a.sort_cmp(b))
            .unwrap_or(Value::Null),
        AggregateKind::Max => values
            .iter()
            .cloned()
            .max_by(|a, b| a.sort_cmp(b))
            .unwrap_or(Value::Null),
        AggregateKind::Sum => sum(&values),
        AggregateKind::Avg => {
            let nums = numeric(&values);
            if nums.is_empty() {
                Value::Null
            } else {
                Value::Float(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        AggregateKind::Stddev => {
            let nums = numeric(&values);
            if nums.len() < 2 {
                return Value::Null;
            }
            let mean = nums.iter().sum::<f64>() / nums.len() as f64;
            let variance = nums.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                / (nums.len() - 1) as f64;
            Value::Float(variance.sqrt())
        }
        AggregateKind::Geomean => {
            let nums: Vec<f64> = numeric(&values).into_iter().filter(|v| *v > 0.0).collect();
            if nums.is_empty() {
                return Value::Null;
            }
            let log_sum: f64 = nums.iter().map(|v| v.ln()).sum();
            Value::Float((log_sum / nums.len() as f64).exp())
        }
        // Reached only through the dedicated path above.
        AggregateKind::Distinct => Value::Null,
    }
}

/// Integer sum stays integral; any float promotes the result.
fn sum(values: &[Value]) -> Value {
    if values.is_empty() {
        return Value::Null;
    }
    if values.iter().all(|v| matches!(v, Value::Int(_))) {
        Value::Int(
            values
                .iter()
                .map(|v| match v {
                    Value::Int(i) => *i,
                    _ => 0,
                })
                .sum(),
        )
    } else {
        Value::Float(numeric(values).iter().sum())
    }
}

fn numeric(values: &[Value]) -> Vec<f64> {
    values.iter().filter_map(Value::as_f64).collect()
}
