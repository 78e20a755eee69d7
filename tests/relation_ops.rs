//! Relation calculus: prefix-aware joins, the empty-relation short
//! circuit, and the set-operation laws over entry ids.

use larkdb::relation::Relation;
use larkdb::row::Row;
use larkdb::schema::{Schema, TableBuilder};
use larkdb::types::{DataType, Value};
use larkdb::DUMMY_ROW_ID;

fn schema() -> Schema {
    Schema::builder("s", 1)
        .table(
            TableBuilder::new("t1")
                .column("id", DataType::Integer)
                .column("v", DataType::Text),
        )
        .table(
            TableBuilder::new("t2")
                .column("id", DataType::Integer)
                .column("v", DataType::Text),
        )
        .build()
        .unwrap()
}

fn relation(table: &str, ids: &[u64]) -> Relation {
    let rows: Vec<Row> = ids
        .iter()
        .map(|id| {
            let mut row = Row::from_pairs([
                ("id", Value::Int(*id as i64)),
                ("v", Value::from(format!("{table}-{id}").as_str())),
            ]);
            row.set_id(*id);
            row
        })
        .collect();
    Relation::from_rows(rows, [table.to_string()])
}

#[test]
fn cross_product_is_prefix_applied_with_both_tables() {
    let schema = schema();
    let a = relation("t1", &[1, 2]);
    let b = relation("t2", &[7]);

    let crossed = a.cross(&b);
    assert_eq!(crossed.len(), 2);
    assert!(crossed.prefix_applied());
    assert!(crossed.tables().contains("t1"));
    assert!(crossed.tables().contains("t2"));

    let v1 = schema.table("t1").unwrap().column_handle("v").unwrap();
    let v2 = schema.table("t2").unwrap().column_handle("v").unwrap();
    for entry in crossed.entries() {
        assert!(entry.prefix_applied());
        assert_eq!(entry.row_id(), DUMMY_ROW_ID);
        assert!(entry.get_field(&v1).is_some(), "payload keyed by t1");
        assert_eq!(entry.get_field(&v2), Some(&Value::from("t2-7")));
    }
}

#[test]
fn zero_input_set_ops_return_the_empty_relation() {
    let union = Relation::union(&[]).unwrap();
    assert!(union.is_empty());
    assert!(union.tables().is_empty());

    let intersect = Relation::intersect(&[]).unwrap();
    assert!(intersect.is_empty());
    assert!(intersect.tables().is_empty());
}

#[test]
fn union_dedupes_and_is_commutative_on_ids() {
    let a = relation("t1", &[1, 2]);
    let b = relation("t1", &[3]);
    let a_again = Relation::new(a.entries().to_vec(), a.tables().clone());

    let ids = |r: &Relation| {
        let mut v: Vec<u64> = r.entries().iter().map(|e| e.id()).collect();
        v.sort_unstable();
        v
    };

    let ab = Relation::union(&[a.clone(), b.clone(), a_again]).unwrap();
    assert_eq!(ab.len(), 3, "duplicate entry ids must collapse");

    let ba = Relation::union(&[b, a]).unwrap();
    assert_eq!(ids(&ab), ids(&ba));

    let idempotent = Relation::union(&[ab.clone(), ab.clone()]).unwrap();
    assert_eq!(ids(&idempotent), ids(&ab));
}

#[test]
fn intersect_keeps_common_ids_and_is_idempotent() {
    let a = relation("t1", &[1, 2, 3]);
    let prefix = Relation::new(a.entries()[..2].to_vec(), a.tables().clone());

    let both = Relation::intersect(&[a.clone(), prefix]).unwrap();
    assert_eq!(both.len(), 2);

    let idempotent = Relation::intersect(&[both.clone(), both.clone()]).unwrap();
    assert_eq!(idempotent.len(), both.len());

    let disjoint = relation("t1", &[9]);
    assert!(Relation::intersect(&[a, disjoint]).unwrap().is_empty());
}

#[test]
fn set_ops_require_identical_table_sets() {
    let a = relation("t1", &[1]);
    let b = relation("t2", &[1]);
    assert!(Relation::union(&[a.clone(), b.clone()]).is_err());
    assert!(Relation::intersect(&[a.clone(), b.clone()]).is_err());
    assert!(a.except(&b).is_err());
}

#[test]
fn aliased_column_reads_the_flat_slot() {
    let schema = schema();
    let a = relation("t1", &[1]);
    let v = schema.table("t1").unwrap().column_handle("v").unwrap();
    let aliased = v.clone().with_alias("label");

    let mut entry = a.entries()[0].clone();
    entry.set_field(&aliased, Value::from("override"));
    assert_eq!(entry.get_field(&aliased), Some(&Value::from("override")));
    assert_eq!(entry.get_field(&v), Some(&Value::from("t1-1")));
}
