//! Transaction semantics: rollback integrity, commit atomicity,
//! isolation, cancellation, degraded mode, and persistence across
//! reopen.

use larkdb::row::Row;
use larkdb::schema::{Schema, TableBuilder};
use larkdb::types::{DataType, Value};
use larkdb::{agg, Database, ErrorCode, MemoryStore};
use std::sync::Arc;

fn schema() -> Schema {
    Schema::builder("app", 1)
        .table(
            TableBuilder::new("departments")
                .column("id", DataType::Integer)
                .column("name", DataType::Text)
                .primary_key(["id"]),
        )
        .table(
            TableBuilder::new("employees")
                .column("id", DataType::Integer)
                .column("dept_id", DataType::Integer)
                .column("name", DataType::Text)
                .primary_key(["id"])
                .foreign_key("fk_dept", ["dept_id"], "departments", ["id"]),
        )
        .build()
        .unwrap()
}

async fn open_db(store: Arc<MemoryStore>) -> Database {
    Database::open(schema(), store).await.unwrap()
}

fn dept(id: i64, name: &str) -> Row {
    Row::from_pairs([("id", Value::Int(id)), ("name", Value::from(name))])
}

fn employee(id: i64, dept_id: i64, name: &str) -> Row {
    Row::from_pairs([
        ("id", Value::Int(id)),
        ("dept_id", Value::Int(dept_id)),
        ("name", Value::from(name)),
    ])
}

async fn count(db: &Database, table: &str) -> i64 {
    let def = db.table(table).unwrap();
    let id = def.column_handle("id").unwrap();
    let count = agg::count(id);
    let slot = count.slot_name();
    let rel = db
        .select([count.into()])
        .from(table)
        .unwrap()
        .exec()
        .await
        .unwrap();
    match rel.entries()[0].get_slot(&slot) {
        Some(Value::Int(n)) => *n,
        other => panic!("unexpected count value {other:?}"),
    }
}

#[tokio::test]
async fn foreign_key_violation_rolls_back_whole_batch() {
    let db = open_db(Arc::new(MemoryStore::new())).await;
    db.insert()
        .into("departments")
        .unwrap()
        .values(vec![dept(1, "eng")])
        .unwrap()
        .exec()
        .await
        .unwrap();

    // Ten valid employees then one referencing a missing department.
    let mut rows: Vec<Row> = (0..10).map(|i| employee(i, 1, "ok")).collect();
    rows.push(employee(10, 999, "ghost-dept"));

    let err = db
        .insert()
        .into("employees")
        .unwrap()
        .values(rows)
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Constraint);
    assert_eq!(count(&db, "employees").await, 0, "no partial insert");
}

#[tokio::test]
async fn constraint_failure_leaves_store_untouched() {
    let store = Arc::new(MemoryStore::new());
    let db = open_db(store.clone()).await;
    db.insert()
        .into("departments")
        .unwrap()
        .values(vec![dept(1, "eng")])
        .unwrap()
        .exec()
        .await
        .unwrap();

    // Duplicate primary key within one batch.
    let err = db
        .insert()
        .into("departments")
        .unwrap()
        .values(vec![dept(2, "a"), dept(2, "b")])
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Constraint);

    assert_eq!(count(&db, "departments").await, 1);
    assert_eq!(store.stored_row_count("departments"), 1);
}

#[tokio::test]
async fn committed_primary_key_conflict_detected() {
    let db = open_db(Arc::new(MemoryStore::new())).await;
    db.insert()
        .into("departments")
        .unwrap()
        .values(vec![dept(1, "eng")])
        .unwrap()
        .exec()
        .await
        .unwrap();
    let err = db
        .insert()
        .into("departments")
        .unwrap()
        .values(vec![dept(1, "dup")])
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Constraint);
}

#[tokio::test]
async fn read_your_writes_inside_a_batch_invisible_outside_until_commit() {
    let db = open_db(Arc::new(MemoryStore::new())).await;
    db.insert()
        .into("departments")
        .unwrap()
        .values(vec![dept(1, "eng")])
        .unwrap()
        .exec()
        .await
        .unwrap();

    let tx = db.create_transaction();
    let insert = db
        .insert()
        .into("employees")
        .unwrap()
        .values(vec![employee(1, 1, "ada")])
        .unwrap()
        .into_query()
        .unwrap();
    let select = db
        .select_all()
        .from("employees")
        .unwrap()
        .into_query()
        .unwrap();

    let results = tx.exec(vec![insert, select]).await.unwrap();
    // The select inside the batch sees the journal overlay.
    assert_eq!(results[1].len(), 1);
    // After commit it is visible everywhere.
    assert_eq!(count(&db, "employees").await, 1);
}

#[tokio::test]
async fn cancellation_before_commit_is_cancelled_outcome() {
    let db = open_db(Arc::new(MemoryStore::new())).await;
    let tx = db.create_transaction();
    let handle = tx.cancel_handle();
    handle.cancel();

    let insert = db
        .insert()
        .into("departments")
        .unwrap()
        .values(vec![dept(1, "eng")])
        .unwrap()
        .into_query()
        .unwrap();
    let err = tx.exec(vec![insert]).await.unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Cancelled);
    assert_eq!(count(&db, "departments").await, 0);
}

#[tokio::test]
async fn store_failure_at_commit_degrades_database() {
    let store = Arc::new(MemoryStore::new());
    let db = open_db(store.clone()).await;

    store.set_fail_writes(true);
    let err = db
        .insert()
        .into("departments")
        .unwrap()
        .values(vec![dept(1, "eng")])
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Store);
    assert!(db.is_degraded());

    // Writes are refused while degraded; reads still run.
    store.set_fail_writes(false);
    let err = db
        .insert()
        .into("departments")
        .unwrap()
        .values(vec![dept(2, "ops")])
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Store);
    assert!(db.select_all().from("departments").unwrap().exec().await.is_ok());

    // Reconciliation clears the flag and writes resume.
    db.clear_degraded();
    db.insert()
        .into("departments")
        .unwrap()
        .values(vec![dept(3, "hr")])
        .unwrap()
        .exec()
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_writers_serialize_through_table_locks() {
    let db = Arc::new(open_db(Arc::new(MemoryStore::new())).await);

    let mut handles = Vec::new();
    for i in 0..4i64 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.insert()
                .into("departments")
                .unwrap()
                .values(vec![dept(i, "d")])
                .unwrap()
                .exec()
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(count(&db, "departments").await, 4);
}

#[tokio::test]
async fn rows_survive_reopen_and_row_ids_stay_monotonic() {
    let store = Arc::new(MemoryStore::new());
    {
        let db = open_db(store.clone()).await;
        db.insert()
            .into("departments")
            .unwrap()
            .values(vec![dept(1, "eng"), dept(2, "ops")])
            .unwrap()
            .exec()
            .await
            .unwrap();
        db.close().await.unwrap();
    }

    let db = open_db(store.clone()).await;
    assert_eq!(count(&db, "departments").await, 2);

    // Deleting a row then reinserting must not reuse its row id.
    let id = db
        .table("departments")
        .unwrap()
        .column_handle("id")
        .unwrap();
    let deleted = db
        .delete()
        .from("departments")
        .unwrap()
        .where_(id.eq(2i64))
        .unwrap()
        .exec()
        .await
        .unwrap();
    let freed_row_id = deleted.entries()[0].row_id();

    let inserted = db
        .insert()
        .into("departments")
        .unwrap()
        .values(vec![dept(3, "hr")])
        .unwrap()
        .exec()
        .await
        .unwrap();
    assert!(inserted.entries()[0].row_id() > freed_row_id);
}

#[tokio::test]
async fn delete_of_referenced_row_is_constraint_error() {
    let db = open_db(Arc::new(MemoryStore::new())).await;
    db.insert()
        .into("departments")
        .unwrap()
        .values(vec![dept(1, "eng")])
        .unwrap()
        .exec()
        .await
        .unwrap();
    db.insert()
        .into("employees")
        .unwrap()
        .values(vec![employee(1, 1, "ada")])
        .unwrap()
        .exec()
        .await
        .unwrap();

    let id = db
        .table("departments")
        .unwrap()
        .column_handle("id")
        .unwrap();
    let err = db
        .delete()
        .from("departments")
        .unwrap()
        .where_(id.eq(1i64))
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Constraint);
    assert_eq!(count(&db, "departments").await, 1);
}
