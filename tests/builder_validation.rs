//! Builder misuse matrix: fluent-call legality is checked at call time,
//! clause completeness at exec time, with the documented error codes.

use larkdb::row::Row;
use larkdb::schema::{Schema, TableBuilder};
use larkdb::types::{DataType, Value};
use larkdb::{Database, ErrorCode, MemoryStore};
use std::sync::Arc;

async fn open_db() -> Database {
    let schema = Schema::builder("app", 1)
        .table(
            TableBuilder::new("users")
                .column("id", DataType::Integer)
                .column("name", DataType::Text)
                .primary_key(["id"]),
        )
        .table(TableBuilder::new("log").column("line", DataType::Text))
        .build()
        .unwrap();
    Database::open(schema, Arc::new(MemoryStore::new()))
        .await
        .unwrap()
}

fn row(id: i64, name: &str) -> Row {
    Row::from_pairs([("id", Value::Int(id)), ("name", Value::from(name))])
}

#[tokio::test]
async fn insert_without_into_is_syntax_error() {
    let db = open_db().await;
    let err = db
        .insert()
        .values(vec![row(1, "ada")])
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
}

#[tokio::test]
async fn insert_without_values_is_syntax_error() {
    let db = open_db().await;
    let err = db.insert().into("users").unwrap().exec().await.unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
}

#[tokio::test]
async fn doubled_into_fails_at_call_time() {
    let db = open_db().await;
    let err = db
        .insert()
        .into("users")
        .unwrap()
        .into("users")
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
}

#[tokio::test]
async fn doubled_values_fails_at_call_time() {
    let db = open_db().await;
    let err = db
        .insert()
        .values(vec![row(1, "ada")])
        .unwrap()
        .values(vec![row(2, "bob")])
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
}

#[tokio::test]
async fn insert_or_replace_without_primary_key_is_constraint_error() {
    let db = open_db().await;
    let err = db
        .insert_or_replace()
        .into("log")
        .unwrap()
        .values(vec![Row::from_pairs([("line", Value::from("x"))])])
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Constraint);
}

#[tokio::test]
async fn insert_into_unknown_table_is_not_found() {
    let db = open_db().await;
    let err = db.insert().into("ghost").unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::NotFound);
}

#[tokio::test]
async fn select_without_from_is_syntax_error() {
    let db = open_db().await;
    let err = db.select_all().exec().await.unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
}

#[tokio::test]
async fn doubled_from_and_where_fail_at_call_time() {
    let db = open_db().await;
    let err = db
        .select_all()
        .from("users")
        .unwrap()
        .from("log")
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);

    let name = db.table("users").unwrap().column_handle("name").unwrap();
    let err = db
        .select_all()
        .from("users")
        .unwrap()
        .where_(name.eq("ada"))
        .unwrap()
        .where_(name.eq("bob"))
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
}

#[tokio::test]
async fn doubled_limit_and_skip_fail_at_call_time() {
    let db = open_db().await;
    let err = db
        .select_all()
        .from("users")
        .unwrap()
        .limit(1)
        .unwrap()
        .limit(2)
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);

    let err = db
        .select_all()
        .from("users")
        .unwrap()
        .skip(1)
        .unwrap()
        .skip(2)
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
}

#[tokio::test]
async fn empty_values_list_is_syntax_error() {
    let db = open_db().await;
    let err = db
        .insert()
        .into("users")
        .unwrap()
        .values(Vec::new())
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
}

#[tokio::test]
async fn update_without_set_is_syntax_error() {
    let db = open_db().await;
    let err = db.update("users").exec().await.unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
}

#[tokio::test]
async fn update_set_with_foreign_column_is_syntax_error() {
    let db = open_db().await;
    let line = db.table("log").unwrap().column_handle("line").unwrap();
    let err = db.update("users").set(line, "x").unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
}

#[tokio::test]
async fn delete_without_from_is_syntax_error() {
    let db = open_db().await;
    let err = db.delete().exec().await.unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
}

#[tokio::test]
async fn aggregate_with_ungrouped_column_is_syntax_error() {
    let db = open_db().await;
    let users = db.table("users").unwrap();
    let id = users.column_handle("id").unwrap();
    let name = users.column_handle("name").unwrap();
    let err = db
        .select([name.into(), larkdb::agg::count(id).into()])
        .from("users")
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
}
