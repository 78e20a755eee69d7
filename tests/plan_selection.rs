//! Access-path selection: index cost drives the choice, ties break by
//! index kind then declaration order, and every rewrite preserves query
//! results against the unoptimized plan.

use larkdb::context::Context;
use larkdb::exec::{execute, ExecContext};
use larkdb::index::IndexStore;
use larkdb::journal::Journal;
use larkdb::plan::{plan_query, plan_query_unoptimized, PhysicalNode, PlanContext};
use larkdb::predicate::and;
use larkdb::query::{Order, Query, SelectQuery, SortSpec};
use larkdb::relation::Relation;
use larkdb::row::Row;
use larkdb::schema::{Schema, TableBuilder};
use larkdb::store::MemoryStore;
use larkdb::types::{DataType, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

fn make_context(schema: Schema, rows_per_table: Vec<(&str, Vec<Row>)>) -> Context {
    let ctx = Context::new(schema, Arc::new(MemoryStore::new()));
    for (table, rows) in rows_per_table {
        let def = ctx.schema().table(table).unwrap().clone();
        ctx.cache().warm(table, rows.clone());
        ctx.indices().write().rebuild(&def, &rows).unwrap();
    }
    ctx
}

fn row(id: u64, pairs: Vec<(&str, Value)>) -> Row {
    let mut r = Row::from_pairs(pairs);
    r.set_id(id);
    r
}

fn select_from(table: &str) -> SelectQuery {
    SelectQuery {
        from: Some(table.to_string()),
        ..SelectQuery::default()
    }
}

fn plan(ctx: &Context, query: &Query) -> PhysicalNode {
    let indices = ctx.indices().read();
    let plan_ctx = PlanContext {
        schema: ctx.schema(),
        indices: &*indices,
        journal_touched: Default::default(),
    };
    plan_query(query, &plan_ctx).unwrap()
}

/// Runs one plan to a relation with a fresh journal.
fn run(ctx: &Context, node: &PhysicalNode) -> Relation {
    let mut journal = Journal::new();
    let mut exec_ctx = ExecContext { ctx, journal: &mut journal };
    execute(node, &mut exec_ctx).unwrap()
}

/// Unordered multiset of flattened payloads, for result comparison.
fn fingerprint(ctx: &Context, relation: &Relation) -> Vec<BTreeMap<String, String>> {
    let mut out: Vec<BTreeMap<String, String>> = relation
        .entries()
        .iter()
        .map(|entry| {
            let mut map = BTreeMap::new();
            for table in relation.tables() {
                let def = ctx.schema().table(table).unwrap();
                for column in def.columns() {
                    let handle = def.column_handle(column.name()).unwrap();
                    if let Some(value) = entry.get_field(&handle) {
                        map.insert(handle.qualified_name(), format!("{value:?}"));
                    }
                }
            }
            map
        })
        .collect();
    out.sort();
    out
}

#[test]
fn cheaper_index_wins() {
    let schema = Schema::builder("s", 1)
        .table(
            TableBuilder::new("t")
                .column("a", DataType::Integer)
                .column("b", DataType::Integer)
                .index("idx_a", ["a"])
                .index("idx_b", ["b"]),
        )
        .build()
        .unwrap();

    // a=1 matches 10 rows, b=2 matches 3 rows.
    let rows: Vec<Row> = (0..20u64)
        .map(|i| {
            row(
                i,
                vec![
                    ("a", Value::Int(if i < 10 { 1 } else { 100 + i as i64 })),
                    ("b", Value::Int(if i < 3 { 2 } else { 200 + i as i64 })),
                ],
            )
        })
        .collect();
    let ctx = make_context(schema, vec![("t", rows)]);

    let a = ctx.schema().table("t").unwrap().column_handle("a").unwrap();
    let b = ctx.schema().table("t").unwrap().column_handle("b").unwrap();
    let mut query = select_from("t");
    query.filter = Some(and([a.eq(1i64), b.eq(2i64)]));
    let query = Query::Select(query);

    let physical = plan(&ctx, &query);
    // The cost-3 index must be underneath; the consumed conjunct's
    // partner stays as a residual filter.
    let PhysicalNode::Filter(filter) = &physical else {
        panic!("expected residual filter, got {physical:?}");
    };
    let PhysicalNode::IndexScan(scan) = filter.input.as_ref() else {
        panic!("expected index scan, got {:?}", filter.input);
    };
    assert_eq!(scan.index, "t.idx_b");
}

#[test]
fn primary_key_beats_equal_cost_unique_index() {
    let schema = Schema::builder("s", 1)
        .table(
            TableBuilder::new("t")
                .column("id", DataType::Integer)
                .primary_key(["id"])
                .unique_index("idx_id", ["id"]),
        )
        .build()
        .unwrap();
    let rows: Vec<Row> = (0..5u64)
        .map(|i| row(i, vec![("id", Value::Int(i as i64))]))
        .collect();
    let ctx = make_context(schema, vec![("t", rows)]);

    let id = ctx.schema().table("t").unwrap().column_handle("id").unwrap();
    let mut query = select_from("t");
    query.filter = Some(id.eq(3i64));
    let physical = plan(&ctx, &Query::Select(query));

    assert!(
        matches!(physical, PhysicalNode::PrimaryKeyLookup(_)),
        "primary access path must win the tie: {physical:?}"
    );
}

#[test]
fn unique_index_beats_equal_cost_non_unique() {
    let schema = Schema::builder("s", 1)
        .table(
            TableBuilder::new("t")
                .column("c", DataType::Integer)
                .index("plain_c", ["c"])
                .unique_index("uniq_c", ["c"]),
        )
        .build()
        .unwrap();
    let rows: Vec<Row> = (0..5u64)
        .map(|i| row(i, vec![("c", Value::Int(i as i64))]))
        .collect();
    let ctx = make_context(schema, vec![("t", rows)]);

    let c = ctx.schema().table("t").unwrap().column_handle("c").unwrap();
    let mut query = select_from("t");
    query.filter = Some(c.eq(3i64));
    let physical = plan(&ctx, &Query::Select(query));

    let PhysicalNode::IndexScan(scan) = &physical else {
        panic!("expected index scan: {physical:?}");
    };
    assert_eq!(scan.index, "t.uniq_c", "unique must beat non-unique on a tie");
}

#[test]
fn declaration_order_breaks_remaining_ties() {
    let schema = Schema::builder("s", 1)
        .table(
            TableBuilder::new("t")
                .column("c", DataType::Integer)
                .index("first_c", ["c"])
                .index("second_c", ["c"]),
        )
        .build()
        .unwrap();
    let rows: Vec<Row> = (0..5u64)
        .map(|i| row(i, vec![("c", Value::Int(i as i64))]))
        .collect();
    let ctx = make_context(schema, vec![("t", rows)]);

    let c = ctx.schema().table("t").unwrap().column_handle("c").unwrap();
    let mut query = select_from("t");
    query.filter = Some(c.eq(3i64));
    let physical = plan(&ctx, &Query::Select(query));

    let PhysicalNode::IndexScan(scan) = &physical else {
        panic!("expected index scan: {physical:?}");
    };
    assert_eq!(scan.index, "t.first_c");
}

#[test]
fn optimized_plans_match_unoptimized_results() {
    let schema = Schema::builder("s", 1)
        .table(
            TableBuilder::new("users")
                .column("id", DataType::Integer)
                .column("dept_id", DataType::Integer)
                .column("age", DataType::Integer)
                .primary_key(["id"])
                .index("idx_age", ["age"]),
        )
        .table(
            TableBuilder::new("depts")
                .column("id", DataType::Integer)
                .column("name", DataType::Text)
                .primary_key(["id"]),
        )
        .build()
        .unwrap();

    let users: Vec<Row> = (0..30u64)
        .map(|i| {
            row(
                i,
                vec![
                    ("id", Value::Int(i as i64)),
                    ("dept_id", Value::Int((i % 3) as i64)),
                    ("age", Value::Int(20 + (i % 7) as i64)),
                ],
            )
        })
        .collect();
    let depts: Vec<Row> = (0..3u64)
        .map(|i| {
            row(
                i,
                vec![
                    ("id", Value::Int(i as i64)),
                    ("name", Value::from(format!("d{i}").as_str())),
                ],
            )
        })
        .collect();
    let ctx = make_context(schema, vec![("users", users), ("depts", depts)]);

    let u = ctx.schema().table("users").unwrap();
    let d = ctx.schema().table("depts").unwrap();
    let age = u.column_handle("age").unwrap();
    let uid = u.column_handle("id").unwrap();
    let dept_id = u.column_handle("dept_id").unwrap();
    let did = d.column_handle("id").unwrap();

    // A golden set covering filters, pk lookups, joins, order, and
    // pagination.
    let mut filtered = select_from("users");
    filtered.filter = Some(and([age.gte(22i64), age.lt(25i64)]));

    let mut pk = select_from("users");
    pk.filter = Some(uid.eq(7i64));

    let mut joined = select_from("users");
    joined.joins.push(larkdb::query::JoinSpec {
        table: "depts".into(),
        join_type: larkdb::query::JoinType::Inner,
        predicate: dept_id.eq_col(&did),
    });
    joined.filter = Some(age.eq(21i64));

    let mut paged = select_from("users");
    paged.order_by.push(SortSpec {
        column: age.clone(),
        order: Order::Asc,
    });
    paged.order_by.push(SortSpec {
        column: uid.clone(),
        order: Order::Desc,
    });
    paged.skip = Some(5);
    paged.limit = Some(10);

    for query in [filtered, pk, joined, paged].map(Query::Select) {
        let (optimized, raw) = {
            let indices = ctx.indices().read();
            let plan_ctx = PlanContext {
                schema: ctx.schema(),
                indices: &*indices,
                journal_touched: Default::default(),
            };
            (
                plan_query(&query, &plan_ctx).unwrap(),
                plan_query_unoptimized(&query, &plan_ctx).unwrap(),
            )
        };

        let left = fingerprint(&ctx, &run(&ctx, &optimized));
        let right = fingerprint(&ctx, &run(&ctx, &raw));
        assert_eq!(left, right, "plans diverged for {query:?}");
    }
}
