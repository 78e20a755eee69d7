//! # LarkDB — In-Process Relational Query Engine
//!
//! LarkDB brings a typed, builder-style query DSL to environments that
//! provide an asynchronous key-value object store but no query language.
//! Queries are planned as relational operator trees, executed over an
//! in-memory relation model, and persisted through a logged transaction
//! layer to the backing store.
//!
//! ## Quick Start
//!
//! ```ignore
//! use larkdb::{Database, MemoryStore, Schema, TableBuilder};
//! use larkdb::types::DataType;
//! use std::sync::Arc;
//!
//! let schema = Schema::builder("app", 1)
//!     .table(
//!         TableBuilder::new("users")
//!             .column("id", DataType::Integer)
//!             .column("name", DataType::Text)
//!             .primary_key(["id"]),
//!     )
//!     .build()?;
//!
//! let db = Database::open(schema, Arc::new(MemoryStore::new())).await?;
//! let users = db.table("users")?;
//!
//! db.insert()
//!     .into("users")?
//!     .values(vec![Row::from_pairs([("id", 1.into()), ("name", "Ada".into())])])?
//!     .exec()
//!     .await?;
//!
//! let rows = db
//!     .select_all()
//!     .from("users")?
//!     .where_(users.column_handle("name")?.eq("Ada"))?
//!     .exec()
//!     .await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │     Builder DSL (select/insert/...)       │
//! ├───────────────────────────────────────────┤
//! │  Planner: logical tree → rewrites →       │
//! │  physical operators                       │
//! ├───────────────────────────────────────────┤
//! │  Execution over Relations │ Transactions  │
//! ├──────────────┬────────────┴───────────────┤
//! │   Indices    │    Row cache + journal     │
//! ├──────────────┴────────────────────────────┤
//! │   Async backing-store adapter (KV)        │
//! └───────────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`schema`]: immutable schema model and builder
//! - [`types`]: runtime values and column types
//! - [`encoding`]: order-preserving key encoding and key ranges
//! - [`index`]: ordered/hash/row-id indices behind one capability trait
//! - [`relation`]: the tuple-stream currency between operators
//! - [`cache`] / [`journal`]: committed row residence and pending writes
//! - [`store`]: the asynchronous backing-store contract
//! - [`plan`] / [`exec`]: planning, rewrites, physical execution
//! - [`txn`]: locks, the commit state machine, degraded mode
//! - [`query`]: the public builder DSL

pub mod cache;
pub mod config;
pub mod context;
pub mod database;
pub mod encoding;
pub mod error;
pub mod exec;
pub mod index;
pub mod journal;
pub mod plan;
pub mod predicate;
pub mod query;
pub mod relation;
pub mod row;
pub mod schema;
pub mod store;
pub mod txn;
pub mod types;

pub use database::Database;
pub use error::{DbError, ErrorCode};
pub use predicate::{and, or, Predicate};
pub use query::{agg, Order};
pub use relation::{Relation, RelationEntry};
pub use row::{Row, RowId, DUMMY_ROW_ID};
pub use schema::{Column, Schema, TableBuilder};
pub use store::{MemoryStore, Store};
pub use txn::Transaction;
pub use types::{DataType, Value};
