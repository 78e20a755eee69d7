//! # Schema Model
//!
//! This module provides the immutable schema consumed by the planner,
//! constraint validation, and the index subsystem. A [`Schema`] is built
//! once through [`SchemaBuilder`] and never mutated after `build()`;
//! version upgrades are a separate protocol outside the engine core.
//!
//! ## Structure
//!
//! - **Schema**: named, versioned collection of tables, exposed by name and
//!   by declaration order.
//! - **TableDef**: ordered column list, optional (possibly composite)
//!   primary key, secondary indices, foreign keys.
//! - **ColumnDef**: name, data type, nullability.
//! - **Column**: a detached typed handle `(table, column)` used by the
//!   query builder and predicates; carries an optional output alias.
//!
//! ## Foreign Keys
//!
//! Foreign keys form a directed graph over tables that may contain cycles.
//! `ForeignKeyDef` therefore stores the remote table and columns by *name*;
//! resolution happens against the schema at validation time, never through
//! an owning handle.

mod builder;
mod table;

pub use builder::{SchemaBuilder, TableBuilder};
pub use table::{Column, ColumnDef, ForeignKeyDef, IndexDef, TableDef};

use crate::error::not_found;
use eyre::Result;
use hashbrown::HashMap;

#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    version: u32,
    tables: Vec<TableDef>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    pub(crate) fn from_parts(name: String, version: u32, tables: Vec<TableDef>) -> Self {
        let by_name = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();
        Self {
            name,
            version,
            tables,
            by_name,
        }
    }

    pub fn builder(name: impl Into<String>, version: u32) -> SchemaBuilder {
        SchemaBuilder::new(name, version)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Tables in declaration order.
    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Result<&TableDef> {
        self.try_table(name)
            .ok_or_else(|| not_found(format!("table '{name}' does not exist")))
    }

    pub fn try_table(&self, name: &str) -> Option<&TableDef> {
        self.by_name.get(name).map(|&i| &self.tables[i])
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Tables related to `table` through foreign keys, in either
    /// direction. A writer's lock scope extends over these as readers so
    /// commit-time referential validation reads a stable snapshot.
    pub fn fk_neighbors(&self, table: &str) -> Vec<String> {
        let mut neighbors = Vec::new();
        let Some(def) = self.try_table(table) else {
            return neighbors;
        };
        for fk in def.foreign_keys() {
            if fk.remote_table() != table {
                neighbors.push(fk.remote_table().to_string());
            }
        }
        for other in &self.tables {
            if other.name() == table {
                continue;
            }
            if other
                .foreign_keys()
                .iter()
                .any(|fk| fk.remote_table() == table)
            {
                neighbors.push(other.name().to_string());
            }
        }
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::DataType;

    fn sample_schema() -> Schema {
        Schema::builder("hr", 1)
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
                    .nullable_column("nick", DataType::Text)
                    .primary_key(["id"])
                    .index("idx_dept", ["dept_id"])
                    .foreign_key("fk_dept", ["dept_id"], "departments", ["id"]),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn lookup_by_name_and_order() {
        let schema = sample_schema();
        assert_eq!(schema.tables().len(), 2);
        assert_eq!(schema.tables()[0].name(), "departments");
        assert!(schema.table("employees").is_ok());
        assert!(schema.table("ghost").is_err());
    }

    #[test]
    fn missing_table_reports_not_found() {
        let schema = sample_schema();
        let err = schema.table("ghost").unwrap_err();
        assert_eq!(ErrorCode::of(&err), ErrorCode::NotFound);
    }

    #[test]
    fn cyclic_foreign_keys_build() {
        // a -> b and b -> a: legal because FK targets are name-resolved.
        let schema = Schema::builder("cyc", 1)
            .table(
                TableBuilder::new("a")
                    .column("id", DataType::Integer)
                    .nullable_column("b_id", DataType::Integer)
                    .primary_key(["id"])
                    .foreign_key("fk_b", ["b_id"], "b", ["id"]),
            )
            .table(
                TableBuilder::new("b")
                    .column("id", DataType::Integer)
                    .nullable_column("a_id", DataType::Integer)
                    .primary_key(["id"])
                    .foreign_key("fk_a", ["a_id"], "a", ["id"]),
            )
            .build();
        assert!(schema.is_ok());
    }
}
