//! Schema construction and validation.
//!
//! `SchemaBuilder` mirrors the declarative schema document (`name`,
//! `version`, tables with columns, primary key, indices, nullability,
//! foreign keys). All structural validation happens in `build()`, after
//! every table has been gathered, so foreign keys may reference tables
//! declared later or form cycles.

use super::{ColumnDef, ForeignKeyDef, IndexDef, Schema, TableDef};
use crate::config::METADATA_TABLE;
use crate::error::syntax;
use crate::types::DataType;
use eyre::Result;
use hashbrown::HashSet;

pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnDef>,
    primary_key: Option<Vec<String>>,
    indices: Vec<IndexDef>,
    foreign_keys: Vec<ForeignKeyDef>,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            indices: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(ColumnDef::new(name, data_type));
        self
    }

    pub fn nullable_column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(ColumnDef::new(name, data_type).nullable());
        self
    }

    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn index<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indices.push(IndexDef::new(
            name,
            columns.into_iter().map(Into::into).collect(),
            false,
        ));
        self
    }

    pub fn unique_index<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indices.push(IndexDef::new(
            name,
            columns.into_iter().map(Into::into).collect(),
            true,
        ));
        self
    }

    pub fn foreign_key<I, S, J, T>(
        mut self,
        name: impl Into<String>,
        local_columns: I,
        remote_table: impl Into<String>,
        remote_columns: J,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.foreign_keys.push(ForeignKeyDef::new(
            name,
            local_columns.into_iter().map(Into::into).collect(),
            remote_table,
            remote_columns.into_iter().map(Into::into).collect(),
        ));
        self
    }

    fn finish(self) -> Result<TableDef> {
        if self.name.is_empty() {
            return Err(syntax("table name may not be empty"));
        }
        if self.name == METADATA_TABLE {
            return Err(syntax(format!("table name '{METADATA_TABLE}' is reserved")));
        }
        if self.columns.is_empty() {
            return Err(syntax(format!("table '{}' declares no columns", self.name)));
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name()) {
                return Err(syntax(format!(
                    "duplicate column '{}' on table '{}'",
                    col.name(),
                    self.name
                )));
            }
        }

        drop(seen);

        if let Some(pk) = &self.primary_key {
            for col_name in pk {
                let col = self.columns.iter().find(|c| c.name() == col_name);
                match col {
                    None => {
                        return Err(syntax(format!(
                            "primary key of '{}' names unknown column '{}'",
                            self.name, col_name
                        )))
                    }
                    // Nullability in primary index keys is forbidden.
                    Some(c) if c.is_nullable() => {
                        return Err(syntax(format!(
                            "primary key column '{}.{}' may not be nullable",
                            self.name, col_name
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        let mut index_names = HashSet::new();
        for index in &self.indices {
            if !index_names.insert(index.name()) {
                return Err(syntax(format!(
                    "duplicate index '{}' on table '{}'",
                    index.name(),
                    self.name
                )));
            }
            for col_name in index.columns() {
                if !self.columns.iter().any(|c| c.name() == col_name) {
                    return Err(syntax(format!(
                        "index '{}' on '{}' names unknown column '{}'",
                        index.name(),
                        self.name,
                        col_name
                    )));
                }
            }
        }

        drop(index_names);

        for fk in &self.foreign_keys {
            for col_name in fk.local_columns() {
                if !self.columns.iter().any(|c| c.name() == col_name) {
                    return Err(syntax(format!(
                        "foreign key '{}' on '{}' names unknown local column '{}'",
                        fk.name(),
                        self.name,
                        col_name
                    )));
                }
            }
            if fk.local_columns().len() != fk.remote_columns().len() {
                return Err(syntax(format!(
                    "foreign key '{}' on '{}' has mismatched column counts",
                    fk.name(),
                    self.name
                )));
            }
        }

        Ok(TableDef::from_parts(
            self.name,
            self.columns,
            self.primary_key,
            self.indices,
            self.foreign_keys,
        ))
    }
}

pub struct SchemaBuilder {
    name: String,
    version: u32,
    tables: Vec<TableBuilder>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            tables: Vec::new(),
        }
    }

    pub fn table(mut self, table: TableBuilder) -> Self {
        self.tables.push(table);
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut tables = Vec::with_capacity(self.tables.len());
        for tb in self.tables {
            tables.push(tb.finish()?);
        }

        let mut names = HashSet::new();
        for table in &tables {
            if !names.insert(table.name()) {
                return Err(syntax(format!("duplicate table '{}'", table.name())));
            }
        }

        drop(names);

        // Cross-table FK resolution happens only now, with every table in
        // hand, so declaration order and cycles are immaterial.
        for table in &tables {
            for fk in table.foreign_keys() {
                let remote = tables.iter().find(|t| t.name() == fk.remote_table());
                let Some(remote) = remote else {
                    return Err(syntax(format!(
                        "foreign key '{}' on '{}' references unknown table '{}'",
                        fk.name(),
                        table.name(),
                        fk.remote_table()
                    )));
                };
                for (local, remote_col) in fk.local_columns().iter().zip(fk.remote_columns()) {
                    let Some(remote_def) = remote.try_column(remote_col) else {
                        return Err(syntax(format!(
                            "foreign key '{}' on '{}' references unknown column '{}.{}'",
                            fk.name(),
                            table.name(),
                            fk.remote_table(),
                            remote_col
                        )));
                    };
                    let local_def = table.column(local)?;
                    if local_def.data_type() != remote_def.data_type() {
                        return Err(syntax(format!(
                            "foreign key '{}' on '{}': type of '{}' does not match '{}.{}'",
                            fk.name(),
                            table.name(),
                            local,
                            fk.remote_table(),
                            remote_col
                        )));
                    }
                }
            }
        }

        Ok(Schema::from_parts(self.name, self.version, tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn nullable_primary_key_rejected() {
        let err = Schema::builder("s", 1)
            .table(
                TableBuilder::new("t")
                    .nullable_column("id", DataType::Integer)
                    .primary_key(["id"]),
            )
            .build()
            .unwrap_err();
        assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
    }

    #[test]
    fn duplicate_column_rejected() {
        let err = Schema::builder("s", 1)
            .table(
                TableBuilder::new("t")
                    .column("a", DataType::Integer)
                    .column("a", DataType::Text),
            )
            .build()
            .unwrap_err();
        assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
    }

    #[test]
    fn reserved_table_name_rejected() {
        let err = Schema::builder("s", 1)
            .table(TableBuilder::new(METADATA_TABLE).column("a", DataType::Integer))
            .build()
            .unwrap_err();
        assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
    }

    #[test]
    fn fk_type_mismatch_rejected() {
        let err = Schema::builder("s", 1)
            .table(
                TableBuilder::new("parent")
                    .column("id", DataType::Integer)
                    .primary_key(["id"]),
            )
            .table(
                TableBuilder::new("child")
                    .column("id", DataType::Integer)
                    .column("parent_id", DataType::Text)
                    .primary_key(["id"])
                    .foreign_key("fk", ["parent_id"], "parent", ["id"]),
            )
            .build()
            .unwrap_err();
        assert_eq!(ErrorCode::of(&err), ErrorCode::Syntax);
    }

    #[test]
    fn unique_index_on_nullable_column_allowed() {
        let schema = Schema::builder("s", 1)
            .table(
                TableBuilder::new("t")
                    .column("id", DataType::Integer)
                    .nullable_column("email", DataType::Text)
                    .primary_key(["id"])
                    .unique_index("idx_email", ["email"]),
            )
            .build();
        assert!(schema.is_ok());
    }
}
