//! Table, column, index, and foreign-key definitions.

use crate::error::not_found;
use crate::types::DataType;
use eyre::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    name: String,
    data_type: DataType,
    nullable: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// A secondary index declaration. The primary key is kept separately on the
/// table; spec-level index kind (primary / unique / non-unique) is derived
/// where the planner needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    name: String,
    columns: Vec<String>,
    unique: bool,
}

impl IndexDef {
    pub fn new(name: impl Into<String>, columns: Vec<String>, unique: bool) -> Self {
        Self {
            name: name.into(),
            columns,
            unique,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }
}

/// Foreign-key constraint: local columns reference remote table/columns by
/// name. Resolution happens at validation time so FK graphs may cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDef {
    name: String,
    local_columns: Vec<String>,
    remote_table: String,
    remote_columns: Vec<String>,
}

impl ForeignKeyDef {
    pub fn new(
        name: impl Into<String>,
        local_columns: Vec<String>,
        remote_table: impl Into<String>,
        remote_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            local_columns,
            remote_table: remote_table.into(),
            remote_columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_columns(&self) -> &[String] {
        &self.local_columns
    }

    pub fn remote_table(&self) -> &str {
        &self.remote_table
    }

    pub fn remote_columns(&self) -> &[String] {
        &self.remote_columns
    }
}

#[derive(Debug, Clone)]
pub struct TableDef {
    name: String,
    columns: Vec<ColumnDef>,
    primary_key: Option<Vec<String>>,
    indices: Vec<IndexDef>,
    foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    pub(crate) fn from_parts(
        name: String,
        columns: Vec<ColumnDef>,
        primary_key: Option<Vec<String>>,
        indices: Vec<IndexDef>,
        foreign_keys: Vec<ForeignKeyDef>,
    ) -> Self {
        Self {
            name,
            columns,
            primary_key,
            indices,
            foreign_keys,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Result<&ColumnDef> {
        self.try_column(name).ok_or_else(|| {
            not_found(format!(
                "column '{}' does not exist on table '{}'",
                name, self.name
            ))
        })
    }

    pub fn try_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn primary_key(&self) -> Option<&[String]> {
        self.primary_key.as_deref()
    }

    /// Secondary indices in declaration order.
    pub fn indices(&self) -> &[IndexDef] {
        &self.indices
    }

    pub fn foreign_keys(&self) -> &[ForeignKeyDef] {
        &self.foreign_keys
    }

    /// Detached typed handle for the query builder and predicates.
    pub fn column_handle(&self, name: &str) -> Result<Column> {
        let def = self.column(name)?;
        Ok(Column {
            table: self.name.clone(),
            name: def.name().to_string(),
            data_type: def.data_type(),
            alias: None,
        })
    }
}

/// A typed `(table, column)` descriptor. Cheap to clone; the query builder,
/// predicates, projections, and sort keys all traffic in these. An alias,
/// when set, redirects reads and writes to a flat slot on the relation
/// entry instead of the (possibly prefixed) payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    table: String,
    name: String,
    data_type: DataType,
    alias: Option<String>,
}

impl Column {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Returns a copy of this column carrying an output alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }
}
