//! Schema model and DDL rendering
//!
//! Migration authors may describe tables with this model and render the
//! matching `CREATE TABLE` statements for a dialect instead of writing DDL by
//! hand. Nothing here is derived from a live database.
//!
//! ```rust
//! use worksonmydb::core::schema::{bool, int, table, varchar, ColumnDefinition};
//! use worksonmydb::dialects::MYSQL;
//!
//! let users = table(
//!     "users",
//!     vec![
//!         ColumnDefinition::new("id", int()).primary_key(),
//!         ColumnDefinition::new("email", varchar(255)).not_null().unique(),
//!         ColumnDefinition::new("active", bool()).not_null().default_value(true),
//!     ],
//! );
//! let sql = users.create_sql(&MYSQL).unwrap();
//! assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `users`"));
//! ```

use super::dialect::{validate_identifier, Dialect};
use super::error::{Result, ToolkitError};
use super::value::DatabaseValue;
use serde::{Deserialize, Serialize};

/// Logical column kinds understood by every dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Int,
    Text,
    Varchar,
    Bool,
    Datetime,
    Json,
}

/// A column kind plus its optional length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    pub kind: ColumnKind,
    pub length: Option<u32>,
}

pub fn int() -> ColumnType {
    ColumnType {
        kind: ColumnKind::Int,
        length: None,
    }
}

pub fn text() -> ColumnType {
    ColumnType {
        kind: ColumnKind::Text,
        length: None,
    }
}

pub fn varchar(length: u32) -> ColumnType {
    ColumnType {
        kind: ColumnKind::Varchar,
        length: Some(length),
    }
}

pub fn bool() -> ColumnType {
    ColumnType {
        kind: ColumnKind::Bool,
        length: None,
    }
}

pub fn datetime() -> ColumnType {
    ColumnType {
        kind: ColumnKind::Datetime,
        length: None,
    }
}

pub fn json() -> ColumnType {
    ColumnType {
        kind: ColumnKind::Json,
        length: None,
    }
}

/// Default varchar length when none is given
pub const DEFAULT_VARCHAR_LENGTH: u32 = 255;

/// One column of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub default_value: Option<DatabaseValue>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
            not_null: false,
            unique: false,
            auto_increment: false,
            default_value: None,
        }
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Let the database generate values for this column
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<DatabaseValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Render the column definition as it appears inside `CREATE TABLE (...)`
    pub fn to_sql(&self, dialect: &dyn Dialect) -> Result<String> {
        validate_identifier(&self.name)?;

        let type_sql = if self.auto_increment {
            dialect.auto_increment_sql(&self.column_type)
        } else {
            dialect.column_type_sql(&self.column_type)
        };
        let mut sql = format!("{} {}", dialect.escape_identifier(&self.name), type_sql);

        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        // PRIMARY KEY already implies NOT NULL
        if self.not_null && !self.primary_key {
            sql.push_str(" NOT NULL");
        }
        if self.unique && !self.primary_key {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(&render_literal(default)?);
        }

        Ok(sql)
    }
}

/// A named table with ordered columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    /// `CREATE TABLE IF NOT EXISTS` for this table
    pub fn create_sql(&self, dialect: &dyn Dialect) -> Result<String> {
        validate_identifier(&self.name)?;

        if self.columns.is_empty() {
            return Err(ToolkitError::invalid_query(format!(
                "table {} has no columns",
                self.name
            )));
        }

        let columns = self
            .columns
            .iter()
            .map(|column| column.to_sql(dialect))
            .collect::<Result<Vec<_>>>()?;

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            dialect.escape_identifier(&self.name),
            columns.join(", ")
        ))
    }

    /// `DROP TABLE IF EXISTS` for this table
    pub fn drop_sql(&self, dialect: &dyn Dialect) -> Result<String> {
        validate_identifier(&self.name)?;
        Ok(format!(
            "DROP TABLE IF EXISTS {}",
            dialect.escape_identifier(&self.name)
        ))
    }
}

pub fn table(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> TableDefinition {
    TableDefinition {
        name: name.into(),
        columns,
    }
}

/// An ordered set of tables
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new(tables: Vec<TableDefinition>) -> Self {
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// CREATE statements in declaration order
    pub fn create_statements(&self, dialect: &dyn Dialect) -> Result<Vec<String>> {
        self.tables.iter().map(|t| t.create_sql(dialect)).collect()
    }

    /// DROP statements in reverse declaration order, so dependents go first
    pub fn drop_statements(&self, dialect: &dyn Dialect) -> Result<Vec<String>> {
        self.tables.iter().rev().map(|t| t.drop_sql(dialect)).collect()
    }
}

impl From<Vec<TableDefinition>> for Schema {
    fn from(tables: Vec<TableDefinition>) -> Self {
        Self { tables }
    }
}

/// Inline literal for a DEFAULT clause; DDL cannot carry bound parameters
fn render_literal(value: &DatabaseValue) -> Result<String> {
    match value {
        DatabaseValue::Null => Ok("NULL".to_string()),
        DatabaseValue::Bool(v) => Ok(if *v { "TRUE" } else { "FALSE" }.to_string()),
        DatabaseValue::Int(v) => Ok(v.to_string()),
        DatabaseValue::Long(v) | DatabaseValue::Timestamp(v) => Ok(v.to_string()),
        DatabaseValue::Double(v) => Ok(v.to_string()),
        DatabaseValue::String(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
        DatabaseValue::Bytes(_) => Err(ToolkitError::unsupported(
            "binary DEFAULT values cannot be rendered inline",
        )),
    }
}
