//! PostgreSQL dialect.

use crate::core::dialect::{Dialect, PlaceholderStyle};
use crate::core::schema::{ColumnKind, ColumnType, DEFAULT_VARCHAR_LENGTH};

/// PostgreSQL dialect singleton
pub static POSTGRES: PostgresDialect = PostgresDialect;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Dollar
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn timestamp_type(&self) -> &'static str {
        "TIMESTAMPTZ"
    }

    fn column_type_sql(&self, column_type: &ColumnType) -> String {
        match column_type.kind {
            ColumnKind::Int => "INTEGER".to_string(),
            ColumnKind::Text => "TEXT".to_string(),
            ColumnKind::Varchar => format!(
                "VARCHAR({})",
                column_type.length.unwrap_or(DEFAULT_VARCHAR_LENGTH)
            ),
            ColumnKind::Bool => "BOOLEAN".to_string(),
            ColumnKind::Datetime => "TIMESTAMPTZ".to_string(),
            ColumnKind::Json => "JSONB".to_string(),
        }
    }

    fn auto_increment_sql(&self, column_type: &ColumnType) -> String {
        match column_type.kind {
            ColumnKind::Int => "SERIAL".to_string(),
            _ => format!(
                "{} GENERATED BY DEFAULT AS IDENTITY",
                self.column_type_sql(column_type)
            ),
        }
    }
}
