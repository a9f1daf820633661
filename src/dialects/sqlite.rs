//! SQLite dialect.

use crate::core::dialect::{Dialect, PlaceholderStyle};
use crate::core::schema::{ColumnKind, ColumnType, DEFAULT_VARCHAR_LENGTH};

/// SQLite dialect singleton
pub static SQLITE: SqliteDialect = SqliteDialect;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    // RETURNING landed in SQLite 3.35; the bundled library is newer
    fn supports_returning(&self) -> bool {
        true
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn timestamp_type(&self) -> &'static str {
        "TIMESTAMP"
    }

    fn column_type_sql(&self, column_type: &ColumnType) -> String {
        match column_type.kind {
            ColumnKind::Int => "INTEGER".to_string(),
            ColumnKind::Text | ColumnKind::Json => "TEXT".to_string(),
            ColumnKind::Varchar => format!(
                "VARCHAR({})",
                column_type.length.unwrap_or(DEFAULT_VARCHAR_LENGTH)
            ),
            ColumnKind::Bool => "BOOLEAN".to_string(),
            ColumnKind::Datetime => "DATETIME".to_string(),
        }
    }

    // INTEGER PRIMARY KEY already aliases the rowid
    fn auto_increment_sql(&self, column_type: &ColumnType) -> String {
        self.column_type_sql(column_type)
    }
}
