//! MySQL/MariaDB dialect.
//!
//! Backtick-quoted identifiers, anonymous `?` placeholders and no
//! `RETURNING` clause.

use crate::core::dialect::{Dialect, PlaceholderStyle};
use crate::core::schema::{ColumnKind, ColumnType, DEFAULT_VARCHAR_LENGTH};

/// MySQL dialect singleton
pub static MYSQL: MysqlDialect = MysqlDialect;

#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn supports_returning(&self) -> bool {
        false
    }

    fn quote_char(&self) -> char {
        '`'
    }

    // plain DATETIME truncates to whole seconds
    fn timestamp_type(&self) -> &'static str {
        "DATETIME(6)"
    }

    fn column_type_sql(&self, column_type: &ColumnType) -> String {
        match column_type.kind {
            ColumnKind::Int => "INT".to_string(),
            ColumnKind::Text => "TEXT".to_string(),
            ColumnKind::Varchar => format!(
                "VARCHAR({})",
                column_type.length.unwrap_or(DEFAULT_VARCHAR_LENGTH)
            ),
            ColumnKind::Bool => "TINYINT(1)".to_string(),
            ColumnKind::Datetime => "DATETIME".to_string(),
            ColumnKind::Json => "JSON".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ToolkitError;
    use crate::core::query::{Condition, QueryNode};

    #[test]
    fn test_select_full() {
        let node = QueryNode::select("users")
            .columns(&["id", "email"])
            .filter(Condition::eq("status", "active"))
            .filter(Condition::like("email", "%@example.com"))
            .order_by_desc("created_at")
            .order_by_asc("id")
            .limit(10)
            .build();

        let compiled = MYSQL.compile(&node).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT `id`, `email` FROM `users` WHERE `status` = ? AND `email` LIKE ? \
             ORDER BY `created_at` DESC, `id` ASC LIMIT 10"
        );
        assert_eq!(
            compiled.params,
            vec!["active".into(), "%@example.com".into()]
        );
    }

    #[test]
    fn test_select_wildcard_without_where() {
        let compiled = MYSQL.compile(&QueryNode::select("t").build()).unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM `t`");
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_limit_zero_differs_from_absent() {
        let with_zero = MYSQL
            .compile(&QueryNode::select("t").limit(0).build())
            .unwrap();
        let without = MYSQL.compile(&QueryNode::select("t").build()).unwrap();

        assert_eq!(with_zero.sql, "SELECT * FROM `t` LIMIT 0");
        assert_eq!(without.sql, "SELECT * FROM `t`");
        assert_ne!(with_zero.sql, without.sql);
    }

    #[test]
    fn test_in_expands_one_placeholder_per_element() {
        let node = QueryNode::select("t")
            .filter(Condition::in_list("x", vec![1, 2, 3]))
            .build();

        let compiled = MYSQL.compile(&node).unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM `t` WHERE `x` IN (?, ?, ?)");
        assert_eq!(compiled.params, vec![1.into(), 2.into(), 3.into()]);
    }

    #[test]
    fn test_insert_keeps_insertion_order() {
        let node = QueryNode::insert("t").value("b", 2).value("a", 1).build();

        let compiled = MYSQL.compile(&node).unwrap();
        assert_eq!(compiled.sql, "INSERT INTO `t` (`b`, `a`) VALUES (?, ?)");
        assert_eq!(compiled.params, vec![2.into(), 1.into()]);
    }

    #[test]
    fn test_update_params_set_then_where() {
        let node = QueryNode::update("users")
            .set("name", "Bob")
            .set("age", 31)
            .filter(Condition::ge("id", 10))
            .filter(Condition::ne("role", "admin"))
            .build();

        let compiled = MYSQL.compile(&node).unwrap();
        assert_eq!(
            compiled.sql,
            "UPDATE `users` SET `name` = ?, `age` = ? WHERE `id` >= ? AND `role` != ?"
        );
        assert_eq!(
            compiled.params,
            vec!["Bob".into(), 31.into(), 10.into(), "admin".into()]
        );
    }

    #[test]
    fn test_delete_with_and_without_where() {
        let compiled = MYSQL
            .compile(&QueryNode::delete("users").where_eq("id", 42).build())
            .unwrap();
        assert_eq!(compiled.sql, "DELETE FROM `users` WHERE `id` = ?");
        assert_eq!(compiled.params, vec![42.into()]);

        let compiled = MYSQL.compile(&QueryNode::delete("users").build()).unwrap();
        assert_eq!(compiled.sql, "DELETE FROM `users`");
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_raw_passes_through() {
        let node = QueryNode::raw("SELECT ? + ?", vec![1.into()]);
        let compiled = MYSQL.compile(&node).unwrap();
        assert_eq!(compiled.sql, "SELECT ? + ?");
        assert_eq!(compiled.params, vec![1.into()]);
    }

    #[test]
    fn test_identifier_with_backtick_is_contained() {
        let node = QueryNode::select("we`ird")
            .columns(&["a`; DROP TABLE users; --"])
            .build();
        let compiled = MYSQL.compile(&node).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT `a``; DROP TABLE users; --` FROM `we``ird`"
        );
    }

    #[test]
    fn test_returning_is_unsupported() {
        let node = QueryNode::insert("t").value("a", 1).returning(&["id"]).build();
        assert!(matches!(
            MYSQL.compile(&node),
            Err(ToolkitError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_malformed_nodes_are_rejected() {
        let empty_insert = QueryNode::insert("t").build();
        assert!(matches!(
            MYSQL.compile(&empty_insert),
            Err(ToolkitError::InvalidQuery(_))
        ));

        let empty_set = QueryNode::update("t").where_eq("id", 1).build();
        assert!(MYSQL.compile(&empty_set).is_err());

        let empty_in = QueryNode::select("t")
            .filter(Condition::in_list("x", Vec::<i32>::new()))
            .build();
        assert!(MYSQL.compile(&empty_in).is_err());

        let scalar_in = QueryNode::select("t")
            .filter(Condition::compare("x", crate::core::query::Operator::In, 1))
            .build();
        assert!(MYSQL.compile(&scalar_in).is_err());
    }
}
