//! SQL dialects and the shared query compiler
//!
//! A [`Dialect`] is an immutable capability descriptor: its name, how it
//! spells placeholders, whether it understands `RETURNING`, how it quotes
//! identifiers, and how schema column types map onto its type names.
//! Concrete dialects are zero-sized singletons (see [`crate::dialects`]).
//!
//! Rendering is shared: [`SqlCompiler`] walks a [`QueryNode`] and asks the
//! dialect only for the pieces that actually differ between databases.

use super::error::{Result, ToolkitError};
use super::query::{
    CompiledQuery, Condition, ConditionValue, DeleteQuery, InsertQuery, Operator, QueryNode,
    SelectQuery, UpdateQuery,
};
use super::schema::ColumnType;
use super::value::DatabaseValue;

/// Identifiers longer than this are rejected before quoting.
/// PostgreSQL truncates at 63 bytes, MySQL at 64 characters, SQL Server at 128.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// How bound parameters are spelled in SQL text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Anonymous `?` placeholders (MySQL, SQLite)
    QuestionMark,
    /// Numbered `$1, $2, ...` placeholders (PostgreSQL)
    Dollar,
}

impl PlaceholderStyle {
    /// Render the placeholder for the 1-based parameter `index`
    pub fn render(&self, index: usize) -> String {
        match self {
            PlaceholderStyle::QuestionMark => "?".to_string(),
            PlaceholderStyle::Dollar => format!("${}", index),
        }
    }

    /// Placeholder prefix as written in SQL text
    pub fn token(&self) -> &'static str {
        match self {
            PlaceholderStyle::QuestionMark => "?",
            PlaceholderStyle::Dollar => "$",
        }
    }
}

/// Rendering rules for one SQL flavor
pub trait Dialect: Send + Sync + std::fmt::Debug {
    /// Short lowercase dialect name, e.g. `"mysql"`
    fn name(&self) -> &'static str;

    fn placeholder_style(&self) -> PlaceholderStyle;

    fn supports_returning(&self) -> bool;

    /// Character that opens and closes a quoted identifier
    fn quote_char(&self) -> char;

    /// Column type used for timestamps, including the migration history's `applied_at`
    fn timestamp_type(&self) -> &'static str;

    /// Dialect spelling of a schema column type
    fn column_type_sql(&self, column_type: &ColumnType) -> String;

    /// Type plus whatever makes the column generate its own values
    fn auto_increment_sql(&self, column_type: &ColumnType) -> String {
        format!("{} AUTO_INCREMENT", self.column_type_sql(column_type))
    }

    /// Quote an identifier, doubling any embedded quote character
    fn escape_identifier(&self, identifier: &str) -> String {
        let quote = self.quote_char();
        let mut escaped = String::with_capacity(identifier.len() + 2);
        escaped.push(quote);
        for ch in identifier.chars() {
            if ch == quote {
                escaped.push(quote);
            }
            escaped.push(ch);
        }
        escaped.push(quote);
        escaped
    }

    /// Reverse [`escape_identifier`](Dialect::escape_identifier).
    ///
    /// Returns `None` when `quoted` is not a well-formed quoted identifier.
    fn unescape_identifier(&self, quoted: &str) -> Option<String> {
        let quote = self.quote_char();
        let inner = quoted.strip_prefix(quote)?.strip_suffix(quote)?;

        let mut identifier = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            if ch == quote {
                // a lone quote would have terminated the identifier
                if chars.next() != Some(quote) {
                    return None;
                }
            }
            identifier.push(ch);
        }
        Some(identifier)
    }

    /// Render the placeholder for the 1-based parameter `index`
    fn placeholder(&self, index: usize) -> String {
        self.placeholder_style().render(index)
    }

    /// Compile a query node into SQL text plus ordered parameters
    fn compile(&self, node: &QueryNode) -> Result<CompiledQuery> {
        SqlCompiler::new(self).compile(node)
    }
}

/// Reject identifiers that cannot be quoted safely
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ToolkitError::invalid_query("identifier cannot be empty"));
    }

    if name.contains('\0') {
        return Err(ToolkitError::invalid_query(format!(
            "identifier contains a null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ToolkitError::invalid_query(format!(
            "identifier exceeds {} bytes: {:?}",
            MAX_IDENTIFIER_LENGTH, name
        )));
    }

    Ok(())
}

/// Walks a [`QueryNode`] and accumulates SQL and parameters for one dialect.
///
/// Placeholders are numbered by their position in the final parameter list,
/// so numbered styles stay correct across SET and WHERE sections.
pub struct SqlCompiler<'a, D: Dialect + ?Sized> {
    dialect: &'a D,
    params: Vec<DatabaseValue>,
}

impl<'a, D: Dialect + ?Sized> SqlCompiler<'a, D> {
    pub fn new(dialect: &'a D) -> Self {
        Self {
            dialect,
            params: Vec::new(),
        }
    }

    /// Compile `node`, consuming the compiler
    pub fn compile(mut self, node: &QueryNode) -> Result<CompiledQuery> {
        let sql = match node {
            QueryNode::Select(query) => self.compile_select(query)?,
            QueryNode::Insert(query) => self.compile_insert(query)?,
            QueryNode::Update(query) => self.compile_update(query)?,
            QueryNode::Delete(query) => self.compile_delete(query)?,
            QueryNode::Raw(raw) => {
                return Ok(CompiledQuery::new(raw.sql.clone(), raw.params.clone()));
            }
        };

        Ok(CompiledQuery {
            sql,
            params: self.params,
        })
    }

    fn ident(&self, name: &str) -> Result<String> {
        validate_identifier(name)?;
        Ok(self.dialect.escape_identifier(name))
    }

    fn ident_list(&self, names: &[String]) -> Result<String> {
        let escaped = names
            .iter()
            .map(|name| self.ident(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(escaped.join(", "))
    }

    fn bind(&mut self, value: DatabaseValue) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }

    fn compile_select(&mut self, query: &SelectQuery) -> Result<String> {
        let columns = if query.columns.is_empty() {
            "*".to_string()
        } else {
            self.ident_list(&query.columns)?
        };

        let mut sql = format!("SELECT {} FROM {}", columns, self.ident(&query.from)?);

        if let Some(where_sql) = self.compile_conditions(&query.conditions)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if !query.order_by.is_empty() {
            let order = query
                .order_by
                .iter()
                .map(|entry| -> Result<String> {
                    Ok(format!(
                        "{} {}",
                        self.ident(&entry.column)?,
                        entry.direction.as_sql()
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        Ok(sql)
    }

    fn compile_insert(&mut self, query: &InsertQuery) -> Result<String> {
        if query.values.is_empty() {
            return Err(ToolkitError::invalid_query(format!(
                "INSERT into {} has no values",
                query.into
            )));
        }

        let table = self.ident(&query.into)?;
        let mut columns = Vec::with_capacity(query.values.len());
        let mut placeholders = Vec::with_capacity(query.values.len());
        for (column, value) in &query.values {
            columns.push(self.ident(column)?);
            placeholders.push(self.bind(value.clone()));
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );
        sql.push_str(&self.compile_returning(&query.returning)?);
        Ok(sql)
    }

    fn compile_update(&mut self, query: &UpdateQuery) -> Result<String> {
        if query.set.is_empty() {
            return Err(ToolkitError::invalid_query(format!(
                "UPDATE of {} has an empty SET clause",
                query.table
            )));
        }

        let table = self.ident(&query.table)?;
        let mut assignments = Vec::with_capacity(query.set.len());
        for (column, value) in &query.set {
            let column = self.ident(column)?;
            let placeholder = self.bind(value.clone());
            assignments.push(format!("{} = {}", column, placeholder));
        }

        let mut sql = format!("UPDATE {} SET {}", table, assignments.join(", "));

        if let Some(where_sql) = self.compile_conditions(&query.conditions)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        sql.push_str(&self.compile_returning(&query.returning)?);
        Ok(sql)
    }

    fn compile_delete(&mut self, query: &DeleteQuery) -> Result<String> {
        let mut sql = format!("DELETE FROM {}", self.ident(&query.from)?);

        if let Some(where_sql) = self.compile_conditions(&query.conditions)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        sql.push_str(&self.compile_returning(&query.returning)?);
        Ok(sql)
    }

    /// Conjoin `conditions` with AND; `None` when there is nothing to filter on
    fn compile_conditions(&mut self, conditions: &[Condition]) -> Result<Option<String>> {
        if conditions.is_empty() {
            return Ok(None);
        }

        let mut clauses = Vec::with_capacity(conditions.len());
        for condition in conditions {
            clauses.push(self.compile_condition(condition)?);
        }

        Ok(Some(clauses.join(" AND ")))
    }

    fn compile_condition(&mut self, condition: &Condition) -> Result<String> {
        let column = self.ident(&condition.column)?;

        match (condition.operator, &condition.value) {
            (Operator::In, ConditionValue::List(values)) => {
                if values.is_empty() {
                    return Err(ToolkitError::invalid_query(format!(
                        "IN on {} requires at least one value",
                        condition.column
                    )));
                }
                let placeholders: Vec<String> =
                    values.iter().map(|v| self.bind(v.clone())).collect();
                Ok(format!("{} IN ({})", column, placeholders.join(", ")))
            }
            (Operator::In, ConditionValue::Scalar(_)) => Err(ToolkitError::invalid_query(
                format!("IN on {} requires a list of values", condition.column),
            )),
            (operator, ConditionValue::Scalar(value)) => {
                let placeholder = self.bind(value.clone());
                Ok(format!("{} {} {}", column, operator.as_sql(), placeholder))
            }
            (operator, ConditionValue::List(_)) => Err(ToolkitError::invalid_query(format!(
                "operator {} on {} takes a single value",
                operator.as_sql(),
                condition.column
            ))),
        }
    }

    fn compile_returning(&self, columns: &[String]) -> Result<String> {
        if columns.is_empty() {
            return Ok(String::new());
        }

        if !self.dialect.supports_returning() {
            return Err(ToolkitError::unsupported(format!(
                "RETURNING is not supported by the {} dialect",
                self.dialect.name()
            )));
        }

        Ok(format!(" RETURNING {}", self.ident_list(columns)?))
    }
}

/// Count the placeholders a dialect would recognise in `sql`.
///
/// Quoted identifiers and string literals are skipped, so a `?` inside
/// `'...'` or a quoted column name is not counted.
pub fn count_placeholders(dialect: &dyn Dialect, sql: &str) -> usize {
    let quote = dialect.quote_char();
    let style = dialect.placeholder_style();
    let mut count = 0;
    let mut in_identifier = false;
    let mut in_literal = false;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_identifier {
            if ch == quote {
                if chars.peek() == Some(&quote) {
                    chars.next();
                } else {
                    in_identifier = false;
                }
            }
            continue;
        }
        if in_literal {
            if ch == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                } else {
                    in_literal = false;
                }
            }
            continue;
        }

        match ch {
            c if c == quote => in_identifier = true,
            '\'' => in_literal = true,
            '?' if style == PlaceholderStyle::QuestionMark => count += 1,
            '$' if style == PlaceholderStyle::Dollar => {
                if chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                        chars.next();
                    }
                    count += 1;
                }
            }
            _ => {}
        }
    }

    count
}
