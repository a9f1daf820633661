//! Dialect-independent query model
//!
//! A [`QueryNode`] describes the intent of one SQL statement. It carries no
//! rendering rules; a [`Dialect`](super::dialect::Dialect) turns it into a
//! [`CompiledQuery`].
//!
//! Value maps for INSERT and UPDATE are ordered `(column, value)` lists so
//! that the column list and the parameter list always pair up positionally.
//!
//! # Example
//!
//! ```rust
//! use worksonmydb::core::query::{Condition, QueryNode};
//!
//! let node = QueryNode::select("users")
//!     .columns(&["id", "email"])
//!     .filter(Condition::gt("id", 10))
//!     .order_by_desc("id")
//!     .limit(5)
//!     .build();
//! assert!(node.is_select());
//! ```

use super::value::DatabaseValue;
use serde::{Deserialize, Serialize};

/// Comparison operators accepted in a WHERE condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Equal to (=)
    Eq,
    /// Not equal to (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Less than (<)
    Lt,
    /// Greater than or equal (>=)
    Ge,
    /// Less than or equal (<=)
    Le,
    /// LIKE pattern matching
    Like,
    /// IN set membership
    In,
}

impl Operator {
    /// Upper-cased SQL keyword for this operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
        }
    }
}

impl std::str::FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "=" => Ok(Operator::Eq),
            "!=" | "<>" => Ok(Operator::Ne),
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            "like" => Ok(Operator::Like),
            "in" => Ok(Operator::In),
            _ => Err(format!("Invalid operator: '{}'", s)),
        }
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionValue {
    /// A single bound value, used by every operator except `in`
    Scalar(DatabaseValue),
    /// A sequence of bound values, used by `in`
    List(Vec<DatabaseValue>),
}

/// One predicate of a WHERE clause; a list of conditions is conjoined with AND
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: ConditionValue,
}

impl Condition {
    /// `column = value`, the default operator
    pub fn new(column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        Self::compare(column, Operator::Eq, value)
    }

    /// `column <operator> value` for any scalar operator
    pub fn compare(
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<DatabaseValue>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: ConditionValue::Scalar(value.into()),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        Self::compare(column, Operator::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        Self::compare(column, Operator::Ne, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        Self::compare(column, Operator::Gt, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        Self::compare(column, Operator::Lt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        Self::compare(column, Operator::Ge, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        Self::compare(column, Operator::Le, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, Operator::Like, DatabaseValue::String(pattern.into()))
    }

    /// `column IN (...)` over a sequence of values
    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        Self {
            column: column.into(),
            operator: Operator::In,
            value: ConditionValue::List(values.into_iter().map(Into::into).collect()),
        }
    }
}

/// ORDER BY direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order
    #[default]
    Asc,
    /// Descending order
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for OrderDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(OrderDirection::Asc),
            "desc" => Ok(OrderDirection::Desc),
            _ => Err(format!("Invalid order direction: '{}'", s)),
        }
    }
}

/// One ORDER BY entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: OrderDirection,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectQuery {
    pub from: String,
    /// Empty means all columns
    pub columns: Vec<String>,
    pub conditions: Vec<Condition>,
    /// Empty means unordered
    pub order_by: Vec<OrderBy>,
    /// `Some(0)` is a real limit, `None` is no limit
    pub limit: Option<u64>,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InsertQuery {
    pub into: String,
    pub values: Vec<(String, DatabaseValue)>,
    pub returning: Vec<String>,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateQuery {
    pub table: String,
    pub set: Vec<(String, DatabaseValue)>,
    pub conditions: Vec<Condition>,
    pub returning: Vec<String>,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeleteQuery {
    pub from: String,
    pub conditions: Vec<Condition>,
    pub returning: Vec<String>,
}

/// Literal SQL passed through untouched
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawQuery {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

/// Tagged description of one statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueryNode {
    Select(SelectQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
    Raw(RawQuery),
}

impl QueryNode {
    /// Start a SELECT against `table`
    pub fn select(table: impl Into<String>) -> SelectBuilder {
        SelectBuilder {
            query: SelectQuery {
                from: table.into(),
                ..SelectQuery::default()
            },
        }
    }

    /// Start an INSERT into `table`
    pub fn insert(table: impl Into<String>) -> InsertBuilder {
        InsertBuilder {
            query: InsertQuery {
                into: table.into(),
                ..InsertQuery::default()
            },
        }
    }

    /// Start an UPDATE of `table`
    pub fn update(table: impl Into<String>) -> UpdateBuilder {
        UpdateBuilder {
            query: UpdateQuery {
                table: table.into(),
                ..UpdateQuery::default()
            },
        }
    }

    /// Start a DELETE from `table`
    pub fn delete(table: impl Into<String>) -> DeleteBuilder {
        DeleteBuilder {
            query: DeleteQuery {
                from: table.into(),
                ..DeleteQuery::default()
            },
        }
    }

    /// Literal SQL with its parameters
    pub fn raw(sql: impl Into<String>, params: Vec<DatabaseValue>) -> Self {
        QueryNode::Raw(RawQuery {
            sql: sql.into(),
            params,
        })
    }

    /// Tag name of this node
    pub fn kind(&self) -> &'static str {
        match self {
            QueryNode::Select(_) => "select",
            QueryNode::Insert(_) => "insert",
            QueryNode::Update(_) => "update",
            QueryNode::Delete(_) => "delete",
            QueryNode::Raw(_) => "raw",
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, QueryNode::Select(_))
    }
}

/// Rendered SQL plus its positionally ordered parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

impl CompiledQuery {
    pub fn new(sql: impl Into<String>, params: Vec<DatabaseValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Fluent construction of a [`SelectQuery`]
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    query: SelectQuery,
}

impl SelectBuilder {
    /// Select specific columns
    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.query.columns = columns.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a WHERE condition
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.query.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn where_eq(self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.filter(Condition::eq(column, value))
    }

    /// Add ORDER BY clause
    #[must_use]
    pub fn order_by(mut self, column: &str, direction: OrderDirection) -> Self {
        self.query.order_by.push(OrderBy {
            column: column.to_string(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn order_by_asc(self, column: &str) -> Self {
        self.order_by(column, OrderDirection::Asc)
    }

    #[must_use]
    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, OrderDirection::Desc)
    }

    /// Add LIMIT clause
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn build(self) -> QueryNode {
        QueryNode::Select(self.query)
    }
}

/// Fluent construction of an [`InsertQuery`]
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    query: InsertQuery,
}

impl InsertBuilder {
    /// Append a column-value pair; order of calls is the column order
    #[must_use]
    pub fn value(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.query.values.push((column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.query.returning = columns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> QueryNode {
        QueryNode::Insert(self.query)
    }
}

/// Fluent construction of an [`UpdateQuery`]
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    query: UpdateQuery,
}

impl UpdateBuilder {
    /// Set a column value
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.query.set.push((column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.query.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn where_eq(self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.filter(Condition::eq(column, value))
    }

    #[must_use]
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.query.returning = columns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> QueryNode {
        QueryNode::Update(self.query)
    }
}

/// Fluent construction of a [`DeleteQuery`]
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    query: DeleteQuery,
}

impl DeleteBuilder {
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.query.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn where_eq(self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.filter(Condition::eq(column, value))
    }

    #[must_use]
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.query.returning = columns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> QueryNode {
        QueryNode::Delete(self.query)
    }
}
