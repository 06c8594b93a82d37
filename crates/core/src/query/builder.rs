use std::{fmt, str::FromStr};

use super::{validate_column, validate_identifier, QueryError, SqlValue};

/// SQL text with `?` placeholders and the values bound to them, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub bindings: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, bindings: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }
}

/// Comparison operators allowed in where clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    /// `<>`, the ANSI spelling of `!=`.
    NeAlt,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    Is,
    IsNot,
}

impl Op {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::NeAlt => "<>",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::Is => "IS",
            Op::IsNot => "IS NOT",
        }
    }
}

impl FromStr for Op {
    type Err = QueryError;

    /// Parses an operator as written in SQL; keywords are case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_uppercase().as_str() {
            "=" => Op::Eq,
            "!=" => Op::Ne,
            "<>" => Op::NeAlt,
            "<" => Op::Lt,
            "<=" => Op::Le,
            ">" => Op::Gt,
            ">=" => Op::Ge,
            "LIKE" => Op::Like,
            "NOT LIKE" => Op::NotLike,
            "IS" => Op::Is,
            "IS NOT" => Op::IsNot,
            _ => return Err(QueryError::InvalidOperator(s.to_string())),
        };
        Ok(op)
    }
}

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parses `asc`/`desc` in any case; anything else sorts ascending.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => f.write_str("ASC"),
            Direction::Desc => f.write_str("DESC"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
struct Condition {
    connective: Connective,
    column: String,
    op: Op,
    value: SqlValue,
}

/// Ordered column/value pairs for inserts and updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, SqlValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column. Setting the same column twice keeps the last value.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(field) => field.1 = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }
}

/// Fluent builder for single-table queries.
///
/// ```
/// use infinity_core::query::{Direction, QueryBuilder};
///
/// let stmt = QueryBuilder::table("posts")
///     .where_eq("status", "published")
///     .order_by("created_at", Direction::Desc)
///     .limit(5)
///     .select_statement()
///     .unwrap();
///
/// assert_eq!(
///     stmt.sql,
///     "SELECT * FROM posts WHERE status = ? ORDER BY created_at DESC LIMIT 5"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    table: String,
    columns: Vec<String>,
    conditions: Vec<Condition>,
    order: Vec<(String, Direction)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryBuilder {
    /// Starts a fresh query against `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn where_eq(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.where_op(column, Op::Eq, value)
    }

    pub fn where_op(
        mut self,
        column: impl Into<String>,
        op: Op,
        value: impl Into<SqlValue>,
    ) -> Self {
        self.push_condition(Connective::And, column.into(), op, value.into());
        self
    }

    pub fn or_where_eq(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.or_where_op(column, Op::Eq, value)
    }

    pub fn or_where_op(
        mut self,
        column: impl Into<String>,
        op: Op,
        value: impl Into<SqlValue>,
    ) -> Self {
        self.push_condition(Connective::Or, column.into(), op, value.into());
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    fn push_condition(&mut self, connective: Connective, column: String, op: Op, value: SqlValue) {
        self.conditions.push(Condition {
            connective,
            column,
            op,
            value,
        });
    }

    fn checked_table(&self) -> Result<&str, QueryError> {
        if self.table.is_empty() {
            return Err(QueryError::NoTable);
        }
        validate_identifier(&self.table)
    }

    /// Appends ` WHERE ...` and its bindings when conditions exist.
    fn push_where(&self, sql: &mut String, bindings: &mut Vec<SqlValue>) -> Result<(), QueryError> {
        if self.conditions.is_empty() {
            return Ok(());
        }

        sql.push_str(" WHERE ");
        for (index, condition) in self.conditions.iter().enumerate() {
            validate_identifier(&condition.column)?;
            if index > 0 {
                sql.push_str(match condition.connective {
                    Connective::And => " AND ",
                    Connective::Or => " OR ",
                });
            }
            sql.push_str(&condition.column);
            sql.push(' ');
            sql.push_str(condition.op.as_sql());
            sql.push_str(" ?");
            bindings.push(condition.value.clone());
        }
        Ok(())
    }

    pub fn select_statement(&self) -> Result<Statement, QueryError> {
        let table = self.checked_table()?;

        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| validate_column(c))
                .collect::<Result<Vec<_>, _>>()?
                .join(", ")
        };

        let mut sql = format!("SELECT {columns} FROM {table}");
        let mut bindings = Vec::new();
        self.push_where(&mut sql, &mut bindings)?;

        if !self.order.is_empty() {
            let orders = self
                .order
                .iter()
                .map(|(column, direction)| {
                    validate_identifier(column).map(|c| format!("{c} {direction}"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            // SQLite only accepts OFFSET after a LIMIT clause.
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        Ok(Statement { sql, bindings })
    }

    /// The select statement limited to a single row.
    pub fn first_statement(&self) -> Result<Statement, QueryError> {
        self.clone().limit(1).select_statement()
    }

    pub fn count_statement(&self) -> Result<Statement, QueryError> {
        let table = self.checked_table()?;
        let mut sql = format!("SELECT COUNT(*) AS count FROM {table}");
        let mut bindings = Vec::new();
        self.push_where(&mut sql, &mut bindings)?;
        Ok(Statement { sql, bindings })
    }

    pub fn insert_statement(&self, record: &Record) -> Result<Statement, QueryError> {
        let table = self.checked_table()?;
        if record.is_empty() {
            return Err(QueryError::EmptyRecord("insert"));
        }

        let columns = record
            .fields
            .iter()
            .map(|(c, _)| validate_identifier(c))
            .collect::<Result<Vec<_>, _>>()?;
        let placeholders = vec!["?"; columns.len()].join(", ");

        Ok(Statement {
            sql: format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders})",
                columns.join(", ")
            ),
            bindings: record.fields.iter().map(|(_, v)| v.clone()).collect(),
        })
    }

    /// Set bindings come first, followed by the where bindings.
    pub fn update_statement(&self, record: &Record) -> Result<Statement, QueryError> {
        let table = self.checked_table()?;
        if record.is_empty() {
            return Err(QueryError::EmptyRecord("update"));
        }

        let sets = record
            .fields
            .iter()
            .map(|(c, _)| validate_identifier(c).map(|c| format!("{c} = ?")))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sql = format!("UPDATE {table} SET {}", sets.join(", "));
        let mut bindings: Vec<SqlValue> = record.fields.iter().map(|(_, v)| v.clone()).collect();
        self.push_where(&mut sql, &mut bindings)?;

        Ok(Statement { sql, bindings })
    }

    pub fn delete_statement(&self) -> Result<Statement, QueryError> {
        let table = self.checked_table()?;
        let mut sql = format!("DELETE FROM {table}");
        let mut bindings = Vec::new();
        self.push_where(&mut sql, &mut bindings)?;
        Ok(Statement { sql, bindings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_by_default() {
        let stmt = QueryBuilder::table("posts").select_statement().unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM posts");
        assert!(stmt.bindings.is_empty());
    }

    #[test]
    fn test_select_columns() {
        let stmt = QueryBuilder::table("migrations")
            .select(["migration", "batch"])
            .select_statement()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT migration, batch FROM migrations");
    }

    #[test]
    fn test_operators_parse_and_lower() {
        assert_eq!("<>".parse::<Op>(), Ok(Op::NeAlt));
        assert_eq!("not like".parse::<Op>(), Ok(Op::NotLike));
        assert_eq!(" is not ".parse::<Op>(), Ok(Op::IsNot));
        assert_eq!(
            "; DROP".parse::<Op>(),
            Err(QueryError::InvalidOperator("; DROP".to_string()))
        );

        let stmt = QueryBuilder::table("posts")
            .where_op("status", "<>".parse().unwrap(), "draft")
            .where_op("title", Op::Like, "%Rust%")
            .select_statement()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM posts WHERE status <> ? AND title LIKE ?"
        );
        assert_eq!(
            stmt.bindings,
            vec![SqlValue::from("draft"), SqlValue::from("%Rust%")]
        );
    }

    #[test]
    fn test_where_connectives_are_left_to_right() {
        let stmt = QueryBuilder::table("users")
            .where_eq("username", "admin")
            .or_where_eq("email", "admin")
            .where_op("id", Op::Ne, 3)
            .select_statement()
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT * FROM users WHERE username = ? OR email = ? AND id != ?"
        );
        assert_eq!(
            stmt.bindings,
            vec![
                SqlValue::from("admin"),
                SqlValue::from("admin"),
                SqlValue::Integer(3)
            ]
        );
    }

    #[test]
    fn test_order_limit_offset() {
        let stmt = QueryBuilder::table("posts")
            .order_by("created_at", Direction::Desc)
            .order_by("id", Direction::parse("asc"))
            .limit(10)
            .offset(20)
            .select_statement()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM posts ORDER BY created_at DESC, id ASC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_offset_without_limit() {
        let stmt = QueryBuilder::table("posts").offset(5).select_statement().unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM posts LIMIT -1 OFFSET 5");
    }

    #[test]
    fn test_first_overrides_limit() {
        let builder = QueryBuilder::table("posts").where_eq("slug", "hello").limit(50);
        let stmt = builder.first_statement().unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM posts WHERE slug = ? LIMIT 1");
    }

    #[test]
    fn test_count() {
        let stmt = QueryBuilder::table("posts")
            .where_eq("status", "draft")
            .count_statement()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) AS count FROM posts WHERE status = ?");
        assert_eq!(stmt.bindings, vec![SqlValue::from("draft")]);
    }

    #[test]
    fn test_insert_keeps_record_order() {
        let record = Record::new()
            .set("title", "Hello")
            .set("slug", "hello")
            .set("excerpt", None::<String>);
        let stmt = QueryBuilder::table("posts").insert_statement(&record).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO posts (title, slug, excerpt) VALUES (?, ?, ?)");
        assert_eq!(stmt.bindings[2], SqlValue::Null);
    }

    #[test]
    fn test_update_binds_sets_before_conditions() {
        let record = Record::new().set("setting_value", "1");
        let stmt = QueryBuilder::table("settings")
            .where_eq("id", 4)
            .update_statement(&record)
            .unwrap();
        assert_eq!(stmt.sql, "UPDATE settings SET setting_value = ? WHERE id = ?");
        assert_eq!(
            stmt.bindings,
            vec![SqlValue::from("1"), SqlValue::Integer(4)]
        );
    }

    #[test]
    fn test_delete_without_conditions_targets_whole_table() {
        let stmt = QueryBuilder::table("comments").delete_statement().unwrap();
        assert_eq!(stmt.sql, "DELETE FROM comments");
    }

    #[test]
    fn test_record_set_replaces_existing_column() {
        let record = Record::new().set("a", 1).set("b", 2).set("a", 3);
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record.get("a"), Some(&SqlValue::Integer(3)));
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        let err = QueryBuilder::table("posts")
            .where_eq("1=1 OR id", 1)
            .select_statement()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier(_)));

        let err = QueryBuilder::table("posts; DROP TABLE users")
            .count_statement()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier(_)));

        let err = QueryBuilder::table("posts")
            .order_by("created_at desc, (select 1)", Direction::Asc)
            .select_statement()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_empty_record_and_missing_table() {
        assert_eq!(
            QueryBuilder::table("posts").insert_statement(&Record::new()),
            Err(QueryError::EmptyRecord("insert"))
        );
        assert_eq!(
            QueryBuilder::default().select_statement(),
            Err(QueryError::NoTable)
        );
    }
}
