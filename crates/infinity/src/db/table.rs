use serde::de::DeserializeOwned;

use infinity_core::query::{Direction, Op, QueryBuilder, Record, SqlValue};
use infinity_core::storage::Result;

use super::{from_row, Database, Row};

/// Fluent query against one table, bound to a [`Database`].
///
/// ```ignore
/// let posts = db
///     .table("posts")
///     .where_eq("status", "published")
///     .order_by("created_at", Direction::Desc)
///     .limit(5)
///     .get_as::<Post>()
///     .await?;
/// ```
#[derive(Clone)]
pub struct Table {
    db: Database,
    name: &'static str,
    query: QueryBuilder,
}

impl Table {
    pub(super) fn new(db: Database, name: &'static str) -> Self {
        Self {
            db,
            name,
            query: QueryBuilder::table(name),
        }
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query = self.query.select(columns);
        self
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.query = self.query.where_eq(column, value);
        self
    }

    pub fn where_op(
        mut self,
        column: impl Into<String>,
        op: Op,
        value: impl Into<SqlValue>,
    ) -> Self {
        self.query = self.query.where_op(column, op, value);
        self
    }

    pub fn or_where_eq(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.query = self.query.or_where_eq(column, value);
        self
    }

    pub fn or_where_op(
        mut self,
        column: impl Into<String>,
        op: Op,
        value: impl Into<SqlValue>,
    ) -> Self {
        self.query = self.query.or_where_op(column, op, value);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.query = self.query.order_by(column, direction);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.query = self.query.offset(offset);
        self
    }

    pub async fn get(&self) -> Result<Vec<Row>> {
        let statement = self.query.select_statement()?;
        self.db.fetch(statement, self.name).await
    }

    pub async fn first(&self) -> Result<Option<Row>> {
        let statement = self.query.first_statement()?;
        Ok(self.db.fetch(statement, self.name).await?.into_iter().next())
    }

    /// Shorthand for `where_eq("id", id).first()`.
    pub async fn find(&self, id: impl Into<SqlValue>) -> Result<Option<Row>> {
        self.clone().where_eq("id", id).first().await
    }

    pub async fn count(&self) -> Result<i64> {
        let statement = self.query.count_statement()?;
        let rows = self.db.fetch(statement, self.name).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(|count| count.as_i64())
            .unwrap_or(0))
    }

    /// Inserts `record` and returns the new row id.
    pub async fn insert(&self, record: &Record) -> Result<i64> {
        let statement = self.query.insert_statement(record)?;
        self.db.run_insert(statement, self.name).await
    }

    /// Updates the rows matched by the where clause; returns affected rows.
    pub async fn update(&self, record: &Record) -> Result<usize> {
        let statement = self.query.update_statement(record)?;
        self.db.run(statement, self.name).await
    }

    /// Deletes the rows matched by the where clause; returns affected rows.
    pub async fn delete(&self) -> Result<usize> {
        let statement = self.query.delete_statement()?;
        self.db.run(statement, self.name).await
    }

    pub async fn get_as<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.get().await?.into_iter().map(from_row).collect()
    }

    pub async fn first_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.first().await?.map(from_row).transpose()
    }

    pub async fn find_as<T: DeserializeOwned>(&self, id: impl Into<SqlValue>) -> Result<Option<T>> {
        self.find(id).await?.map(from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infinity_core::query::QueryError;
    use infinity_core::storage::RepositoryError;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: i64,
        name: String,
        qty: i64,
    }

    async fn db_with_items() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        db.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, qty INTEGER NOT NULL);",
        )
        .await
        .unwrap();
        for (name, qty) in [("apple", 3), ("pear", 0), ("plum", 7)] {
            db.table("items")
                .insert(&Record::new().set("name", name).set("qty", qty))
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_insert_returns_id_and_find() {
        let db = db_with_items().await;
        let id = db
            .table("items")
            .insert(&Record::new().set("name", "fig").set("qty", 1))
            .await
            .unwrap();
        assert_eq!(id, 4);

        let item: Item = db.table("items").find_as(id).await.unwrap().unwrap();
        assert_eq!(item.name, "fig");
        assert!(db.table("items").find(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_where_order_limit() {
        let db = db_with_items().await;
        let names: Vec<String> = db
            .table("items")
            .where_op("qty", Op::Gt, 0)
            .order_by("qty", Direction::Desc)
            .limit(1)
            .get_as::<Item>()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["plum"]);
    }

    #[tokio::test]
    async fn test_or_where_and_count() {
        let db = db_with_items().await;
        let count = db
            .table("items")
            .where_eq("name", "apple")
            .or_where_eq("name", "pear")
            .count()
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(db.table("items").count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_offset_without_limit() {
        let db = db_with_items().await;
        let rows = db
            .table("items")
            .order_by("id", Direction::Asc)
            .offset(1)
            .get()
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "pear");
    }

    #[tokio::test]
    async fn test_update_and_delete_report_affected_rows() {
        let db = db_with_items().await;
        let updated = db
            .table("items")
            .where_eq("qty", 0)
            .update(&Record::new().set("qty", 10))
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let deleted = db
            .table("items")
            .where_op("qty", Op::Ge, 5)
            .delete()
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(db.table("items").count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_column_is_rejected_before_execution() {
        let db = db_with_items().await;
        let err = db
            .table("items")
            .where_eq("qty; DROP TABLE items", 1)
            .get()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Query(QueryError::InvalidIdentifier(_))
        ));
        assert_eq!(db.table("items").count().await.unwrap(), 3);
    }
}
