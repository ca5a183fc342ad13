//! Record store trait and shared types
//!
//! One generic gateway serves every collection: rows travel as JSON objects
//! and column names are checked against the static schema before any backend
//! sees them.

use async_trait::async_trait;
use serde_json::{Map, Value};
use so_core::traits::Id;
use so_models::Collection;

/// A stored row: column name to value
pub type Row = Map<String, Value>;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{} {id} not found", .collection.label())]
    NotFound { collection: Collection, id: Id },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Unknown column '{column}' for {collection}")]
    UnknownColumn { collection: Collection, column: String },

    #[error("Invalid row: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn not_found(collection: Collection, id: Id) -> Self {
        Self::NotFound { collection, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Sort column and direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// Equality filters and ordering for [`RecordStore::list`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<OrderBy>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows, ascending by id
    pub fn by_id() -> Self {
        Self::new().order_by("id", false)
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            descending,
        });
        self
    }

    /// Every column this query mentions
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.filters
            .iter()
            .map(|(column, _)| column.as_str())
            .chain(self.order_by.iter().map(|o| o.column.as_str()))
    }
}

/// Reject column names the collection does not have
pub fn check_columns<'a>(
    collection: Collection,
    columns: impl IntoIterator<Item = &'a str>,
) -> StoreResult<()> {
    for column in columns {
        if !collection.has_column(column) {
            return Err(StoreError::UnknownColumn {
                collection,
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Integer id of a stored row
pub fn row_id(row: &Row) -> StoreResult<Id> {
    row.get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| StoreError::Decode("row without an integer id".to_string()))
}

/// CRUD gateway over named collections
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows matching every filter, in the requested order
    async fn list(&self, collection: Collection, query: ListQuery) -> StoreResult<Vec<Row>>;

    /// Single row by id
    async fn get(&self, collection: Collection, id: Id) -> StoreResult<Row>;

    /// Insert rows in one batch; returns them as stored, ids included
    async fn insert(&self, collection: Collection, rows: Vec<Row>) -> StoreResult<Vec<Row>>;

    /// Apply a partial update; returns the updated row
    async fn update(&self, collection: Collection, id: Id, patch: Row) -> StoreResult<Row>;

    /// Delete one row; dependents follow the foreign-key rules
    async fn delete(&self, collection: Collection, id: Id) -> StoreResult<()>;

    /// Delete every row whose `column` equals `value`; returns the count
    async fn delete_where(&self, collection: Collection, column: &str, value: Id)
        -> StoreResult<u64>;

    /// Order row joined with all of its associations
    async fn order_aggregate(&self, id: Id) -> StoreResult<Row>;

    /// Check the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Whether a row exists
    async fn exists(&self, collection: Collection, id: Id) -> StoreResult<bool> {
        match self.get(collection, id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Insert a single row
    async fn insert_one(&self, collection: Collection, row: Row) -> StoreResult<Row> {
        self.insert(collection, vec![row])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode(format!("insert into {} returned no row", collection)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_columns() {
        let query = ListQuery::new().filter("ps", "SF-06").order_by("name", false);
        assert!(check_columns(Collection::Procedures, query.columns()).is_ok());

        let err = check_columns(Collection::Team, ["name", "salary"]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown column 'salary' for team");
    }

    #[test]
    fn test_not_found_message() {
        let err = StoreError::not_found(Collection::Epi, 9);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "PPE item 9 not found");
    }

    #[test]
    fn test_row_id() {
        let row = json!({ "id": 4, "name": "Luva" });
        assert_eq!(row_id(row.as_object().unwrap()).unwrap(), 4);
        assert!(row_id(&Row::new()).is_err());
    }
}
