//! Generic data-access component
//!
//! A single `Dao<E>` parameterized over an [`Entity`] descriptor provides
//! the storage operations for every entity table instead of duplicating
//! query logic per entity. Each call opens its own unit of work against
//! the pool; writes run inside an explicit transaction and roll back on
//! failure. Store failures are logged with table and operation context
//! and re-raised, never swallowed.

use std::marker::PhantomData;

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{FromRow, PgPool, Postgres};

use crate::error::{AppError, AppResult};

/// Postgres error code for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres error code for foreign key violations
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Static description of an entity table
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    const TABLE: &'static str;
    /// Known column names; filter keys outside this set are silently ignored
    const COLUMNS: &'static [&'static str];
}

/// A dynamically typed SQL parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i32),
    BigInt(i64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    fn bind_to<'q, O>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, O, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, O, PgArguments> {
        match self {
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::BigInt(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Date(v) => query.bind(*v),
            SqlValue::Timestamp(v) => query.bind(*v),
        }
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::BigInt(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

/// Ordered column-to-value mapping used for inserts, updates and filters
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    fields: IndexMap<String, SqlValue>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self {
            fields: IndexMap::new(),
        }
    }

    pub fn set(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.fields.insert(column.to_string(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.fields.values()
    }
}

/// Generic data-access object bound to one entity table
#[derive(Clone)]
pub struct Dao<E: Entity> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Dao<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    /// Look up a record by primary identifier; absence is `None`, not an error
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<E>> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", E::TABLE);
        sqlx::query_as::<Postgres, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, E::TABLE, "find_by_id"))
    }

    /// First record matching the given exact-match filters
    pub async fn find_one(&self, filters: &FieldMap) -> AppResult<Option<E>> {
        let (clause, values) = Self::filter_clause(filters);
        let sql = format!("SELECT * FROM {}{} LIMIT 1", E::TABLE, clause);
        let mut query = sqlx::query_as::<Postgres, E>(&sql);
        for value in &values {
            query = value.bind_to(query);
        }
        query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, E::TABLE, "find_one"))
    }

    /// Persist a new record and return it with its assigned identifier
    pub async fn create(&self, fields: &FieldMap) -> AppResult<E> {
        let sql = Self::insert_sql(fields);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error(e, E::TABLE, "create"))?;

        let mut query = sqlx::query_as::<Postgres, E>(&sql);
        for value in fields.values() {
            query = value.bind_to(query);
        }

        match query.fetch_one(&mut *tx).await {
            Ok(entity) => {
                tx.commit()
                    .await
                    .map_err(|e| store_error(e, E::TABLE, "create"))?;
                tracing::info!(table = E::TABLE, "created record");
                Ok(entity)
            }
            Err(e) => {
                tx.rollback().await.ok();
                Err(store_error(e, E::TABLE, "create"))
            }
        }
    }

    /// Records matching the filters, skipping `offset` and capped at `limit`
    pub async fn get_all(&self, offset: i64, limit: i64, filters: &FieldMap) -> AppResult<Vec<E>> {
        let (clause, values) = Self::filter_clause(filters);
        let sql = format!(
            "SELECT * FROM {}{} ORDER BY id LIMIT ${} OFFSET ${}",
            E::TABLE,
            clause,
            values.len() + 1,
            values.len() + 2
        );
        let mut query = sqlx::query_as::<Postgres, E>(&sql);
        for value in &values {
            query = value.bind_to(query);
        }
        query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error(e, E::TABLE, "get_all"))
    }

    /// Count of records matching the filters
    pub async fn count(&self, filters: &FieldMap) -> AppResult<i64> {
        let (clause, values) = Self::filter_clause(filters);
        let sql = format!("SELECT COUNT(*) FROM {}{}", E::TABLE, clause);
        let mut query = sqlx::query_as::<Postgres, (i64,)>(&sql);
        for value in &values {
            query = value.bind_to(query);
        }
        let (count,) = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error(e, E::TABLE, "count"))?;
        Ok(count)
    }

    /// Partial-field update; `None` when no record had the identifier.
    ///
    /// An empty field set leaves the record untouched and returns it as-is.
    pub async fn update(&self, id: i32, fields: &FieldMap) -> AppResult<Option<E>> {
        if fields.is_empty() {
            return self.find_by_id(id).await;
        }

        let sql = Self::update_sql(fields);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error(e, E::TABLE, "update"))?;

        let mut query = sqlx::query_as::<Postgres, E>(&sql);
        for value in fields.values() {
            query = value.bind_to(query);
        }

        match query.bind(id).fetch_optional(&mut *tx).await {
            Ok(updated) => {
                tx.commit()
                    .await
                    .map_err(|e| store_error(e, E::TABLE, "update"))?;
                if updated.is_some() {
                    tracing::info!(table = E::TABLE, id, "updated record");
                }
                Ok(updated)
            }
            Err(e) => {
                tx.rollback().await.ok();
                Err(store_error(e, E::TABLE, "update"))
            }
        }
    }

    /// Remove a record; returns whether a record was actually removed
    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1 RETURNING id", E::TABLE);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error(e, E::TABLE, "delete"))?;

        match sqlx::query_as::<Postgres, (i32,)>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
        {
            Ok(removed) => {
                tx.commit()
                    .await
                    .map_err(|e| store_error(e, E::TABLE, "delete"))?;
                if removed.is_some() {
                    tracing::info!(table = E::TABLE, id, "deleted record");
                }
                Ok(removed.is_some())
            }
            Err(e) => {
                tx.rollback().await.ok();
                Err(store_error(e, E::TABLE, "delete"))
            }
        }
    }

    /// WHERE clause over the known columns; unknown filter keys are ignored
    fn filter_clause(filters: &FieldMap) -> (String, Vec<&SqlValue>) {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        for (key, value) in filters.iter() {
            if !E::COLUMNS.contains(&key) {
                continue;
            }
            values.push(value);
            conditions.push(format!("{} = ${}", key, values.len()));
        }

        if conditions.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), values)
        }
    }

    fn insert_sql(fields: &FieldMap) -> String {
        let columns: Vec<&str> = fields.keys().collect();
        let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("${}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            E::TABLE,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    fn update_sql(fields: &FieldMap) -> String {
        let sets: Vec<String> = fields
            .keys()
            .enumerate()
            .map(|(i, column)| format!("{} = ${}", column, i + 1))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE id = ${} RETURNING *",
            E::TABLE,
            sets.join(", "),
            fields.len() + 1
        )
    }
}

/// Map a store failure to the application error taxonomy, logging context
pub(crate) fn store_error(err: sqlx::Error, table: &str, operation: &str) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        let code = db.code().map(|c| c.to_string()).unwrap_or_default();
        let constraint = db.constraint().unwrap_or(table).to_string();
        let message = db.message().to_string();
        return match code.as_str() {
            UNIQUE_VIOLATION => {
                tracing::warn!(table, operation, "unique constraint violated: {}", message);
                AppError::Conflict(format!("Duplicate value for {}", constraint))
            }
            FOREIGN_KEY_VIOLATION => {
                tracing::warn!(table, operation, "foreign key violated: {}", message);
                AppError::Conflict(format!("Referenced record does not exist ({})", constraint))
            }
            _ => {
                tracing::error!(table, operation, "database error: {}", message);
                AppError::Database(err)
            }
        };
    }

    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            tracing::error!(table, operation, "store unreachable: {}", err);
            AppError::StoreUnavailable(err.to_string())
        }
        _ => {
            tracing::error!(table, operation, "database error: {}", err);
            AppError::Database(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, FromRow)]
    struct Widget {
        #[allow(dead_code)]
        id: i32,
        #[allow(dead_code)]
        name: String,
    }

    impl Entity for Widget {
        const TABLE: &'static str = "widgets";
        const COLUMNS: &'static [&'static str] = &["id", "name", "size"];
    }

    #[test]
    fn test_filter_clause_known_columns() {
        let mut filters = FieldMap::new();
        filters.set("name", "gear");
        filters.set("size", 3);
        let (clause, values) = Dao::<Widget>::filter_clause(&filters);
        assert_eq!(clause, " WHERE name = $1 AND size = $2");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_filter_clause_ignores_unknown_keys() {
        let mut filters = FieldMap::new();
        filters.set("name", "gear");
        filters.set("nonexistent", "x");
        let (clause, values) = Dao::<Widget>::filter_clause(&filters);
        assert_eq!(clause, " WHERE name = $1");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_filter_clause_empty() {
        let filters = FieldMap::new();
        let (clause, values) = Dao::<Widget>::filter_clause(&filters);
        assert_eq!(clause, "");
        assert!(values.is_empty());
    }

    #[test]
    fn test_insert_sql() {
        let mut fields = FieldMap::new();
        fields.set("name", "gear");
        fields.set("size", 3);
        assert_eq!(
            Dao::<Widget>::insert_sql(&fields),
            "INSERT INTO widgets (name, size) VALUES ($1, $2) RETURNING *"
        );
    }

    #[test]
    fn test_update_sql() {
        let mut fields = FieldMap::new();
        fields.set("name", "cog");
        assert_eq!(
            Dao::<Widget>::update_sql(&fields),
            "UPDATE widgets SET name = $1 WHERE id = $2 RETURNING *"
        );
    }

    #[test]
    fn test_field_map_overwrites_and_keeps_order() {
        let mut fields = FieldMap::new();
        fields.set("a", 1);
        fields.set("b", 2);
        fields.set("a", 3);
        let keys: Vec<&str> = fields.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_store_error_pool_timeout_maps_to_unavailable() {
        let err = store_error(sqlx::Error::PoolTimedOut, "widgets", "create");
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }

    #[test]
    fn test_store_error_other_maps_to_database() {
        let err = store_error(sqlx::Error::RowNotFound, "widgets", "find_by_id");
        assert!(matches!(err, AppError::Database(_)));
    }
}
