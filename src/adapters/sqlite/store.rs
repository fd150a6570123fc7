//! Collection-agnostic document store
//!
//! Generic get/set/bulk-set/clear/list primitives over the named collections
//! declared in [`super::schema`]. Every call is its own transaction and runs
//! on the blocking thread pool. Failures propagate unchanged; nothing is
//! retried here.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

use super::connection::{ConnectionManager, ConnectionStatus};
use super::pool::StoreLocation;
use super::schema::{self, CollectionSpec};
use crate::types::error::{MessagingError, Result};

/// Equality lookup on a secondary index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    pub index: String,
    pub value: serde_json::Value,
}

impl IndexQuery {
    pub fn new(index: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            index: index.into(),
            value: value.into(),
        }
    }
}

pub struct Store {
    connection: ConnectionManager,
}

impl Store {
    pub fn new(location: StoreLocation) -> Self {
        Self {
            connection: ConnectionManager::new(location),
        }
    }

    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        Self::new(StoreLocation::File(path.into()))
    }

    /// In-memory store (for testing)
    pub fn in_memory() -> Self {
        Self::new(StoreLocation::Memory)
    }

    pub fn location(&self) -> &StoreLocation {
        self.connection.location()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Number of open sequences the store has started
    pub fn open_attempts(&self) -> u64 {
        self.connection.open_attempts()
    }

    /// Open the database (idempotent). Other operations connect on demand.
    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await.map(|_| ())
    }

    pub async fn close(&self) {
        self.connection.close().await
    }

    /// Point lookup
    pub async fn get<T>(&self, collection: &str, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let spec = schema::collection(collection)?;
        let key = key.to_string();

        let raw: Option<String> = self
            .with_connection(move |conn| {
                let sql = format!("SELECT value FROM {} WHERE key = ?1", spec.name);
                let value = conn
                    .query_row(&sql, params![key], |row| row.get(0))
                    .optional()?;
                Ok(value)
            })
            .await?;

        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(MessagingError::from)
    }

    /// Upsert one record
    pub async fn set<T>(&self, collection: &str, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let spec = schema::collection(collection)?;
        let key = require_key(key)?;
        let value = serde_json::to_string(value)?;

        debug!("Storing {}/{}", spec.name, key);
        self.with_connection(move |conn| {
            conn.execute(&upsert_sql(spec), params![key, value])?;
            Ok(())
        })
        .await
    }

    /// Upsert many records in one transaction. Either all are written or
    /// none are.
    pub async fn bulk_set<K, T>(&self, collection: &str, records: &[(K, T)]) -> Result<()>
    where
        K: AsRef<str>,
        T: Serialize,
    {
        let spec = schema::collection(collection)?;
        let rows = records
            .iter()
            .map(|(key, value)| -> Result<(String, String)> {
                Ok((require_key(key.as_ref())?, serde_json::to_string(value)?))
            })
            .collect::<Result<Vec<(String, String)>>>()?;

        if rows.is_empty() {
            return Ok(());
        }

        let count = rows.len();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(&upsert_sql(spec))?;
                for (key, value) in &rows {
                    stmt.execute(params![key, value])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await?;

        debug!("Stored {} records in {}", count, spec.name);
        Ok(())
    }

    /// Remove every record of a collection
    pub async fn clear(&self, collection: &str) -> Result<()> {
        let spec = schema::collection(collection)?;

        self.with_connection(move |conn| {
            conn.execute(&format!("DELETE FROM {}", spec.name), [])?;
            Ok(())
        })
        .await
    }

    /// All keys of a collection, in key order
    pub async fn list_keys(&self, collection: &str) -> Result<Vec<String>> {
        let spec = schema::collection(collection)?;

        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&format!("SELECT key FROM {} ORDER BY key", spec.name))?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(keys)
        })
        .await
    }

    /// All records, or only those whose indexed field equals the query value
    pub async fn list_objects<T>(&self, collection: &str, query: Option<IndexQuery>) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let spec = schema::collection(collection)?;
        let filter = query.map(|q| resolve_filter(spec, &q)).transpose()?;

        let raw: Vec<String> = self
            .with_connection(move |conn| {
                let rows = match &filter {
                    Some((expression, value)) => {
                        let sql = format!(
                            "SELECT value FROM {} WHERE {} = ?1 ORDER BY {}, key",
                            spec.name, expression, expression
                        );
                        let mut stmt = conn.prepare(&sql)?;
                        let rows = stmt
                            .query_map(params![value], |row| row.get(0))?
                            .collect::<rusqlite::Result<Vec<String>>>()?;
                        rows
                    }
                    None => {
                        let sql = format!("SELECT value FROM {} ORDER BY key", spec.name);
                        let mut stmt = conn.prepare(&sql)?;
                        let rows = stmt
                            .query_map([], |row| row.get(0))?
                            .collect::<rusqlite::Result<Vec<String>>>()?;
                        rows
                    }
                };
                Ok(rows)
            })
            .await?;

        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(MessagingError::from))
            .collect()
    }

    /// Number of records, or of those matching an index query
    pub async fn count(&self, collection: &str, query: Option<IndexQuery>) -> Result<usize> {
        let spec = schema::collection(collection)?;
        let filter = query.map(|q| resolve_filter(spec, &q)).transpose()?;

        let count: i64 = self
            .with_connection(move |conn| {
                let count = match &filter {
                    Some((expression, value)) => conn.query_row(
                        &format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", spec.name, expression),
                        params![value],
                        |row| row.get(0),
                    )?,
                    None => conn.query_row(
                        &format!("SELECT COUNT(*) FROM {}", spec.name),
                        [],
                        |row| row.get(0),
                    )?,
                };
                Ok(count)
            })
            .await?;

        Ok(count as usize)
    }

    /// Run blocking SQLite work against the open pool
    async fn with_connection<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.connection.connect().await?;

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            work(&mut conn)
        })
        .await?
    }
}

fn upsert_sql(spec: &CollectionSpec) -> String {
    format!(
        "INSERT INTO {} (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        spec.name
    )
}

fn require_key(key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(MessagingError::InvalidInput(
            "record key must not be empty".to_string(),
        ));
    }
    Ok(key.to_string())
}

/// Resolve an index query to its SQL expression and bound value
fn resolve_filter(spec: &CollectionSpec, query: &IndexQuery) -> Result<(String, SqlValue)> {
    let index = spec.index(&query.index)?;
    Ok((index.expression(), to_sql_value(&query.value)?))
}

/// Convert a JSON scalar to the value `json_extract` yields for it
fn to_sql_value(value: &serde_json::Value) -> Result<SqlValue> {
    match value {
        serde_json::Value::Null => Ok(SqlValue::Null),
        serde_json::Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Real(f))
            } else {
                Err(MessagingError::InvalidInput(format!("unsupported index value: {}", n)))
            }
        }
        serde_json::Value::String(s) => Ok(SqlValue::Text(s.clone())),
        other => Err(MessagingError::InvalidInput(format!(
            "index values must be scalars, got {}",
            other
        ))),
    }
}
