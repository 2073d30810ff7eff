//! Storage driver and id generation, the two collaborators the store
//! consumes. The default driver wraps [`rusqlite`]; a different
//! implementation can be injected for testing.

use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::value::{Record, Value};

/// One open connection to the underlying storage engine.
///
/// Statements take positional `?` parameters; values are always bound, never
/// interpolated. Methods take `&mut self`: a connection executes one
/// statement at a time.
#[async_trait]
pub trait StorageConnection: Send {
    /// Run a statement that mutates rows, returning the affected row count.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize>;

    /// Run a query and collect every row, in the order storage returns them.
    async fn query_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Record>>;

    /// Run a query expected to produce at most one row.
    async fn query_one(&mut self, sql: &str, params: &[Value]) -> Result<Option<Record>>;

    /// Release the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens connections for a [`crate::sqlite::SqliteStore`].
#[async_trait]
pub trait StorageDriver: Send + Sync {
    async fn open(&self, path: &str) -> Result<Box<dyn StorageConnection>>;
}

/// Produces collision-resistant string identifiers on demand.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Default id generator backed by random (v4) UUIDs.
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Default driver over a single SQLite file (or `:memory:`).
pub struct SqliteDriver;

#[async_trait]
impl StorageDriver for SqliteDriver {
    async fn open(&self, path: &str) -> Result<Box<dyn StorageConnection>> {
        let conn = Connection::open(path).map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Box::new(SqliteConnection { conn }))
    }
}

struct SqliteConnection {
    conn: Connection,
}

fn row_to_record(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (index, name) in columns.iter().enumerate() {
        record.insert(name.clone(), Value::from(row.get_ref(index)?));
    }
    Ok(record)
}

#[async_trait]
impl StorageConnection for SqliteConnection {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize> {
        Ok(self.conn.execute(sql, params_from_iter(params.iter()))?)
    }

    async fn query_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            row_to_record(row, &columns)
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    async fn query_one(&mut self, sql: &str, params: &[Value]) -> Result<Option<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let record = stmt
            .query_row(params_from_iter(params.iter()), |row| {
                row_to_record(row, &columns)
            })
            .optional()?;
        Ok(record)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| StoreError::Storage(e.to_string()))
    }
}
