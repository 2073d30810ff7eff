//! The record store facade: one SQLite connection, eight operations.
//!
//! All operations are async and serialized through an internal mutex:
//! `rusqlite::Connection` is `Send` but not `Sync`, so the store protects
//! the handle itself instead of relying on the driver.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::driver::{IdGenerator, SqliteDriver, StorageConnection, StorageDriver, UuidIdGenerator};
use crate::error::{Result, StoreError};
use crate::query::{self, Filter, Query};
use crate::value::{Record, Value};

/// SQLite store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file (`:memory:` for an in-memory store)
    pub db_path: String,
}

impl SqliteConfig {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

/// Column/value payload for `create` and `update`.
///
/// Keeps insertion order: column lists, SET lists, and bound parameters are
/// built in the order values were added. Adding a value for a column that is
/// already present replaces it in place.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Fields {
    entries: Vec<(String, Value)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// Options for `find` and `find_one`.
///
/// `order_by` is appended to the statement verbatim; like column names it
/// cannot be parameterized, so do not pass attacker-controlled input. `limit`
/// and `offset` are independent; either may appear without the other.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FindOptions {
    pub query: Query,
    /// Columns to select; `None` selects `*`.
    pub fields: Option<Vec<String>>,
    pub order_by: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_order_by(mut self, order_by: &str) -> Self {
        self.order_by = Some(order_by.to_string());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

enum State {
    Unconnected,
    Connected(Box<dyn StorageConnection>),
    Closed,
}

impl State {
    fn connection(&mut self) -> Result<&mut Box<dyn StorageConnection>> {
        match self {
            State::Connected(conn) => Ok(conn),
            State::Unconnected | State::Closed => Err(StoreError::NotConnected),
        }
    }
}

/// Record store over a single SQLite database file.
///
/// Lifecycle is `connect` → data operations → `close`. A closed store cannot
/// be reconnected; create a fresh instance instead. The caller is
/// responsible for calling `close` exactly once at end of use.
pub struct SqliteStore {
    config: SqliteConfig,
    driver: Arc<dyn StorageDriver>,
    ids: Arc<dyn IdGenerator>,
    state: Mutex<State>,
}

impl SqliteStore {
    /// Create a new store with the given config and the default SQLite driver
    pub fn new(config: SqliteConfig) -> Self {
        Self::with_driver(config, Arc::new(SqliteDriver))
    }

    pub fn with_driver(config: SqliteConfig, driver: Arc<dyn StorageDriver>) -> Self {
        Self {
            config,
            driver,
            ids: Arc::new(UuidIdGenerator),
            state: Mutex::new(State::Unconnected),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Open the configured database file.
    ///
    /// The only transition into the connected state. Fails with
    /// [`StoreError::Connection`] if the file cannot be opened, if the store
    /// is already connected, or if it has been closed.
    pub async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match &*state {
            State::Unconnected => {
                let conn = self.driver.open(&self.config.db_path).await?;
                info!(path = %self.config.db_path, "connected to sqlite database");
                *state = State::Connected(conn);
                Ok(())
            }
            State::Connected(_) => Err(StoreError::Connection("already connected".to_string())),
            State::Closed => Err(StoreError::Connection(
                "store has been closed".to_string(),
            )),
        }
    }

    /// Create a table if it does not already exist.
    ///
    /// `columns` maps column name to its type declaration text, in order.
    pub async fn create_table(&self, name: &str, columns: &[(&str, &str)]) -> Result<()> {
        let mut state = self.state.lock().await;
        let conn = state.connection()?;
        let defs: Vec<String> = columns
            .iter()
            .map(|(column, declaration)| format!("{column} {declaration}"))
            .collect();
        let sql = format!("CREATE TABLE IF NOT EXISTS {name} ({})", defs.join(", "));
        debug!(table = name, "ensuring table exists");
        conn.execute(&sql, &[]).await?;
        Ok(())
    }

    /// Return every record matching the options, in storage order unless
    /// `order_by` says otherwise.
    pub async fn find(&self, table: &str, options: FindOptions) -> Result<Vec<Record>> {
        let mut state = self.state.lock().await;
        let conn = state.connection()?;
        let (sql, params) = select_sql(table, &options)?;
        conn.query_all(&sql, &params).await
    }

    /// Like `find` with the limit forced to 1; `offset` is not applied.
    /// Zero matches is `Ok(None)`, never an error.
    pub async fn find_one(&self, table: &str, options: FindOptions) -> Result<Option<Record>> {
        let mut state = self.state.lock().await;
        let conn = state.connection()?;
        find_one_on(conn, table, options).await
    }

    /// Insert `data` as one row and return its id.
    ///
    /// When `data` has no `id` field a fresh UUID string is generated and
    /// assigned into `data`, visible to the caller. A present `id` key counts
    /// as caller-supplied whatever its value: zero, empty string, and `Null`
    /// are never coerced to "missing" (an explicit `Null` id will fail the
    /// post-insert read-back, since SQL `NULL` never compares equal). After
    /// inserting, the row is re-read by id to confirm persistence.
    pub async fn create(&self, table: &str, data: &mut Fields) -> Result<Value> {
        let mut state = self.state.lock().await;
        let conn = state.connection()?;
        let id = match data.get("id") {
            Some(id) => id.clone(),
            None => {
                let generated = Value::Text(self.ids.generate());
                data.insert("id", generated.clone());
                generated
            }
        };
        let placeholders = vec!["?"; data.len()].join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            data.names().join(", ")
        );
        conn.execute(&sql, &data.values()).await?;
        let read_back = FindOptions::new()
            .with_query(Query::new().with_condition("id", Filter::Equal(id.clone())));
        match find_one_on(conn, table, read_back).await? {
            Some(_) => Ok(id),
            None => Err(StoreError::Storage(
                "Record not found after insertion".to_string(),
            )),
        }
    }

    /// Update every row matching `query`, returning the affected row count.
    ///
    /// An empty `query` matches all rows; a mass update is allowed here,
    /// unlike `delete`. Zero matches returns 0, never an error.
    pub async fn update(&self, table: &str, query: Query, data: &Fields) -> Result<usize> {
        let mut state = self.state.lock().await;
        let conn = state.connection()?;
        let clause = query::compile(&query)?;
        let assignments: Vec<String> = data
            .names()
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect();
        let sql = format!(
            "UPDATE {table} SET {}{}",
            assignments.join(", "),
            clause.as_where()
        );
        let mut params = data.values();
        params.extend(clause.params);
        conn.execute(&sql, &params).await
    }

    /// Delete every row matching `query`, returning the affected row count.
    ///
    /// Refuses an empty condition with [`StoreError::MissingWhereClause`]:
    /// wiping a table requires an explicit condition, even a tautological
    /// one. Zero matches returns 0, never an error.
    pub async fn delete(&self, table: &str, query: Query) -> Result<usize> {
        let mut state = self.state.lock().await;
        let conn = state.connection()?;
        let clause = query::compile(&query)?;
        if clause.is_empty() {
            return Err(StoreError::MissingWhereClause);
        }
        let sql = format!("DELETE FROM {table}{}", clause.as_where());
        conn.execute(&sql, &clause.params).await
    }

    /// Release the connection. Idempotent: closing an already closed or
    /// never-connected store is a no-op. Data operations after `close` fail
    /// with [`StoreError::NotConnected`].
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, State::Closed) {
            State::Connected(conn) => {
                debug!(path = %self.config.db_path, "closing sqlite connection");
                conn.close().await
            }
            State::Unconnected => {
                *state = State::Unconnected;
                Ok(())
            }
            State::Closed => Ok(()),
        }
    }
}

fn select_sql(table: &str, options: &FindOptions) -> Result<(String, Vec<Value>)> {
    let clause = query::compile(&options.query)?;
    let columns = match &options.fields {
        Some(fields) => fields.join(", "),
        None => "*".to_string(),
    };
    let mut sql = format!("SELECT {columns} FROM {table}");
    sql.push_str(&clause.as_where());
    if let Some(order_by) = &options.order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }
    match (options.limit, options.offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
        // SQLite only accepts OFFSET after a LIMIT clause; -1 means no limit
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }
    Ok((sql, clause.params))
}

async fn find_one_on(
    conn: &mut Box<dyn StorageConnection>,
    table: &str,
    mut options: FindOptions,
) -> Result<Option<Record>> {
    options.limit = Some(1);
    options.offset = None;
    let (sql, params) = select_sql(table, &options)?;
    conn.query_one(&sql, &params).await
}
