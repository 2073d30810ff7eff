//! Tests with injected collaborators: a recording storage driver to observe
//! exactly which statements reach storage, and a deterministic id generator.

use async_trait::async_trait;
use litestore::driver::{IdGenerator, StorageConnection, StorageDriver};
use litestore::{
    Fields, Filter, FindOptions, Query, Record, Result, SqliteConfig, SqliteStore, StoreError,
    Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct RecordingDriver {
    statements: Arc<Mutex<Vec<String>>>,
}

impl RecordingDriver {
    fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageDriver for RecordingDriver {
    async fn open(&self, _path: &str) -> Result<Box<dyn StorageConnection>> {
        Ok(Box::new(RecordingConnection {
            statements: self.statements.clone(),
        }))
    }
}

struct RecordingConnection {
    statements: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl StorageConnection for RecordingConnection {
    async fn execute(&mut self, sql: &str, _params: &[Value]) -> Result<usize> {
        self.statements.lock().unwrap().push(sql.to_string());
        Ok(0)
    }

    async fn query_all(&mut self, sql: &str, _params: &[Value]) -> Result<Vec<Record>> {
        self.statements.lock().unwrap().push(sql.to_string());
        Ok(Vec::new())
    }

    async fn query_one(&mut self, sql: &str, _params: &[Value]) -> Result<Option<Record>> {
        self.statements.lock().unwrap().push(sql.to_string());
        Ok(None)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

async fn recording_store() -> (SqliteStore, RecordingDriver) {
    let driver = RecordingDriver::default();
    let store = SqliteStore::with_driver(
        SqliteConfig::new(":memory:"),
        Arc::new(driver.clone()),
    );
    store.connect().await.expect("connect");
    (store, driver)
}

#[tokio::test]
async fn unknown_operator_never_reaches_storage() {
    let (store, driver) = recording_store().await;

    let err = store
        .find(
            "users",
            FindOptions::new()
                .with_query(Query::new().with_condition("age", Filter::compare("foo", 1))),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownOperator(_)));
    assert!(driver.statements().is_empty());
}

#[tokio::test]
async fn empty_delete_condition_never_reaches_storage() {
    let (store, driver) = recording_store().await;

    let err = store.delete("users", Query::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::MissingWhereClause));
    assert!(driver.statements().is_empty());
}

#[tokio::test]
async fn compiled_statements_have_the_expected_shape() {
    let (store, driver) = recording_store().await;

    store
        .find(
            "users",
            FindOptions::new()
                .with_query(
                    Query::new()
                        .with_condition("age", Filter::greater_than(20))
                        .with_condition("name", Filter::one_of(["A", "B"])),
                )
                .with_order_by("age DESC")
                .with_limit(5),
        )
        .await
        .unwrap();

    store
        .update(
            "users",
            Query::new().with_condition("id", Filter::equal("u-1")),
            &Fields::new().with_value("age", 31).with_value("name", "A"),
        )
        .await
        .unwrap();

    assert_eq!(
        driver.statements(),
        vec![
            "SELECT * FROM users WHERE age > ? AND name IN (?, ?) ORDER BY age DESC LIMIT 5"
                .to_string(),
            "UPDATE users SET age = ?, name = ? WHERE id = ?".to_string(),
        ]
    );
}

struct SequentialIdGenerator {
    next: AtomicUsize,
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        format!("id-{}", self.next.fetch_add(1, Ordering::SeqCst))
    }
}

#[tokio::test]
async fn injected_id_generator_drives_create() -> anyhow::Result<()> {
    let store = SqliteStore::new(SqliteConfig::new(":memory:"))
        .with_id_generator(Arc::new(SequentialIdGenerator {
            next: AtomicUsize::new(0),
        }));
    store.connect().await?;
    store
        .create_table("users", &[("id", "TEXT PRIMARY KEY"), ("name", "TEXT")])
        .await?;

    let mut first = Fields::new().with_value("name", "A");
    let mut second = Fields::new().with_value("name", "B");
    assert_eq!(
        store.create("users", &mut first).await?,
        Value::Text("id-0".into())
    );
    assert_eq!(
        store.create("users", &mut second).await?,
        Value::Text("id-1".into())
    );
    assert_eq!(first.get("id"), Some(&Value::Text("id-0".into())));
    Ok(())
}
