//! Minimal asynchronous record store over SQLite.
//!
//! # Intention
//!
//! - Provide connect / create-table / find / find-one / create / update /
//!   delete over a single SQLite database file.
//! - Keep query construction parameter-safe: caller values always bind as
//!   positional parameters, never as interpolated text.
//!
//! # Architectural Boundaries
//!
//! - Only record-store/database code belongs here.
//! - No business logic or unrelated utilities.
//!
//! # Quick Start
//!
//! ```no_run
//! use litestore::{Fields, Filter, FindOptions, Query, SqliteConfig, SqliteStore};
//!
//! # async fn demo() -> litestore::Result<()> {
//! let store = SqliteStore::new(SqliteConfig::new(":memory:"));
//! store.connect().await?;
//! store
//!     .create_table("users", &[("id", "TEXT PRIMARY KEY"), ("name", "TEXT"), ("age", "INTEGER")])
//!     .await?;
//! let mut user = Fields::new().with_value("name", "Alice").with_value("age", 30);
//! let id = store.create("users", &mut user).await?;
//! let adults = store
//!     .find(
//!         "users",
//!         FindOptions::new().with_query(Query::new().with_condition("age", Filter::greater_than(20))),
//!     )
//!     .await?;
//! store.delete("users", Query::new().with_condition("id", Filter::Equal(id))).await?;
//! store.close().await?;
//! # let _ = adults;
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod error;
pub mod query;
pub mod sqlite;
pub mod value;

pub use error::{Result, StoreError};
pub use query::{compile, Clause, Filter, Query};
pub use sqlite::{Fields, FindOptions, SqliteConfig, SqliteStore};
pub use value::{Record, Value};
