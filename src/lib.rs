//! Async convenience wrapper around one relational-database connection.
//!
//! `sql-facade` cuts the boilerplate out of the common cases: open a
//! connection, run a parameterized query, fetch the result in the shape
//! you actually want (one row, one cell, a column, a grouped map), and
//! generate INSERT/UPDATE statements from column/value pairs with a
//! cached schema check in front. PostgreSQL (`tokio-postgres`) and SQLite
//! (`rusqlite`) backends sit behind cargo features, both on by default.
//!
//! Write placeholders as `?`; they run unchanged on SQLite and are
//! rewritten to `$N` for PostgreSQL (string literals and comments are
//! left alone).
//!
//! ```rust
//! use sql_facade::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlFacadeError> {
//! let mut db = QueryFacade::connect_sqlite(":memory:").await?;
//! db.run(
//!     "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
//!     Params::None,
//! )
//! .await?;
//!
//! db.insert(
//!     "users",
//!     &[("id", DbValue::Int(1)), ("name", DbValue::Text("alice".into()))],
//! )
//! .await?;
//!
//! let name = db
//!     .cell("SELECT name FROM users WHERE id = ?", &[DbValue::Int(1)])
//!     .await?;
//! assert_eq!(name, Some(DbValue::Text("alice".into())));
//! # Ok(())
//! # }
//! ```
//!
//! Each facade owns exactly one connection for its whole lifetime (no
//! pool) and a schema cache that loads lazily and never expires on its
//! own ([`QueryFacade::invalidate_schema`] is the explicit hook).

pub mod config;
pub mod error;
pub mod facade;
pub mod prelude;
pub mod results;
pub mod schema;
pub mod statement;
pub mod translation;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::ConnectionSettings;
pub use error::SqlFacadeError;
pub use facade::{DatabaseExecutor, DbClient, QueryFacade};
pub use results::{DbRow, ResultSet};
pub use types::{DatabaseType, DbValue, Params};

#[cfg(feature = "postgres")]
pub use postgres::build_result_set as postgres_build_result_set;
#[cfg(feature = "sqlite")]
pub use sqlite::build_result_set as sqlite_build_result_set;
