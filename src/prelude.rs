//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::ConnectionSettings;
pub use crate::error::SqlFacadeError;
pub use crate::facade::{DatabaseExecutor, DbClient, QueryFacade};
pub use crate::results::{DbRow, ResultSet};
pub use crate::schema::SchemaCache;
pub use crate::translation::{PlaceholderStyle, translate_placeholders};
pub use crate::types::{DatabaseType, DbValue, Params};

#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresClient;
#[cfg(feature = "postgres")]
pub use crate::postgres::build_result_set as postgres_build_result_set;

#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteClient;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::build_result_set as sqlite_build_result_set;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::convert_params as sqlite_convert_params;
