use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

#[cfg(feature = "postgres")]
use crate::config::ConnectionSettings;
use crate::error::SqlFacadeError;
#[cfg(feature = "postgres")]
use crate::postgres::PostgresClient;
use crate::results::{DbRow, ResultSet};
use crate::schema::SchemaCache;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteClient;
use crate::statement::{build_insert, build_update};
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::types::{DatabaseType, DbValue, Params};

/// Backend-neutral execution surface, implemented by each client and by
/// [`DbClient`] through delegation.
#[async_trait]
pub trait DatabaseExecutor {
    /// Execute a statement directly, with nothing bound.
    async fn execute_direct(&mut self, query: &str) -> Result<ResultSet, SqlFacadeError>;

    /// Prepare, bind one parameter set, execute once.
    async fn execute_prepared(
        &mut self,
        query: &str,
        params: &[DbValue],
    ) -> Result<ResultSet, SqlFacadeError>;

    /// Prepare once and execute per parameter set inside a transaction,
    /// returning total rows affected.
    async fn execute_batch_insert(
        &mut self,
        query: &str,
        rows: &[Vec<DbValue>],
    ) -> Result<u64, SqlFacadeError>;

    /// Names of the user tables visible to this connection.
    async fn list_tables(&mut self) -> Result<Vec<String>, SqlFacadeError>;

    /// Column names of `table`, in catalog order.
    async fn list_columns(&mut self, table: &str) -> Result<Vec<String>, SqlFacadeError>;
}

/// The single connection owned by a facade instance.
pub enum DbClient {
    /// PostgreSQL client connection
    #[cfg(feature = "postgres")]
    Postgres(PostgresClient),
    /// SQLite database connection
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteClient),
}

#[async_trait]
impl DatabaseExecutor for DbClient {
    async fn execute_direct(&mut self, query: &str) -> Result<ResultSet, SqlFacadeError> {
        match self {
            #[cfg(feature = "postgres")]
            DbClient::Postgres(client) => client.execute_direct(query).await,
            #[cfg(feature = "sqlite")]
            DbClient::Sqlite(client) => client.execute_direct(query).await,
        }
    }

    async fn execute_prepared(
        &mut self,
        query: &str,
        params: &[DbValue],
    ) -> Result<ResultSet, SqlFacadeError> {
        match self {
            #[cfg(feature = "postgres")]
            DbClient::Postgres(client) => client.execute_prepared(query, params).await,
            #[cfg(feature = "sqlite")]
            DbClient::Sqlite(client) => client.execute_prepared(query, params).await,
        }
    }

    async fn execute_batch_insert(
        &mut self,
        query: &str,
        rows: &[Vec<DbValue>],
    ) -> Result<u64, SqlFacadeError> {
        match self {
            #[cfg(feature = "postgres")]
            DbClient::Postgres(client) => client.execute_batch_insert(query, rows).await,
            #[cfg(feature = "sqlite")]
            DbClient::Sqlite(client) => client.execute_batch_insert(query, rows).await,
        }
    }

    async fn list_tables(&mut self) -> Result<Vec<String>, SqlFacadeError> {
        match self {
            #[cfg(feature = "postgres")]
            DbClient::Postgres(client) => client.list_tables().await,
            #[cfg(feature = "sqlite")]
            DbClient::Sqlite(client) => client.list_tables().await,
        }
    }

    async fn list_columns(&mut self, table: &str) -> Result<Vec<String>, SqlFacadeError> {
        match self {
            #[cfg(feature = "postgres")]
            DbClient::Postgres(client) => client.list_columns(table).await,
            #[cfg(feature = "sqlite")]
            DbClient::Sqlite(client) => client.list_columns(table).await,
        }
    }
}

/// Convenience wrapper around one database connection.
///
/// Owns exactly one connection and a schema cache for its whole lifetime.
/// Calls resolve sequentially; there is no internal concurrency and no
/// pooling. Queries written with `?` placeholders run unchanged on SQLite
/// and are rewritten to `$N` for PostgreSQL.
pub struct QueryFacade {
    client: DbClient,
    db_type: DatabaseType,
    schema: SchemaCache,
}

impl QueryFacade {
    /// Open one PostgreSQL connection from validated settings. Connect
    /// failures propagate; there is no retry.
    #[cfg(feature = "postgres")]
    pub async fn connect_postgres(settings: &ConnectionSettings) -> Result<Self, SqlFacadeError> {
        let client = PostgresClient::connect(settings).await?;
        debug!(host = %settings.host, dbname = %settings.dbname, "connected");
        Ok(Self {
            client: DbClient::Postgres(client),
            db_type: DatabaseType::Postgres,
            schema: SchemaCache::default(),
        })
    }

    /// Open one SQLite connection to `db_path` (`:memory:` works).
    #[cfg(feature = "sqlite")]
    pub async fn connect_sqlite(db_path: impl Into<String>) -> Result<Self, SqlFacadeError> {
        let db_path = db_path.into();
        let client = SqliteClient::connect(db_path.clone()).await?;
        debug!(path = %db_path, "connected");
        Ok(Self {
            client: DbClient::Sqlite(client),
            db_type: DatabaseType::Sqlite,
            schema: SchemaCache::default(),
        })
    }

    /// The engine behind this facade.
    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        match self.db_type {
            DatabaseType::Postgres => PlaceholderStyle::Postgres,
            DatabaseType::Sqlite => PlaceholderStyle::Sqlite,
        }
    }

    /// Execute `query` with the given parameter shape.
    ///
    /// * [`Params::None`]: direct execution, nothing bound. On PostgreSQL
    ///   this uses the simple-query protocol (no client-side prepare); the
    ///   SQLite C API prepares everything, so there the distinction
    ///   collapses to skipping the bind step.
    /// * [`Params::Single`]: prepare, bind, execute once.
    /// * [`Params::Batch`]: batch execution: the statement must be an
    ///   INSERT and the set list non-empty (usage error otherwise); the
    ///   statement is prepared once and executed per set inside a
    ///   transaction. The first failure rolls everything back and
    ///   propagates; success commits and reports total rows affected.
    pub async fn run(&mut self, query: &str, params: Params) -> Result<ResultSet, SqlFacadeError> {
        let sql = translate_placeholders(query, self.placeholder_style());
        debug!(query = %sql, "run");
        match params {
            Params::None => self.client.execute_direct(&sql).await,
            Params::Single(values) => self.client.execute_prepared(&sql, &values).await,
            Params::Batch(rows) => {
                if rows.is_empty() {
                    return Err(SqlFacadeError::UsageError(
                        "batch execution requires at least one parameter set".to_string(),
                    ));
                }
                let first_word = sql.trim_start().split_whitespace().next().unwrap_or("");
                if !first_word.eq_ignore_ascii_case("insert") {
                    return Err(SqlFacadeError::UsageError(
                        "batch execution only supports INSERT statements".to_string(),
                    ));
                }
                let affected = self.client.execute_batch_insert(&sql, &rows).await?;
                let mut result_set = ResultSet::default();
                result_set.rows_affected = affected;
                Ok(result_set)
            }
        }
    }

    // ----------------------------------------
    // Fetch-shape helpers
    //
    // Each composes `run` (an empty value slice takes the direct path)
    // and applies one fixed consumption shape; errors propagate as-is.
    // ----------------------------------------

    /// First row, or `None` if the query returned nothing.
    pub async fn row(
        &mut self,
        query: &str,
        values: &[DbValue],
    ) -> Result<Option<DbRow>, SqlFacadeError> {
        let result_set = self.run(query, Params::from_slice(values)).await?;
        Ok(result_set.results.into_iter().next())
    }

    /// First column of the first row.
    pub async fn cell(
        &mut self,
        query: &str,
        values: &[DbValue],
    ) -> Result<Option<DbValue>, SqlFacadeError> {
        let result_set = self.run(query, Params::from_slice(values)).await?;
        Ok(result_set.first_cell().cloned())
    }

    /// Every row.
    pub async fn all(
        &mut self,
        query: &str,
        values: &[DbValue],
    ) -> Result<Vec<DbRow>, SqlFacadeError> {
        let result_set = self.run(query, Params::from_slice(values)).await?;
        Ok(result_set.results)
    }

    /// Every row reduced to its first column.
    pub async fn column(
        &mut self,
        query: &str,
        values: &[DbValue],
    ) -> Result<Vec<DbValue>, SqlFacadeError> {
        let result_set = self.run(query, Params::from_slice(values)).await?;
        Ok(result_set.into_first_column())
    }

    /// Rows grouped by the textual form of their first column.
    pub async fn group(
        &mut self,
        query: &str,
        values: &[DbValue],
    ) -> Result<HashMap<String, Vec<DbRow>>, SqlFacadeError> {
        let result_set = self.run(query, Params::from_slice(values)).await?;
        Ok(result_set.group_by_first_column())
    }

    /// Two-column result as a first-column to second-column map, last write wins.
    pub async fn keypair(
        &mut self,
        query: &str,
        values: &[DbValue],
    ) -> Result<HashMap<String, DbValue>, SqlFacadeError> {
        let result_set = self.run(query, Params::from_slice(values)).await?;
        result_set.into_keypair()
    }

    /// Two-column result as a first-column to list-of-second-column map.
    pub async fn keypairs(
        &mut self,
        query: &str,
        values: &[DbValue],
    ) -> Result<HashMap<String, Vec<DbValue>>, SqlFacadeError> {
        let result_set = self.run(query, Params::from_slice(values)).await?;
        result_set.into_keypairs()
    }

    // ----------------------------------------
    // Schema guard
    // ----------------------------------------

    /// Check that `table` exists, introspecting the table list on first
    /// use and answering from the cache afterwards.
    pub async fn verify_table(&mut self, table: &str) -> Result<(), SqlFacadeError> {
        if !self.schema.tables_loaded() {
            let tables = self.client.list_tables().await?;
            self.schema.store_tables(tables);
        }
        if self.schema.has_table(table) == Some(true) {
            Ok(())
        } else {
            Err(SqlFacadeError::UnknownTable(table.to_string()))
        }
    }

    /// Check that every column exists on `table`. The table itself is
    /// verified first, so an unknown table reports as
    /// [`SqlFacadeError::UnknownTable`] and a missing column on a known
    /// table as [`SqlFacadeError::UnknownColumn`].
    pub async fn verify_columns(
        &mut self,
        table: &str,
        columns: &[&str],
    ) -> Result<(), SqlFacadeError> {
        self.verify_table(table).await?;
        if self.schema.columns(table).is_none() {
            let cols = self.client.list_columns(table).await?;
            self.schema.store_columns(table, cols);
        }
        let known = match self.schema.columns(table) {
            Some(cols) => cols,
            None => {
                return Err(SqlFacadeError::Other(format!(
                    "column cache missing for {table}"
                )));
            }
        };
        for col in columns {
            if !known.iter().any(|k| k == col) {
                return Err(SqlFacadeError::UnknownColumn {
                    table: table.to_string(),
                    column: (*col).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Drop the whole schema cache; the next verification re-introspects.
    pub fn invalidate_schema(&mut self) {
        self.schema.invalidate();
    }

    /// Drop cached knowledge of one table.
    pub fn invalidate_table(&mut self, table: &str) {
        self.schema.invalidate_table(table);
    }

    // ----------------------------------------
    // Statement builders
    // ----------------------------------------

    /// Insert one row, given `(column, value)` pairs in the order the
    /// columns should appear. Equivalent to [`insert_many`](Self::insert_many)
    /// with a one-element slice and generates the same SQL text and bound
    /// values.
    pub async fn insert(
        &mut self,
        table: &str,
        row: &[(&str, DbValue)],
    ) -> Result<u64, SqlFacadeError> {
        let rows = vec![row.to_vec()];
        self.insert_many(table, &rows).await
    }

    /// Insert one or more rows sharing the first row's column list (same
    /// names, same order; usage error otherwise). Table and columns are
    /// verified against the schema cache before any SQL is generated; one
    /// row executes as a single prepared statement, several rows as a
    /// transactional batch.
    pub async fn insert_many(
        &mut self,
        table: &str,
        rows: &[Vec<(&str, DbValue)>],
    ) -> Result<u64, SqlFacadeError> {
        let Some(first) = rows.first() else {
            return Err(SqlFacadeError::UsageError(
                "insert requires at least one row".to_string(),
            ));
        };
        if first.is_empty() {
            return Err(SqlFacadeError::UsageError(
                "insert requires at least one column".to_string(),
            ));
        }
        let columns: Vec<&str> = first.iter().map(|(c, _)| *c).collect();
        for row in &rows[1..] {
            if row.len() != columns.len()
                || row.iter().zip(&columns).any(|((c, _), expect)| c != expect)
            {
                return Err(SqlFacadeError::UsageError(
                    "every row of a multi-row insert must repeat the first row's columns, in order"
                        .to_string(),
                ));
            }
        }
        self.verify_columns(table, &columns).await?;

        let sql = build_insert(table, &columns);
        let mut value_rows: Vec<Vec<DbValue>> = rows
            .iter()
            .map(|row| row.iter().map(|(_, v)| v.clone()).collect())
            .collect();
        let params = if value_rows.len() == 1 {
            Params::Single(value_rows.swap_remove(0))
        } else {
            Params::Batch(value_rows)
        };
        Ok(self.run(&sql, params).await?.rows_affected)
    }

    /// Update rows matching every condition (AND-joined). SET values bind
    /// strictly before WHERE values, each side in declared order. Both
    /// sides must be non-empty; an unconditional UPDATE is never
    /// generated.
    pub async fn update(
        &mut self,
        table: &str,
        assignments: &[(&str, DbValue)],
        conditions: &[(&str, DbValue)],
    ) -> Result<u64, SqlFacadeError> {
        if assignments.is_empty() {
            return Err(SqlFacadeError::UsageError(
                "update requires at least one assignment".to_string(),
            ));
        }
        if conditions.is_empty() {
            return Err(SqlFacadeError::UsageError(
                "update requires at least one condition".to_string(),
            ));
        }
        let set_columns: Vec<&str> = assignments.iter().map(|(c, _)| *c).collect();
        let where_columns: Vec<&str> = conditions.iter().map(|(c, _)| *c).collect();
        let mut all_columns = set_columns.clone();
        for col in &where_columns {
            if !all_columns.contains(col) {
                all_columns.push(*col);
            }
        }
        self.verify_columns(table, &all_columns).await?;

        let sql = build_update(table, &set_columns, &where_columns);
        let mut values: Vec<DbValue> = assignments.iter().map(|(_, v)| v.clone()).collect();
        values.extend(conditions.iter().map(|(_, v)| v.clone()));
        Ok(self.run(&sql, Params::Single(values)).await?.rows_affected)
    }
}
