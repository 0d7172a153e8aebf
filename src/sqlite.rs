use std::sync::{Arc, Mutex};

use rusqlite::types::Value;
use rusqlite::{Connection, Statement, ToSql};
use tokio::task::spawn_blocking;

use crate::error::SqlFacadeError;
use crate::results::ResultSet;
use crate::statement::quote_ident;
use crate::types::DbValue;

type SharedConnection = Arc<Mutex<Connection>>;

/// Single-connection SQLite client.
///
/// rusqlite is blocking, so every call runs on the blocking pool with the
/// connection behind a mutex. One connection per client, held for its
/// lifetime.
pub struct SqliteClient {
    conn: SharedConnection,
}

async fn run_blocking<F, R>(conn: SharedConnection, f: F) -> Result<R, SqlFacadeError>
where
    F: FnOnce(&mut Connection) -> Result<R, SqlFacadeError> + Send + 'static,
    R: Send + 'static,
{
    spawn_blocking(move || {
        let mut guard = conn.lock().map_err(|_| {
            SqlFacadeError::ConnectionError("SQLite connection mutex poisoned".to_string())
        })?;
        f(&mut guard)
    })
    .await
    .map_err(|e| SqlFacadeError::ConnectionError(format!("blocking task join error: {e}")))?
}

impl SqliteClient {
    /// Open one connection to `db_path` (`:memory:` works) and switch the
    /// journal to WAL.
    pub async fn connect(db_path: String) -> Result<Self, SqlFacadeError> {
        let conn = spawn_blocking(move || -> Result<Connection, SqlFacadeError> {
            let conn = Connection::open(&db_path)?;
            // journal_mode reports the resulting mode, so read it back
            // rather than execute it.
            let _mode: String =
                conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            Ok(conn)
        })
        .await
        .map_err(|e| SqlFacadeError::ConnectionError(format!("blocking task join error: {e}")))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute with nothing bound.
    ///
    /// SQLite's C API prepares every statement, so unlike the PostgreSQL
    /// client this path differs from [`execute_prepared`](Self::execute_prepared)
    /// only in skipping the bind step.
    pub async fn execute_direct(&mut self, query: &str) -> Result<ResultSet, SqlFacadeError> {
        self.execute_prepared(query, &[]).await
    }

    /// Prepare, bind one parameter set, execute once. Statements that
    /// return no columns report `rows_affected` instead of rows.
    pub async fn execute_prepared(
        &mut self,
        query: &str,
        params: &[DbValue],
    ) -> Result<ResultSet, SqlFacadeError> {
        let query_owned = query.to_owned();
        let params_owned = convert_params(params)?;
        run_blocking(Arc::clone(&self.conn), move |conn| {
            let mut stmt = conn.prepare(&query_owned)?;
            if stmt.column_count() == 0 {
                let refs: Vec<&dyn ToSql> = params_owned.iter().map(|v| v as &dyn ToSql).collect();
                let affected = stmt.execute(&refs[..])?;
                let mut result_set = ResultSet::default();
                result_set.rows_affected = affected as u64;
                Ok(result_set)
            } else {
                build_result_set(&mut stmt, &params_owned)
            }
        })
        .await
    }

    /// Prepare once and execute per parameter set inside a transaction.
    /// The first failing set rolls everything back (rusqlite transactions
    /// roll back on drop) and the error propagates.
    pub async fn execute_batch_insert(
        &mut self,
        query: &str,
        rows: &[Vec<DbValue>],
    ) -> Result<u64, SqlFacadeError> {
        let query_owned = query.to_owned();
        let rows_owned = rows
            .iter()
            .map(|row| convert_params(row))
            .collect::<Result<Vec<_>, _>>()?;
        run_blocking(Arc::clone(&self.conn), move |conn| {
            let tx = conn.transaction()?;
            let mut affected = 0u64;
            {
                let mut stmt = tx.prepare(&query_owned)?;
                for row in &rows_owned {
                    let refs: Vec<&dyn ToSql> = row.iter().map(|v| v as &dyn ToSql).collect();
                    affected += stmt.execute(&refs[..])? as u64;
                }
            }
            tx.commit()?;
            Ok(affected)
        })
        .await
    }

    /// User tables, from `sqlite_master`.
    pub async fn list_tables(&mut self) -> Result<Vec<String>, SqlFacadeError> {
        let result_set = self
            .execute_prepared(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                &[],
            )
            .await?;
        Ok(text_column(result_set))
    }

    /// Column names of `table`, in declaration order.
    pub async fn list_columns(&mut self, table: &str) -> Result<Vec<String>, SqlFacadeError> {
        // PRAGMA arguments can't be bound, so the identifier is quoted inline.
        let query = format!("PRAGMA table_info({})", quote_ident(table));
        let result_set = self.execute_prepared(&query, &[]).await?;
        Ok(result_set
            .results
            .iter()
            .filter_map(|row| row.get("name").and_then(DbValue::as_text))
            .map(str::to_string)
            .collect())
    }
}

fn text_column(result_set: ResultSet) -> Vec<String> {
    result_set
        .into_first_column()
        .iter()
        .filter_map(|v| v.as_text())
        .map(str::to_string)
        .collect()
}

/// Bind facade values to SQLite types.
pub fn convert_params(params: &[DbValue]) -> Result<Vec<Value>, SqlFacadeError> {
    let mut vec_values = Vec::with_capacity(params.len());
    for p in params {
        let v = match p {
            DbValue::Int(i) => Value::Integer(*i),
            DbValue::Float(f) => Value::Real(*f),
            DbValue::Text(s) => Value::Text(s.to_string()),
            DbValue::Bool(b) => Value::Integer(i64::from(*b)),
            DbValue::Timestamp(dt) => {
                let formatted = dt.format("%F %T%.f").to_string();
                Value::Text(formatted)
            }
            DbValue::Null => Value::Null,
            DbValue::Json(jsval) => Value::Text(jsval.to_string()),
            DbValue::Blob(bytes) => Value::Blob(bytes.to_vec()),
        };
        vec_values.push(v);
    }
    Ok(vec_values)
}

fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<DbValue, SqlFacadeError> {
    match row.get_ref(idx) {
        Err(e) => Err(SqlFacadeError::SqliteError(e)),
        Ok(rusqlite::types::ValueRef::Null) => Ok(DbValue::Null),
        Ok(rusqlite::types::ValueRef::Integer(i)) => Ok(DbValue::Int(i)),
        Ok(rusqlite::types::ValueRef::Real(f)) => Ok(DbValue::Float(f)),
        Ok(rusqlite::types::ValueRef::Text(bytes)) => {
            let s = String::from_utf8_lossy(bytes).into_owned();
            Ok(DbValue::Text(s))
        }
        Ok(rusqlite::types::ValueRef::Blob(b)) => Ok(DbValue::Blob(b.to_vec())),
    }
}

/// Materialize a prepared statement's rows into a [`ResultSet`].
pub fn build_result_set(
    stmt: &mut Statement,
    params: &[Value],
) -> Result<ResultSet, SqlFacadeError> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::default();
    result_set.set_column_names(std::sync::Arc::new(column_names));

    let mut rows_iter = stmt.query(&param_refs[..])?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            row_values.push(extract_value(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
