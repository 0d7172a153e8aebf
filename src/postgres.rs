use std::error::Error;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage, Statement};
use tokio_util::bytes;

use crate::config::ConnectionSettings;
use crate::error::SqlFacadeError;
use crate::results::ResultSet;
use crate::types::DbValue;

/// Single-connection PostgreSQL client.
///
/// The connection driver runs on a spawned task and winds down when the
/// client drops. One connection per client, held for its lifetime; no
/// retry on connect failure.
pub struct PostgresClient {
    client: Client,
}

impl PostgresClient {
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, SqlFacadeError> {
        let conn_string = settings.to_conn_string()?;
        let config = Config::from_str(&conn_string).map_err(|e| {
            SqlFacadeError::ConfigError(format!("invalid connection parameters: {e}"))
        })?;
        let (client, connection) = config.connect(NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("postgres connection task ended: {e}");
            }
        });
        Ok(Self { client })
    }

    /// Execute over the simple-query protocol: no client-side prepare.
    ///
    /// The simple protocol returns every column as text, so rows come back
    /// as `DbValue::Text`/`DbValue::Null` regardless of column type.
    pub async fn execute_direct(&mut self, query: &str) -> Result<ResultSet, SqlFacadeError> {
        let messages = self.client.simple_query(query).await?;
        let mut result_set = ResultSet::default();
        let mut command_rows = 0u64;
        for message in messages {
            match message {
                SimpleQueryMessage::Row(row) => {
                    if result_set.get_column_names().is_none() {
                        let names: Vec<String> = row
                            .columns()
                            .iter()
                            .map(|c| c.name().to_string())
                            .collect();
                        result_set.set_column_names(Arc::new(names));
                    }
                    let mut values = Vec::with_capacity(row.len());
                    for i in 0..row.len() {
                        values.push(match row.try_get(i)? {
                            Some(text) => DbValue::Text(text.to_string()),
                            None => DbValue::Null,
                        });
                    }
                    result_set.add_row_values(values);
                }
                SimpleQueryMessage::CommandComplete(n) => command_rows = n,
                _ => {}
            }
        }
        if result_set.results.is_empty() {
            result_set.rows_affected = command_rows;
        }
        Ok(result_set)
    }

    /// Prepare, bind one parameter set, execute once. Statements that
    /// return no columns report `rows_affected` instead of rows.
    pub async fn execute_prepared(
        &mut self,
        query: &str,
        params: &[DbValue],
    ) -> Result<ResultSet, SqlFacadeError> {
        let stmt = self.client.prepare(query).await?;
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        if stmt.columns().is_empty() {
            let affected = self.client.execute(&stmt, &param_refs).await?;
            let mut result_set = ResultSet::default();
            result_set.rows_affected = affected;
            Ok(result_set)
        } else {
            build_result_set(&self.client, &stmt, &param_refs).await
        }
    }

    /// Prepare once and execute per parameter set inside a transaction.
    /// The first failing set rolls everything back and the error
    /// propagates.
    pub async fn execute_batch_insert(
        &mut self,
        query: &str,
        rows: &[Vec<DbValue>],
    ) -> Result<u64, SqlFacadeError> {
        let tx = self.client.transaction().await?;
        let stmt = tx.prepare(query).await?;
        let mut affected = 0u64;
        for row in rows {
            let param_refs: Vec<&(dyn ToSql + Sync)> =
                row.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
            match tx.execute(&stmt, &param_refs).await {
                Ok(n) => affected += n,
                Err(e) => {
                    tracing::warn!("batch insert failed, rolling back: {e}");
                    let _ = tx.rollback().await;
                    return Err(SqlFacadeError::PostgresError(e));
                }
            }
        }
        tx.commit().await?;
        Ok(affected)
    }

    /// User tables in the `public` schema.
    pub async fn list_tables(&mut self) -> Result<Vec<String>, SqlFacadeError> {
        let result_set = self
            .execute_prepared(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = 'public' ORDER BY table_name",
                &[],
            )
            .await?;
        Ok(text_column(result_set))
    }

    /// Column names of `table`, in ordinal position order.
    pub async fn list_columns(&mut self, table: &str) -> Result<Vec<String>, SqlFacadeError> {
        let result_set = self
            .execute_prepared(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = 'public' AND table_name = $1 ORDER BY ordinal_position",
                &[DbValue::Text(table.to_string())],
            )
            .await?;
        Ok(text_column(result_set))
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

impl ToSql for DbValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            DbValue::Int(i) => (*i).to_sql(ty, out),
            DbValue::Float(f) => (*f).to_sql(ty, out),
            DbValue::Text(s) => s.to_sql(ty, out),
            DbValue::Bool(b) => (*b).to_sql(ty, out),
            DbValue::Timestamp(dt) => dt.to_sql(ty, out),
            DbValue::Null => Ok(IsNull::Yes),
            DbValue::Json(jsval) => jsval.to_sql(ty, out),
            DbValue::Blob(bytes) => bytes.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::CHAR
                | Type::NAME
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        )
    }

    to_sql_checked!();
}

/// Extract a facade value from a row at the given index.
fn extract_value(row: &tokio_postgres::Row, idx: usize) -> Result<DbValue, SqlFacadeError> {
    let type_info = row.columns()[idx].type_();

    if type_info.name() == "int2" {
        let val: Option<i16> = row.try_get(idx)?;
        Ok(val.map_or(DbValue::Null, |v| DbValue::Int(i64::from(v))))
    } else if type_info.name() == "int4" {
        let val: Option<i32> = row.try_get(idx)?;
        Ok(val.map_or(DbValue::Null, |v| DbValue::Int(i64::from(v))))
    } else if type_info.name() == "int8" {
        let val: Option<i64> = row.try_get(idx)?;
        Ok(val.map_or(DbValue::Null, DbValue::Int))
    } else if type_info.name() == "float4" {
        let val: Option<f32> = row.try_get(idx)?;
        Ok(val.map_or(DbValue::Null, |v| DbValue::Float(f64::from(v))))
    } else if type_info.name() == "float8" {
        let val: Option<f64> = row.try_get(idx)?;
        Ok(val.map_or(DbValue::Null, DbValue::Float))
    } else if type_info.name() == "bool" {
        let val: Option<bool> = row.try_get(idx)?;
        Ok(val.map_or(DbValue::Null, DbValue::Bool))
    } else if type_info.name() == "timestamp" || type_info.name() == "timestamptz" {
        let val: Option<NaiveDateTime> = row.try_get(idx)?;
        Ok(val.map_or(DbValue::Null, DbValue::Timestamp))
    } else if type_info.name() == "json" || type_info.name() == "jsonb" {
        let val: Option<JsonValue> = row.try_get(idx)?;
        Ok(val.map_or(DbValue::Null, DbValue::Json))
    } else if type_info.name() == "bytea" {
        let val: Option<Vec<u8>> = row.try_get(idx)?;
        Ok(val.map_or(DbValue::Null, DbValue::Blob))
    } else {
        // Everything else reads as text.
        let val: Option<String> = row.try_get(idx)?;
        Ok(val.map_or(DbValue::Null, DbValue::Text))
    }
}

/// Run a prepared statement and materialize its rows into a [`ResultSet`].
pub async fn build_result_set(
    client: &Client,
    stmt: &Statement,
    params: &[&(dyn ToSql + Sync)],
) -> Result<ResultSet, SqlFacadeError> {
    let rows = client.query(stmt, params).await?;

    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_column_names(Arc::new(column_names));

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            row_values.push(extract_value(&row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
