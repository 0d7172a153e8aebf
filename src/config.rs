use serde::{Deserialize, Serialize};

use crate::error::SqlFacadeError;

/// Connection settings for the PostgreSQL backend.
///
/// Assembled into a libpq-style `key=value` connection string; extra
/// `params` merge over the library defaults, caller wins. SQLite needs
/// only a filesystem path and connects through
/// [`QueryFacade::connect_sqlite`](crate::QueryFacade::connect_sqlite)
/// directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub host: String,
    /// Defaults to the engine's standard port when absent.
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub dbname: String,
    /// Extra connection parameters, e.g. `("connect_timeout", "10")` or
    /// `("client_encoding", "UTF8")`.
    #[serde(default)]
    pub params: Vec<(String, String)>,
}

impl ConnectionSettings {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        dbname: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            dbname: dbname.into(),
            port: None,
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Validate and assemble the connection string.
    pub fn to_conn_string(&self) -> Result<String, SqlFacadeError> {
        if self.host.is_empty() {
            return Err(SqlFacadeError::ConfigError("host is required".to_string()));
        }
        if self.user.is_empty() {
            return Err(SqlFacadeError::ConfigError("user is required".to_string()));
        }
        if self.dbname.is_empty() {
            return Err(SqlFacadeError::ConfigError("dbname is required".to_string()));
        }

        let mut pairs: Vec<(String, String)> = vec![
            ("host".to_string(), self.host.clone()),
            ("user".to_string(), self.user.clone()),
            ("dbname".to_string(), self.dbname.clone()),
        ];
        if let Some(port) = self.port {
            pairs.push(("port".to_string(), port.to_string()));
        }
        if !self.password.is_empty() {
            pairs.push(("password".to_string(), self.password.clone()));
        }
        for (key, value) in Self::defaults() {
            if !self.params.iter().any(|(k, _)| k == key) {
                pairs.push((key.to_string(), value.to_string()));
            }
        }
        pairs.extend(self.params.iter().cloned());

        Ok(pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", quote_value(v)))
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn defaults() -> &'static [(&'static str, &'static str)] {
        &[("application_name", "sql-facade")]
    }
}

// libpq quoting: values with whitespace, quotes, or backslashes go in
// single quotes with backslash escapes.
fn quote_value(value: &str) -> String {
    if !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\')
    {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
