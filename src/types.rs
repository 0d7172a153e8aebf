use std::fmt;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde_json::Value as JsonValue;

/// Values that can be stored in a database row or used as query parameters
///
/// This enum provides a unified representation of database values across
/// the supported database engines.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl DbValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let DbValue::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let DbValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Booleans round-trip through SQLite as integers, so `Int(0)`/`Int(1)`
    /// are accepted here as well.
    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let DbValue::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    /// Timestamps round-trip through SQLite as text; both the plain and the
    /// fractional-seconds renderings are accepted.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let DbValue::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S.%f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let DbValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let DbValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

/// Textual form of a value, used as the key by the grouping and key-pair
/// fetch shapes. SQL NULL renders as the empty string, so NULL keys group
/// under `""`.
impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbValue::Int(i) => write!(f, "{i}"),
            DbValue::Float(v) => write!(f, "{v}"),
            DbValue::Text(s) => f.write_str(s),
            DbValue::Bool(b) => write!(f, "{b}"),
            DbValue::Timestamp(dt) => write!(f, "{}", dt.format("%F %T%.f")),
            DbValue::Null => Ok(()),
            DbValue::Json(jsval) => write!(f, "{jsval}"),
            DbValue::Blob(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
        }
    }
}

/// Execution shape for [`run`](crate::QueryFacade::run): no parameters, one
/// parameter set, or many sets for batch execution.
///
/// The caller picks the variant explicitly; the facade never guesses the
/// shape from the parameters themselves.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    /// Execute the statement directly, with nothing bound.
    #[default]
    None,
    /// Prepare, bind one set of values, execute once.
    Single(Vec<DbValue>),
    /// Prepare once, execute once per set, inside a transaction.
    Batch(Vec<Vec<DbValue>>),
}

impl Params {
    /// `Params::None` for an empty slice, `Params::Single` otherwise.
    #[must_use]
    pub fn from_slice(values: &[DbValue]) -> Self {
        if values.is_empty() {
            Params::None
        } else {
            Params::Single(values.to_vec())
        }
    }
}

impl From<Vec<DbValue>> for Params {
    fn from(values: Vec<DbValue>) -> Self {
        if values.is_empty() {
            Params::None
        } else {
            Params::Single(values)
        }
    }
}

/// The database engine behind a facade instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, serde::Serialize, serde::Deserialize)]
pub enum DatabaseType {
    /// PostgreSQL database
    Postgres,
    /// SQLite database
    Sqlite,
}
