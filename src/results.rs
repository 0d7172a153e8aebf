use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SqlFacadeError;
use crate::types::DbValue;

/// A row from a database query result
///
/// This struct represents a single row from a database query result,
/// with access to both the column names and the values.
#[derive(Debug, Clone)]
pub struct DbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<DbValue>,
    // Internal cache for faster column lookups (to avoid repeated string comparisons)
    #[doc(hidden)]
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl DbRow {
    /// Create a new database row
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<DbValue>) -> Self {
        let cache = Arc::new(
            column_names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect::<HashMap<_, _>>(),
        );

        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }

        // Fall back to linear search
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&DbValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&DbValue> {
        self.values.get(index)
    }
}

/// A materialized result set from a database query
///
/// Rows share their column names through an `Arc`; `rows_affected` carries
/// the affected-row count for DML statements (for SELECTs it equals the
/// number of rows returned).
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<DbRow>,
    /// The number of rows affected
    pub rows_affected: u64,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Option<Arc<Vec<String>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            rows_affected: 0,
            column_names: None,
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row of values, sharing this result set's column names.
    ///
    /// Ignored if `set_column_names` has not been called yet.
    pub fn add_row_values(&mut self, row_values: Vec<DbValue>) {
        if let Some(column_names) = &self.column_names {
            self.results
                .push(DbRow::new(column_names.clone(), row_values));
            self.rows_affected += 1;
        }
    }

    // ----------------------------------------
    // Fetch-shape reducers used by the facade helpers
    // ----------------------------------------

    /// First row, if any.
    #[must_use]
    pub fn first_row(&self) -> Option<&DbRow> {
        self.results.first()
    }

    /// First column of the first row, if any.
    #[must_use]
    pub fn first_cell(&self) -> Option<&DbValue> {
        self.results.first().and_then(|row| row.get_by_index(0))
    }

    /// Every row reduced to its first column, in row order.
    #[must_use]
    pub fn into_first_column(self) -> Vec<DbValue> {
        self.results
            .into_iter()
            .filter_map(|mut row| {
                if row.values.is_empty() {
                    None
                } else {
                    Some(row.values.swap_remove(0))
                }
            })
            .collect()
    }

    /// Rows grouped by the textual form of their first column.
    #[must_use]
    pub fn group_by_first_column(self) -> HashMap<String, Vec<DbRow>> {
        let mut groups: HashMap<String, Vec<DbRow>> = HashMap::new();
        for row in self.results {
            let key = row
                .get_by_index(0)
                .map(ToString::to_string)
                .unwrap_or_default();
            groups.entry(key).or_default().push(row);
        }
        groups
    }

    /// Two-column result reduced to a first-column to second-column map,
    /// last write wins on duplicate keys.
    pub fn into_keypair(self) -> Result<HashMap<String, DbValue>, SqlFacadeError> {
        self.require_two_columns()?;
        let mut map = HashMap::new();
        for mut row in self.results {
            let value = row.values.swap_remove(1);
            let key = row.values.swap_remove(0).to_string();
            map.insert(key, value);
        }
        Ok(map)
    }

    /// Two-column result reduced to a first-column to list-of-second-column
    /// map, accumulating duplicates.
    pub fn into_keypairs(self) -> Result<HashMap<String, Vec<DbValue>>, SqlFacadeError> {
        self.require_two_columns()?;
        let mut map: HashMap<String, Vec<DbValue>> = HashMap::new();
        for mut row in self.results {
            let value = row.values.swap_remove(1);
            let key = row.values.swap_remove(0).to_string();
            map.entry(key).or_default().push(value);
        }
        Ok(map)
    }

    fn require_two_columns(&self) -> Result<(), SqlFacadeError> {
        let width = self
            .column_names
            .as_ref()
            .map(|names| names.len())
            .or_else(|| self.results.first().map(|row| row.column_names.len()));
        match width {
            Some(2) | None => Ok(()),
            Some(n) => Err(SqlFacadeError::UsageError(format!(
                "key-pair fetch requires exactly 2 columns, query returned {n}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> ResultSet {
        let mut rs = ResultSet::with_capacity(2);
        rs.set_column_names(Arc::new(vec!["id".to_string(), "name".to_string()]));
        rs.add_row_values(vec![DbValue::Int(1), DbValue::Text("a".into())]);
        rs.add_row_values(vec![DbValue::Int(2), DbValue::Text("b".into())]);
        rs
    }

    #[test]
    fn first_row_and_cell() {
        let rs = fixture();
        assert_eq!(rs.first_cell(), Some(&DbValue::Int(1)));
        let row = rs.first_row().unwrap();
        assert_eq!(row.get("name"), Some(&DbValue::Text("a".into())));
    }

    #[test]
    fn first_column_keeps_row_order() {
        assert_eq!(
            fixture().into_first_column(),
            vec![DbValue::Int(1), DbValue::Int(2)]
        );
    }

    #[test]
    fn keypair_last_write_wins() {
        let mut rs = ResultSet::default();
        rs.set_column_names(Arc::new(vec!["k".to_string(), "v".to_string()]));
        rs.add_row_values(vec![DbValue::Text("x".into()), DbValue::Int(1)]);
        rs.add_row_values(vec![DbValue::Text("x".into()), DbValue::Int(2)]);
        let map = rs.into_keypair().unwrap();
        assert_eq!(map.get("x"), Some(&DbValue::Int(2)));
    }

    #[test]
    fn keypairs_accumulate() {
        let mut rs = ResultSet::default();
        rs.set_column_names(Arc::new(vec!["k".to_string(), "v".to_string()]));
        rs.add_row_values(vec![DbValue::Text("x".into()), DbValue::Int(1)]);
        rs.add_row_values(vec![DbValue::Text("x".into()), DbValue::Int(2)]);
        let map = rs.into_keypairs().unwrap();
        assert_eq!(map.get("x").unwrap(), &[DbValue::Int(1), DbValue::Int(2)]);
    }

    #[test]
    fn keypair_rejects_wrong_arity() {
        let rs = fixture(); // two columns is fine
        assert!(rs.into_keypair().is_ok());

        let mut wide = ResultSet::default();
        wide.set_column_names(Arc::new(vec![
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
        ]));
        wide.add_row_values(vec![DbValue::Int(1), DbValue::Int(2), DbValue::Int(3)]);
        assert!(matches!(
            wide.into_keypair(),
            Err(SqlFacadeError::UsageError(_))
        ));
    }

    #[test]
    fn group_by_first_column_collects_rows() {
        let mut rs = ResultSet::default();
        rs.set_column_names(Arc::new(vec!["dept".to_string(), "name".to_string()]));
        rs.add_row_values(vec![DbValue::Text("eng".into()), DbValue::Text("a".into())]);
        rs.add_row_values(vec![DbValue::Text("eng".into()), DbValue::Text("b".into())]);
        rs.add_row_values(vec![DbValue::Null, DbValue::Text("c".into())]);
        let groups = rs.group_by_first_column();
        assert_eq!(groups.get("eng").unwrap().len(), 2);
        // NULL keys group under the empty string
        assert_eq!(groups.get("").unwrap().len(), 1);
    }
}
