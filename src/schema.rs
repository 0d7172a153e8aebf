use std::collections::{HashMap, HashSet};

/// Process-lifetime cache of introspected schema, owned by one facade
/// instance.
///
/// The table list loads on the first table verification, each table's
/// column list on that table's first column verification. Nothing expires
/// on its own; if the schema changes underneath a running process, call
/// [`invalidate`](Self::invalidate) or
/// [`invalidate_table`](Self::invalidate_table).
#[derive(Debug, Default)]
pub struct SchemaCache {
    // None means the table list has not been introspected yet.
    tables: Option<HashSet<String>>,
    columns: HashMap<String, Vec<String>>,
}

impl SchemaCache {
    /// Whether the table list has been loaded.
    #[must_use]
    pub fn tables_loaded(&self) -> bool {
        self.tables.is_some()
    }

    /// Record the introspected table list.
    pub fn store_tables(&mut self, names: impl IntoIterator<Item = String>) {
        self.tables = Some(names.into_iter().collect());
    }

    /// `Some(true)`/`Some(false)` once the table list is loaded, `None`
    /// before.
    #[must_use]
    pub fn has_table(&self, table: &str) -> Option<bool> {
        self.tables.as_ref().map(|t| t.contains(table))
    }

    /// Cached column names for `table`, in catalog order.
    #[must_use]
    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.columns.get(table).map(Vec::as_slice)
    }

    /// Record the introspected column list for `table`.
    pub fn store_columns(&mut self, table: &str, columns: Vec<String>) {
        self.columns.insert(table.to_string(), columns);
    }

    /// Drop everything; the next verification re-introspects.
    pub fn invalidate(&mut self) {
        self.tables = None;
        self.columns.clear();
    }

    /// Drop cached knowledge of one table. The table list is dropped too,
    /// so the next verification re-checks the table's existence.
    pub fn invalidate_table(&mut self, table: &str) {
        self.columns.remove(table);
        self.tables = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unloaded_cache_answers_none() {
        let cache = SchemaCache::default();
        assert!(!cache.tables_loaded());
        assert_eq!(cache.has_table("t"), None);
        assert_eq!(cache.columns("t"), None);
    }

    #[test]
    fn loaded_cache_answers_membership() {
        let mut cache = SchemaCache::default();
        cache.store_tables(vec!["users".to_string()]);
        assert_eq!(cache.has_table("users"), Some(true));
        assert_eq!(cache.has_table("ghost"), Some(false));
    }

    #[test]
    fn invalidate_table_forces_reload() {
        let mut cache = SchemaCache::default();
        cache.store_tables(vec!["users".to_string()]);
        cache.store_columns("users", vec!["id".to_string()]);
        cache.invalidate_table("users");
        assert_eq!(cache.has_table("users"), None);
        assert_eq!(cache.columns("users"), None);
    }
}
