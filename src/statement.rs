//! Generated SQL text for the insert/update builders.
//!
//! Builders emit bare `?` placeholders; [`crate::translation`] rewrites
//! them for PostgreSQL. Column order is the caller's slice order, so the
//! same inputs always generate the same SQL text.

/// Double-quote an identifier, doubling embedded quotes.
///
/// Double quotes are the identifier form both supported engines accept.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `INSERT INTO <table> (<cols>) VALUES (<placeholders>)` for one row of
/// values. Multi-row inserts reuse the same text via batch execution.
#[must_use]
pub fn build_insert(table: &str, columns: &[&str]) -> String {
    let cols = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        cols,
        placeholders
    )
}

/// `UPDATE <table> SET <col> = ?, .. WHERE <col> = ? AND ..`
///
/// Conditions join with AND only. Placeholder order is SET columns first,
/// then WHERE columns, matching the bind order the facade uses.
#[must_use]
pub fn build_update(table: &str, set_columns: &[&str], where_columns: &[&str]) -> String {
    let assignments = set_columns
        .iter()
        .map(|c| format!("{} = ?", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    let conditions = where_columns
        .iter()
        .map(|c| format!("{} = ?", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(" AND ");
    format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(table),
        assignments,
        conditions
    )
}
