//! Tabular data sources queried by reports.

use std::path::Path;

use log::debug;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};

use crate::error::ReportError;

/// Rows returned by a store query, already converted to display text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Text of cell (`row`, `column`), or an empty string when the row is shorter.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|values| values.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// A queryable table store.
pub trait DataStore {
    /// Runs `sql` and returns the complete result.
    fn query(&self, sql: &str) -> Result<ResultSet, ReportError>;
}

/// The query used when the configuration does not provide one.
pub fn default_query(table_name: &str) -> String {
    format!("SELECT * FROM {table_name} ORDER BY Timestamp ASC")
}

/// Picks the custom query when it has content, otherwise the default query for `table_name`.
///
/// Table names are spliced into the default query, so they must be plain identifiers.
pub fn select_query(custom_query: &str, table_name: &str) -> Result<String, ReportError> {
    if !custom_query.trim().is_empty() {
        return Ok(custom_query.to_owned());
    }

    let valid = !table_name.is_empty()
        && table_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ReportError::config(format!(
            "invalid table name {table_name:?}"
        )));
    }
    Ok(default_query(table_name))
}

/// [`DataStore`] backed by a SQLite database.
pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    /// Opens an existing database file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ReportError::config(format!(
                "data store not found at {}",
                path.display()
            )));
        }
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { connection })
    }

    /// Wraps an already open connection.
    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }
}

impl DataStore for SqliteStore {
    fn query(&self, sql: &str) -> Result<ResultSet, ReportError> {
        debug!("Querying store: {sql}");
        let mut statement = self.connection.prepare(sql)?;
        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect();

        let mut rows = Vec::new();
        let mut cursor = statement.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                values.push(display_value(row.get::<_, Value>(index)?));
            }
            rows.push(values);
        }
        Ok(ResultSet::new(columns, rows))
    }
}

fn display_value(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(s) => s,
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
