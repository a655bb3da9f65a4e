//! Embedded-backend connection lifecycle and statement execution.

use std::sync::Arc;

use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use tracing::debug;

use crate::error::VidmetaDbError;
use crate::results::{NativeResult, ResultSet, SqliteGrid};
use crate::translation::to_sqlite_placeholders;
use crate::typemap::DatabaseTypes;
use crate::types::Value;

use super::params::Params;

/// One connection to the embedded backend.
///
/// The type map is the fixed builtin table; there is no catalog to
/// introspect. Statements arrive with `$N` placeholders and are rewritten to
/// the embedded backend's `?N` form before preparation.
pub struct SqliteConnection {
    path: String,
    conn: Option<Connection>,
    db_types: Arc<DatabaseTypes>,
}

impl SqliteConnection {
    /// Open a database file, or an in-memory database for `":memory:"`.
    ///
    /// # Errors
    ///
    /// Returns driver errors from opening or from the journal pragma.
    pub fn connect(path: &str) -> Result<Self, VidmetaDbError> {
        let conn = open(path)?;
        Ok(Self {
            path: path.to_string(),
            conn: Some(conn),
            db_types: Arc::new(DatabaseTypes::sqlite_builtin()),
        })
    }

    /// Close the connection. Safe to call repeatedly or before connecting.
    pub fn disconnect(&mut self) {
        self.conn = None;
    }

    /// Drop any existing connection and open a fresh one. Works without a
    /// prior successful connect.
    ///
    /// # Errors
    ///
    /// Returns driver errors from opening or from the journal pragma.
    pub fn reconnect(&mut self) -> Result<(), VidmetaDbError> {
        self.disconnect();
        self.conn = Some(open(&self.path)?);
        Ok(())
    }

    /// Probe the connection with a trivial round trip.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        match &self.conn {
            Some(conn) => conn.execute_batch("SELECT 1;").is_ok(),
            None => false,
        }
    }

    #[must_use]
    pub fn db_types(&self) -> Arc<DatabaseTypes> {
        Arc::clone(&self.db_types)
    }

    fn conn(&self) -> Result<&Connection, VidmetaDbError> {
        self.conn
            .as_ref()
            .ok_or_else(|| VidmetaDbError::ConnectionError("not connected".to_string()))
    }

    /// Run a statement that returns no rows; the count of affected rows comes
    /// back. Unparameterized statements run as a batch script and report 0.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::ConnectionError` when disconnected, or the
    /// driver error from execution.
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, VidmetaDbError> {
        let sql = to_sqlite_placeholders(sql);
        debug!(statement = %sql, "executing");
        let conn = self.conn()?;
        let bound = Params::convert(params);
        if bound.as_values().is_empty() {
            // Multi-statement scripts (transactions) only work unparameterized.
            // `changes()` would still report the previous statement's count.
            conn.execute_batch(&sql)?;
            Ok(0)
        } else {
            let changed = conn.execute(&sql, rusqlite::params_from_iter(bound.as_values()))?;
            Ok(changed as u64)
        }
    }

    /// Run a query and hand its rows to `result_set`. On failure the result
    /// set is cleared so stale rows cannot be read.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::ConnectionError` when disconnected, or the
    /// driver error from preparation or execution.
    pub fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
        result_set: &mut ResultSet,
    ) -> Result<usize, VidmetaDbError> {
        let sql = to_sqlite_placeholders(sql);
        debug!(statement = %sql, "fetching");
        let outcome = self.run_query(&sql, params);
        match outcome {
            Ok(grid) => {
                let count = grid.count_rows();
                result_set.new_result(NativeResult::Sqlite(grid));
                Ok(count)
            }
            Err(err) => {
                result_set.clear();
                Err(err)
            }
        }
    }

    fn run_query(&self, sql: &str, params: &[Value]) -> Result<SqliteGrid, VidmetaDbError> {
        let conn = self.conn()?;
        let bound = Params::convert(params);
        let mut statement = conn.prepare(sql)?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let decl_types: Vec<Option<String>> = statement
            .columns()
            .iter()
            .map(|c| c.decl_type().map(str::to_string))
            .collect();
        let mut grid = SqliteGrid::new(columns, decl_types);
        let column_count = statement.column_count();
        let mut rows = statement.query(rusqlite::params_from_iter(bound.as_values()))?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for col in 0..column_count {
                cells.push(row.get::<usize, SqlValue>(col)?);
            }
            grid.push_row(cells);
        }
        Ok(grid)
    }
}

fn open(path: &str) -> Result<Connection, VidmetaDbError> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    Ok(conn)
}
