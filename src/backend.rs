//! Backend selection and the session factory.
//!
//! A `DbSession` bundles one connection with the pieces every caller needs:
//! query builders speaking the session's dialect, result sets sharing the
//! session's type map, and execution. Sessions are plain values; create as
//! many as needed and pass them explicitly.

use std::sync::Arc;

use async_trait::async_trait;
use clap::ValueEnum;

use crate::builder::QueryBuilder;
use crate::dialect::Dialect;
use crate::error::VidmetaDbError;
use crate::postgres::PgConnection;
use crate::results::ResultSet;
use crate::sqlite::SqliteConnection;
use crate::typemap::DatabaseTypes;
use crate::types::Value;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Client/server backend (PostgreSQL).
    Postgres,
    /// Embedded file backend (SQLite).
    Sqlite,
}

impl Backend {
    /// Resolve a configured backend name, failing fast on anything unknown.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::ConfigError` naming the offending value.
    pub fn from_name(name: &str) -> Result<Self, VidmetaDbError> {
        match name.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(VidmetaDbError::ConfigError(format!(
                "unknown backend {other:?}, expected \"postgres\" or \"sqlite\""
            ))),
        }
    }

    #[must_use]
    pub fn dialect(self) -> Dialect {
        match self {
            Backend::Postgres => Dialect::Postgres,
            Backend::Sqlite => Dialect::Sqlite,
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = VidmetaDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::from_name(s)
    }
}

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub backend: Backend,
    /// Driver connection string for Postgres, database file path (or
    /// `":memory:"`) for SQLite.
    pub conninfo: String,
    /// Default schema for builders created by the session.
    pub schema: String,
}

impl BackendConfig {
    #[must_use]
    pub fn new(backend: Backend, conninfo: &str, schema: &str) -> Self {
        Self {
            backend,
            conninfo: conninfo.to_string(),
            schema: schema.to_string(),
        }
    }
}

/// One open connection to either backend.
pub enum DbConnection {
    Postgres(PgConnection),
    Sqlite(SqliteConnection),
}

impl DbConnection {
    #[must_use]
    pub fn db_types(&self) -> Arc<DatabaseTypes> {
        match self {
            DbConnection::Postgres(conn) => conn.db_types(),
            DbConnection::Sqlite(conn) => conn.db_types(),
        }
    }

    pub fn disconnect(&mut self) {
        match self {
            DbConnection::Postgres(conn) => conn.disconnect(),
            DbConnection::Sqlite(conn) => conn.disconnect(),
        }
    }

    /// # Errors
    ///
    /// Returns driver errors from reopening the connection.
    pub async fn reconnect(&mut self) -> Result<(), VidmetaDbError> {
        match self {
            DbConnection::Postgres(conn) => conn.reconnect().await,
            DbConnection::Sqlite(conn) => conn.reconnect(),
        }
    }

    pub async fn is_connected(&self) -> bool {
        match self {
            DbConnection::Postgres(conn) => conn.is_connected().await,
            DbConnection::Sqlite(conn) => conn.is_connected(),
        }
    }
}

/// Statement execution over either backend.
#[async_trait]
pub trait DatabaseExecutor {
    /// Run a statement that returns no rows.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, VidmetaDbError>;

    /// Run a query and hand its rows to `result_set`, returning the row
    /// count.
    async fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
        result_set: &mut ResultSet,
    ) -> Result<usize, VidmetaDbError>;
}

#[async_trait]
impl DatabaseExecutor for DbConnection {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, VidmetaDbError> {
        match self {
            DbConnection::Postgres(conn) => conn.execute(sql, params).await,
            DbConnection::Sqlite(conn) => conn.execute(sql, params),
        }
    }

    async fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
        result_set: &mut ResultSet,
    ) -> Result<usize, VidmetaDbError> {
        match self {
            DbConnection::Postgres(conn) => conn.fetch(sql, params, result_set).await,
            DbConnection::Sqlite(conn) => conn.fetch(sql, params, result_set),
        }
    }
}

/// A connected backend plus the factories tied to it.
pub struct DbSession {
    backend: Backend,
    schema: String,
    connection: DbConnection,
}

impl DbSession {
    /// Connect to the configured backend.
    ///
    /// # Errors
    ///
    /// Returns driver errors from connecting, or catalog-loading errors on
    /// the server backend.
    pub async fn connect(config: BackendConfig) -> Result<Self, VidmetaDbError> {
        let connection = match config.backend {
            Backend::Postgres => {
                DbConnection::Postgres(PgConnection::connect(&config.conninfo).await?)
            }
            Backend::Sqlite => DbConnection::Sqlite(SqliteConnection::connect(&config.conninfo)?),
        };
        Ok(Self {
            backend: config.backend,
            schema: config.schema,
            connection,
        })
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    #[must_use]
    pub fn db_types(&self) -> Arc<DatabaseTypes> {
        self.connection.db_types()
    }

    /// New accumulating builder over `table`, speaking this session's
    /// dialect and defaulting to its schema.
    #[must_use]
    pub fn builder(&self, table: &str) -> QueryBuilder {
        QueryBuilder::new(self.backend.dialect(), &self.schema, table)
    }

    /// New pass-through builder holding a caller-written statement.
    #[must_use]
    pub fn direct(&self, sql: &str) -> QueryBuilder {
        QueryBuilder::direct(self.backend.dialect(), &self.schema, sql)
    }

    /// New result set sharing this session's type map.
    #[must_use]
    pub fn result_set(&self) -> ResultSet {
        ResultSet::new(self.connection.db_types())
    }

    /// # Errors
    ///
    /// As [`DatabaseExecutor::execute`].
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, VidmetaDbError> {
        self.connection.execute(sql, params).await
    }

    /// # Errors
    ///
    /// As [`DatabaseExecutor::fetch`].
    pub async fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
        result_set: &mut ResultSet,
    ) -> Result<usize, VidmetaDbError> {
        self.connection.fetch(sql, params, result_set).await
    }

    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }

    /// # Errors
    ///
    /// Returns driver errors from reopening the connection.
    pub async fn reconnect(&mut self) -> Result<(), VidmetaDbError> {
        self.connection.reconnect().await
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    #[must_use]
    pub fn connection(&mut self) -> &mut DbConnection {
        &mut self.connection
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::Dialect;
    use crate::error::VidmetaDbError;

    use super::Backend;

    #[test]
    fn backend_names_resolve_case_insensitively() {
        assert_eq!(Backend::from_name("postgres").unwrap(), Backend::Postgres);
        assert_eq!(Backend::from_name("PostgreSQL").unwrap(), Backend::Postgres);
        assert_eq!(Backend::from_name("SQLite").unwrap(), Backend::Sqlite);
    }

    #[test]
    fn unknown_backend_name_fails_fast() {
        match Backend::from_name("mysql") {
            Err(VidmetaDbError::ConfigError(msg)) => assert!(msg.contains("mysql")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn backend_maps_to_dialect() {
        assert_eq!(Backend::Postgres.dialect(), Dialect::Postgres);
        assert_eq!(Backend::Sqlite.dialect(), Dialect::Sqlite);
    }
}
