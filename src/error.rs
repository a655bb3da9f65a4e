use thiserror::Error;

/// Unified error type for every backend and every layer of the middleware.
///
/// Driver errors are wrapped transparently; the remaining variants carry the
/// failure taxonomy of the access layer itself (configuration, connectivity,
/// parameter conversion, query building, result access, type catalog).
#[derive(Debug, Error)]
pub enum VidmetaDbError {
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Query build error: {0}")]
    QueryBuildError(String),

    #[error("Result set is uninitialized; call fetch before reading")]
    UninitializedResult,

    #[error("Cursor position {pos} is outside the result ({rows} rows)")]
    InvalidPosition { pos: i64, rows: usize },

    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    #[error("Type mismatch on column {column}: requested {requested}, stored {stored}")]
    TypeMismatch {
        column: String,
        requested: &'static str,
        stored: String,
    },

    #[error("Unknown database type: {0}")]
    UnknownType(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}
