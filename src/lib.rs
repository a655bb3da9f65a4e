//! Database-access middleware for a video-analytics metadata store.
//!
//! One API over two backends: a client/server backend (PostgreSQL) speaking
//! binary wire formats for the store's geometric, enumerated and composite
//! types, and an embedded backend (SQLite) storing the same values as
//! canonical text. A [`backend::DbSession`] bundles a connection with query
//! builders and result sets; builders accumulate keys and filters and render
//! dialect-correct SQL, result sets expose typed getters that fail loudly on
//! any mismatch.
//!
//! ```no_run
//! use vidmeta_db::prelude::*;
//!
//! # async fn demo() -> Result<(), VidmetaDbError> {
//! let config = BackendConfig::new(Backend::Sqlite, ":memory:", "vt");
//! let mut session = DbSession::connect(config).await?;
//!
//! let mut builder = session.builder("sequences");
//! builder.where_string("seqname", "cam01", "=", None)?;
//! let sql = builder.select_query();
//!
//! let mut rows = session.result_set();
//! session.fetch(&sql, builder.params(), &mut rows).await?;
//! while rows.step() {
//!     let location = rows.get_string_by_name("location")?;
//!     println!("{location}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod builder;
pub mod dialect;
pub mod error;
pub mod prelude;
pub mod results;
pub mod translation;
pub mod typemap;
pub mod types;
pub mod values;

mod postgres;
mod sqlite;

pub use backend::{Backend, BackendConfig, DatabaseExecutor, DbConnection, DbSession};
pub use builder::QueryBuilder;
pub use dialect::Dialect;
pub use error::VidmetaDbError;
pub use results::{ColumnKey, ResultSet};
pub use types::Value;

pub use postgres::Params as PostgresParams;
pub use postgres::PgConnection;
pub use sqlite::Params as SqliteParams;
pub use sqlite::SqliteConnection;
