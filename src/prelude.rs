//! Convenient imports for common functionality.
//!
//! Re-exports the types most callers touch: the session factory, query
//! builder, result set and the domain value types.

pub use crate::backend::{Backend, BackendConfig, DatabaseExecutor, DbConnection, DbSession};
pub use crate::builder::QueryBuilder;
pub use crate::dialect::Dialect;
pub use crate::error::VidmetaDbError;
pub use crate::results::{ColumnKey, ResultSet};
pub use crate::typemap::{DatabaseTypes, TypeCategory, TypeDefinition};
pub use crate::types::Value;
pub use crate::values::{
    BoundingBox, InOutType, IntervalEvent, Matrix, MatrixElem, Point, ProcessState, ProcessStatus,
    SeqType,
};
