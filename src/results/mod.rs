//! Cursor-based access to fetched rows.
//!
//! A `ResultSet` owns the backend-native result of the last fetch plus a
//! signed cursor starting at -1 (before the first row). Typed getters exist
//! by column index and by column name; every access validates initialization,
//! cursor position, column and stored type, and fails loudly instead of
//! returning defaults.

mod postgres;
mod sqlite;

pub use postgres::PgRows;
pub use sqlite::SqliteGrid;

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::VidmetaDbError;
use crate::typemap::DatabaseTypes;
use crate::values::{BoundingBox, IntervalEvent, Matrix, Point, ProcessState};

/// Backend-native result rows; only the owning backend opens the tag.
#[derive(Debug)]
pub enum NativeResult {
    Postgres(PgRows),
    Sqlite(SqliteGrid),
}

/// Column name plus decoded semantic type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnKey {
    pub name: String,
    pub type_name: String,
}

/// Result of one fetch, with a cursor and typed getters.
#[derive(Debug)]
pub struct ResultSet {
    types: Arc<DatabaseTypes>,
    native: Option<NativeResult>,
    pos: i64,
}

impl ResultSet {
    pub(crate) fn new(types: Arc<DatabaseTypes>) -> Self {
        Self {
            types,
            native: None,
            pos: -1,
        }
    }

    /// Replace the held native result and reset the cursor to before the
    /// first row.
    pub(crate) fn new_result(&mut self, native: NativeResult) {
        self.native = Some(native);
        self.pos = -1;
    }

    /// Drop the held native result; subsequent getters fail as uninitialized.
    pub(crate) fn clear(&mut self) {
        self.native = None;
        self.pos = -1;
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.native.is_some()
    }

    #[must_use]
    pub fn count_rows(&self) -> usize {
        match &self.native {
            Some(NativeResult::Postgres(rows)) => rows.count_rows(),
            Some(NativeResult::Sqlite(grid)) => grid.count_rows(),
            None => 0,
        }
    }

    #[must_use]
    pub fn count_cols(&self) -> usize {
        match &self.native {
            Some(NativeResult::Postgres(rows)) => rows.count_cols(),
            Some(NativeResult::Sqlite(grid)) => grid.count_cols(),
            None => 0,
        }
    }

    #[must_use]
    pub fn position(&self) -> i64 {
        self.pos
    }

    pub fn set_position(&mut self, pos: i64) {
        self.pos = pos;
    }

    /// Advance the cursor; returns false once it moves past the last row.
    pub fn step(&mut self) -> bool {
        self.pos += 1;
        match i64::try_from(self.count_rows()) {
            Ok(rows) => self.pos < rows,
            Err(_) => true,
        }
    }

    fn native(&self) -> Result<&NativeResult, VidmetaDbError> {
        self.native.as_ref().ok_or(VidmetaDbError::UninitializedResult)
    }

    fn row(&self) -> Result<usize, VidmetaDbError> {
        let native = self.native()?;
        let rows = match native {
            NativeResult::Postgres(r) => r.count_rows(),
            NativeResult::Sqlite(g) => g.count_rows(),
        };
        usize::try_from(self.pos)
            .ok()
            .filter(|p| *p < rows)
            .ok_or(VidmetaDbError::InvalidPosition {
                pos: self.pos,
                rows,
            })
    }

    /// Name and semantic type of one column.
    ///
    /// # Errors
    ///
    /// Fails for an uninitialized result or an out-of-range column.
    pub fn key(&self, col: usize) -> Result<ColumnKey, VidmetaDbError> {
        match self.native()? {
            NativeResult::Postgres(rows) => rows.key(&self.types, col),
            NativeResult::Sqlite(grid) => grid.key(&self.types, col),
        }
    }

    /// All column keys in order.
    ///
    /// # Errors
    ///
    /// Fails for an uninitialized result.
    pub fn keys(&self) -> Result<Vec<ColumnKey>, VidmetaDbError> {
        self.native()?;
        (0..self.count_cols()).map(|col| self.key(col)).collect()
    }

    /// Resolve a column name to its index.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::InvalidColumn` for unknown names.
    pub fn key_index(&self, name: &str) -> Result<usize, VidmetaDbError> {
        let found = match self.native()? {
            NativeResult::Postgres(rows) => rows.key_index(name),
            NativeResult::Sqlite(grid) => grid.key_index(name),
        };
        found.ok_or_else(|| VidmetaDbError::InvalidColumn(name.to_string()))
    }
}

macro_rules! getters {
    ($( $(#[$meta:meta])* $fn_name:ident / $by_name:ident -> $ret:ty ),+ $(,)?) => {
        impl ResultSet {
            $(
                $(#[$meta])*
                /// # Errors
                ///
                /// Fails for an uninitialized result, an invalid cursor
                /// position, an invalid column, or a stored type the getter
                /// cannot decode.
                pub fn $fn_name(&self, col: usize) -> Result<$ret, VidmetaDbError> {
                    let pos = self.row()?;
                    match self.native()? {
                        NativeResult::Postgres(rows) => rows.$fn_name(pos, col),
                        NativeResult::Sqlite(grid) => grid.$fn_name(pos, col),
                    }
                }

                /// By-name form of the index getter.
                ///
                /// # Errors
                ///
                /// As the index form, plus `VidmetaDbError::InvalidColumn`
                /// for unknown names.
                pub fn $by_name(&self, name: &str) -> Result<$ret, VidmetaDbError> {
                    self.$fn_name(self.key_index(name)?)
                }
            )+
        }
    };
}

getters! {
    /// Decode a boolean column.
    get_bool / get_bool_by_name -> bool,
    /// Decode a single-character column.
    get_char / get_char_by_name -> char,
    /// Decode a text column.
    get_string / get_string_by_name -> String,
    /// Decode a text-array column; empty arrays yield an empty vector.
    get_string_vec / get_string_vec_by_name -> Vec<String>,
    /// Decode a 32-bit integer column.
    get_int / get_int_by_name -> i32,
    /// Decode a 32-bit integer array column.
    get_int_vec / get_int_vec_by_name -> Vec<i32>,
    /// Decode a 64-bit integer column, widening narrower storage.
    get_bigint / get_bigint_by_name -> i64,
    /// Decode a 64-bit integer array column.
    get_bigint_vec / get_bigint_vec_by_name -> Vec<i64>,
    /// Decode a 32-bit float column.
    get_float / get_float_by_name -> f32,
    /// Decode a 32-bit float array column.
    get_float_vec / get_float_vec_by_name -> Vec<f32>,
    /// Decode a 64-bit float column, widening narrower storage.
    get_double / get_double_by_name -> f64,
    /// Decode a 64-bit float array column.
    get_double_vec / get_double_vec_by_name -> Vec<f64>,
    /// Decode a timestamp column.
    get_timestamp / get_timestamp_by_name -> NaiveDateTime,
    /// Decode a 2D point column.
    get_point / get_point_by_name -> Point,
    /// Decode a point-array column.
    get_point_vec / get_point_vec_by_name -> Vec<Point>,
    /// Decode a box column.
    get_region / get_region_by_name -> BoundingBox,
    /// Decode a binary column.
    get_blob / get_blob_by_name -> Vec<u8>,
    /// Decode a JSON column.
    get_json / get_json_by_name -> JsonValue,
    /// Decode an interval-event column.
    get_event / get_event_by_name -> IntervalEvent,
    /// Decode a process-state column.
    get_pstate / get_pstate_by_name -> ProcessState,
    /// Decode a matrix column.
    get_matrix / get_matrix_by_name -> Matrix,
}

impl ResultSet {
    /// Render the current cell as text using the column's semantic category.
    ///
    /// # Errors
    ///
    /// Fails like the typed getters, and with
    /// `VidmetaDbError::UnknownType` when the column's type was never
    /// classified.
    pub fn value(&self, col: usize) -> Result<String, VidmetaDbError> {
        let pos = self.row()?;
        match self.native()? {
            NativeResult::Postgres(rows) => rows.value(&self.types, pos, col),
            NativeResult::Sqlite(grid) => grid.value(&self.types, pos, col),
        }
    }

    /// By-name form of [`ResultSet::value`].
    ///
    /// # Errors
    ///
    /// As [`ResultSet::value`], plus `VidmetaDbError::InvalidColumn`.
    pub fn value_by_name(&self, name: &str) -> Result<String, VidmetaDbError> {
        self.value(self.key_index(name)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rusqlite::types::Value as SqlValue;

    use crate::error::VidmetaDbError;
    use crate::typemap::DatabaseTypes;

    use super::{NativeResult, ResultSet, SqliteGrid};

    fn grid_result() -> ResultSet {
        let mut rs = ResultSet::new(Arc::new(DatabaseTypes::sqlite_builtin()));
        let grid = SqliteGrid::new(
            vec!["id".to_string(), "name".to_string()],
            vec![Some("integer".to_string()), Some("text".to_string())],
        );
        let mut grid = grid;
        grid.push_row(vec![SqlValue::Integer(1), SqlValue::Text("cam01".into())]);
        rs.new_result(NativeResult::Sqlite(grid));
        rs
    }

    #[test]
    fn getter_before_fetch_is_uninitialized() {
        let rs = ResultSet::new(Arc::new(DatabaseTypes::sqlite_builtin()));
        assert!(matches!(
            rs.get_int(0),
            Err(VidmetaDbError::UninitializedResult)
        ));
        assert!(matches!(rs.keys(), Err(VidmetaDbError::UninitializedResult)));
    }

    #[test]
    fn getter_before_step_is_invalid_position() {
        let rs = grid_result();
        assert_eq!(rs.position(), -1);
        assert!(matches!(
            rs.get_int(0),
            Err(VidmetaDbError::InvalidPosition { pos: -1, rows: 1 })
        ));
    }

    #[test]
    fn step_walks_rows_then_stops() {
        let mut rs = grid_result();
        assert!(rs.step());
        assert_eq!(rs.get_int(0).unwrap(), 1);
        assert_eq!(rs.get_string_by_name("name").unwrap(), "cam01");
        assert!(!rs.step());
    }

    #[test]
    fn unknown_column_name_fails() {
        let rs = grid_result();
        assert!(matches!(
            rs.key_index("missing"),
            Err(VidmetaDbError::InvalidColumn(_))
        ));
    }

    #[test]
    fn new_result_resets_cursor() {
        let mut rs = grid_result();
        assert!(rs.step());
        let grid = SqliteGrid::new(vec!["id".to_string()], vec![Some("integer".to_string())]);
        rs.new_result(NativeResult::Sqlite(grid));
        assert_eq!(rs.position(), -1);
        assert_eq!(rs.count_rows(), 0);
    }
}
