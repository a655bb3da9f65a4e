//! Typed decoding of embedded-backend rows.
//!
//! The embedded backend has no binary wire types, so composites, arrays and
//! timestamps come back as their canonical text literals and are parsed here.
//! Column names and declared types are captured from the prepared statement
//! before the query runs, so they survive zero-row results.

use chrono::NaiveDateTime;
use rusqlite::types::Value as SqlValue;
use serde_json::Value as JsonValue;

use crate::error::VidmetaDbError;
use crate::typemap::{DatabaseTypes, TypeCategory};
use crate::values::{
    hex_encode, parse_array_literal, BoundingBox, IntervalEvent, Matrix, Point, ProcessState,
};

use super::ColumnKey;

/// Materialized rows plus statement column metadata from one fetch.
#[derive(Debug)]
pub struct SqliteGrid {
    columns: Vec<String>,
    decl_types: Vec<Option<String>>,
    rows: Vec<Vec<SqlValue>>,
}

impl SqliteGrid {
    pub(crate) fn new(columns: Vec<String>, decl_types: Vec<Option<String>>) -> Self {
        Self {
            columns,
            decl_types,
            rows: Vec::new(),
        }
    }

    pub(crate) fn push_row(&mut self, row: Vec<SqlValue>) {
        self.rows.push(row);
    }

    pub(crate) fn count_rows(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn count_cols(&self) -> usize {
        self.columns.len()
    }

    pub(crate) fn key(
        &self,
        types: &DatabaseTypes,
        col: usize,
    ) -> Result<ColumnKey, VidmetaDbError> {
        let name = self
            .columns
            .get(col)
            .ok_or_else(|| VidmetaDbError::InvalidColumn(format!("index {col}")))?;
        let decl = self.decl_types.get(col).and_then(Option::as_deref);
        let type_name = match decl.and_then(|d| types.find_by_name(d)) {
            Some(def) => def.name.clone(),
            None => decl.unwrap_or("").to_string(),
        };
        Ok(ColumnKey {
            name: name.clone(),
            type_name,
        })
    }

    pub(crate) fn key_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|n| n == name)
    }

    fn cell(&self, pos: usize, col: usize) -> Result<&SqlValue, VidmetaDbError> {
        if col >= self.columns.len() {
            return Err(VidmetaDbError::InvalidColumn(format!("index {col}")));
        }
        Ok(&self.rows[pos][col])
    }

    fn mismatch(&self, col: usize, requested: &'static str, value: &SqlValue) -> VidmetaDbError {
        let stored = match self.decl_types.get(col).and_then(Option::as_deref) {
            Some(decl) if !decl.is_empty() => decl.to_string(),
            _ => storage_class(value).to_string(),
        };
        VidmetaDbError::TypeMismatch {
            column: self.columns.get(col).cloned().unwrap_or_default(),
            requested,
            stored,
        }
    }

    fn text(&self, pos: usize, col: usize, requested: &'static str) -> Result<&str, VidmetaDbError> {
        match self.cell(pos, col)? {
            SqlValue::Text(text) => Ok(text),
            other => Err(self.mismatch(col, requested, other)),
        }
    }

    pub(crate) fn get_bool(&self, pos: usize, col: usize) -> Result<bool, VidmetaDbError> {
        match self.cell(pos, col)? {
            SqlValue::Integer(0) => Ok(false),
            SqlValue::Integer(1) => Ok(true),
            other => Err(self.mismatch(col, "bool", other)),
        }
    }

    pub(crate) fn get_char(&self, pos: usize, col: usize) -> Result<char, VidmetaDbError> {
        let text = self.text(pos, col, "char")?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => {
                let value = self.cell(pos, col)?.clone();
                Err(self.mismatch(col, "char", &value))
            }
        }
    }

    pub(crate) fn get_string(&self, pos: usize, col: usize) -> Result<String, VidmetaDbError> {
        self.text(pos, col, "string").map(str::to_string)
    }

    pub(crate) fn get_string_vec(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<Vec<String>, VidmetaDbError> {
        let literal = self.text(pos, col, "string[]")?;
        parse_array_literal(literal, "string array", |elem| Ok(elem.to_string()))
    }

    pub(crate) fn get_int(&self, pos: usize, col: usize) -> Result<i32, VidmetaDbError> {
        match self.cell(pos, col)? {
            SqlValue::Integer(v) => i32::try_from(*v)
                .map_err(|_| self.mismatch(col, "int", &SqlValue::Integer(*v))),
            other => Err(self.mismatch(col, "int", other)),
        }
    }

    pub(crate) fn get_int_vec(&self, pos: usize, col: usize) -> Result<Vec<i32>, VidmetaDbError> {
        let literal = self.text(pos, col, "int[]")?;
        parse_array_literal(literal, "int array", parse_number::<i32>)
    }

    pub(crate) fn get_bigint(&self, pos: usize, col: usize) -> Result<i64, VidmetaDbError> {
        match self.cell(pos, col)? {
            SqlValue::Integer(v) => Ok(*v),
            other => Err(self.mismatch(col, "bigint", other)),
        }
    }

    pub(crate) fn get_bigint_vec(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<Vec<i64>, VidmetaDbError> {
        let literal = self.text(pos, col, "bigint[]")?;
        parse_array_literal(literal, "bigint array", parse_number::<i64>)
    }

    pub(crate) fn get_float(&self, pos: usize, col: usize) -> Result<f32, VidmetaDbError> {
        #[allow(clippy::cast_possible_truncation)]
        match self.cell(pos, col)? {
            SqlValue::Real(v) => Ok(*v as f32),
            other => Err(self.mismatch(col, "float", other)),
        }
    }

    pub(crate) fn get_float_vec(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<Vec<f32>, VidmetaDbError> {
        let literal = self.text(pos, col, "float[]")?;
        parse_array_literal(literal, "float array", parse_number::<f32>)
    }

    pub(crate) fn get_double(&self, pos: usize, col: usize) -> Result<f64, VidmetaDbError> {
        match self.cell(pos, col)? {
            SqlValue::Real(v) => Ok(*v),
            SqlValue::Integer(v) => {
                #[allow(clippy::cast_precision_loss)]
                Ok(*v as f64)
            }
            other => Err(self.mismatch(col, "double", other)),
        }
    }

    pub(crate) fn get_double_vec(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<Vec<f64>, VidmetaDbError> {
        let literal = self.text(pos, col, "double[]")?;
        parse_array_literal(literal, "double array", parse_number::<f64>)
    }

    pub(crate) fn get_timestamp(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<NaiveDateTime, VidmetaDbError> {
        let text = self.text(pos, col, "timestamp")?;
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").map_err(|_| {
            let value = SqlValue::Text(text.to_string());
            self.mismatch(col, "timestamp", &value)
        })
    }

    pub(crate) fn get_point(&self, pos: usize, col: usize) -> Result<Point, VidmetaDbError> {
        Point::parse(self.text(pos, col, "point")?)
    }

    pub(crate) fn get_point_vec(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<Vec<Point>, VidmetaDbError> {
        let literal = self.text(pos, col, "point[]")?;
        parse_array_literal(literal, "point array", Point::parse)
    }

    pub(crate) fn get_region(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<BoundingBox, VidmetaDbError> {
        BoundingBox::parse(self.text(pos, col, "box")?)
    }

    pub(crate) fn get_blob(&self, pos: usize, col: usize) -> Result<Vec<u8>, VidmetaDbError> {
        match self.cell(pos, col)? {
            SqlValue::Blob(data) => Ok(data.clone()),
            other => Err(self.mismatch(col, "blob", other)),
        }
    }

    pub(crate) fn get_json(&self, pos: usize, col: usize) -> Result<JsonValue, VidmetaDbError> {
        let text = self.text(pos, col, "json")?;
        serde_json::from_str(text).map_err(|_| {
            let value = SqlValue::Text(text.to_string());
            self.mismatch(col, "json", &value)
        })
    }

    pub(crate) fn get_event(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<IntervalEvent, VidmetaDbError> {
        IntervalEvent::parse(self.text(pos, col, "event")?)
    }

    pub(crate) fn get_pstate(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<ProcessState, VidmetaDbError> {
        ProcessState::parse(self.text(pos, col, "pstate")?)
    }

    pub(crate) fn get_matrix(&self, pos: usize, col: usize) -> Result<Matrix, VidmetaDbError> {
        Matrix::parse(self.text(pos, col, "matrix")?)
    }

    /// Category-dispatched text rendering of one cell. Columns whose declared
    /// type is unknown fall back to the storage class of the stored value.
    pub(crate) fn value(
        &self,
        types: &DatabaseTypes,
        pos: usize,
        col: usize,
    ) -> Result<String, VidmetaDbError> {
        let decl = self.decl_types.get(col).and_then(Option::as_deref);
        let Some(def) = decl.and_then(|d| types.find_by_name(d)) else {
            return self.render_native(pos, col);
        };
        match def.category {
            TypeCategory::String
            | TypeCategory::SeqType
            | TypeCategory::InOutType
            | TypeCategory::ProcessStatus
            | TypeCategory::Point
            | TypeCategory::Box
            | TypeCategory::State
            | TypeCategory::Event
            | TypeCategory::Matrix
            | TypeCategory::Json
            | TypeCategory::Timestamp
            | TypeCategory::Array => self.get_string(pos, col),
            TypeCategory::Int => self.get_bigint(pos, col).map(|v| v.to_string()),
            TypeCategory::Float => self.get_double(pos, col).map(|v| v.to_string()),
            TypeCategory::Boolean => self.get_bool(pos, col).map(|v| v.to_string()),
            TypeCategory::Blob => self.get_blob(pos, col).map(|v| hex_encode(&v)),
            TypeCategory::Numeric
            | TypeCategory::Geometry
            | TypeCategory::RefType
            | TypeCategory::RefClass => Err(VidmetaDbError::Unimplemented(format!(
                "no text rendering for type {}",
                def.name
            ))),
        }
    }

    fn render_native(&self, pos: usize, col: usize) -> Result<String, VidmetaDbError> {
        match self.cell(pos, col)? {
            SqlValue::Null => Ok(String::new()),
            SqlValue::Integer(v) => Ok(v.to_string()),
            SqlValue::Real(v) => Ok(v.to_string()),
            SqlValue::Text(text) => Ok(text.clone()),
            SqlValue::Blob(data) => Ok(hex_encode(data)),
        }
    }
}

fn storage_class(value: &SqlValue) -> &'static str {
    match value {
        SqlValue::Null => "null",
        SqlValue::Integer(_) => "integer",
        SqlValue::Real(_) => "real",
        SqlValue::Text(_) => "text",
        SqlValue::Blob(_) => "blob",
    }
}

fn parse_number<T: std::str::FromStr>(elem: &str) -> Result<T, VidmetaDbError> {
    elem.parse::<T>()
        .map_err(|_| VidmetaDbError::ParameterError(format!("bad array element: {elem:?}")))
}

#[cfg(test)]
mod tests {
    use rusqlite::types::Value as SqlValue;

    use crate::error::VidmetaDbError;
    use crate::typemap::DatabaseTypes;
    use crate::values::{BoundingBox, Point};

    use super::SqliteGrid;

    fn grid(decl: &str, value: SqlValue) -> SqliteGrid {
        let mut grid = SqliteGrid::new(
            vec!["col".to_string()],
            vec![Some(decl.to_string())],
        );
        grid.push_row(vec![value]);
        grid
    }

    #[test]
    fn composites_parse_from_canonical_text() {
        let grid = grid("box", SqlValue::Text("(100,80,10,20)".to_string()));
        assert_eq!(
            grid.get_region(0, 0).unwrap(),
            BoundingBox {
                high: Point { x: 100.0, y: 80.0 },
                low: Point { x: 10.0, y: 20.0 },
            }
        );
    }

    #[test]
    fn empty_array_literal_yields_empty_vec() {
        let grid = grid("integer[]", SqlValue::Text("[]".to_string()));
        assert_eq!(grid.get_int_vec(0, 0).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn mismatch_reports_declared_type() {
        let grid = grid("text", SqlValue::Text("cam01".to_string()));
        match grid.get_int(0, 0) {
            Err(VidmetaDbError::TypeMismatch {
                column,
                requested,
                stored,
            }) => {
                assert_eq!(column, "col");
                assert_eq!(requested, "int");
                assert_eq!(stored, "text");
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }

    #[test]
    fn mismatch_without_decl_reports_storage_class() {
        let mut grid = SqliteGrid::new(vec!["col".to_string()], vec![None]);
        grid.push_row(vec![SqlValue::Real(1.5)]);
        match grid.get_int(0, 0) {
            Err(VidmetaDbError::TypeMismatch { stored, .. }) => assert_eq!(stored, "real"),
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }

    #[test]
    fn value_dispatches_on_declared_type() {
        let types = DatabaseTypes::sqlite_builtin();
        let blob_grid = grid("blob", SqlValue::Blob(vec![0xde, 0xad]));
        assert_eq!(blob_grid.value(&types, 0, 0).unwrap(), "\\xdead");

        let bool_grid = grid("boolean", SqlValue::Integer(1));
        assert_eq!(bool_grid.value(&types, 0, 0).unwrap(), "true");
    }

    #[test]
    fn value_without_decl_renders_native_storage() {
        let types = DatabaseTypes::sqlite_builtin();
        let mut grid = SqliteGrid::new(vec!["col".to_string()], vec![None]);
        grid.push_row(vec![SqlValue::Integer(42)]);
        assert_eq!(grid.value(&types, 0, 0).unwrap(), "42");
    }
}
