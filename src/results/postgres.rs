//! Typed decoding of server-backend rows.
//!
//! Column metadata is captured from the prepared statement at fetch time so
//! names and types survive zero-row results. Decoding goes through the binary
//! codecs; a driver-level decode failure surfaces as a type mismatch naming
//! the requested and stored types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

use crate::error::VidmetaDbError;
use crate::postgres::codec::EnumLabel;
use crate::typemap::{DatabaseTypes, TypeCategory};
use crate::values::{hex_encode, BoundingBox, IntervalEvent, Matrix, Point, ProcessState};

use super::ColumnKey;

/// Rows plus statement column metadata from one fetch.
#[derive(Debug)]
pub struct PgRows {
    columns: Vec<(String, Type)>,
    rows: Vec<Row>,
}

impl PgRows {
    pub(crate) fn new(columns: Vec<(String, Type)>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
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
        let (name, ty) = self.column(col)?;
        let type_name = match types.get(ty.oid()) {
            Ok(def) => def.name.clone(),
            Err(_) => ty.name().to_string(),
        };
        Ok(ColumnKey {
            name: name.to_string(),
            type_name,
        })
    }

    pub(crate) fn key_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    fn column(&self, col: usize) -> Result<(&str, &Type), VidmetaDbError> {
        self.columns
            .get(col)
            .map(|(name, ty)| (name.as_str(), ty))
            .ok_or_else(|| VidmetaDbError::InvalidColumn(format!("index {col}")))
    }

    /// Decode one cell, reporting driver refusals as a type mismatch.
    fn cell<'a, T: FromSql<'a>>(
        &'a self,
        pos: usize,
        col: usize,
        requested: &'static str,
    ) -> Result<T, VidmetaDbError> {
        let (name, ty) = self.column(col)?;
        self.rows[pos]
            .try_get::<usize, T>(col)
            .map_err(|_| VidmetaDbError::TypeMismatch {
                column: name.to_string(),
                requested,
                stored: ty.name().to_string(),
            })
    }

    pub(crate) fn get_bool(&self, pos: usize, col: usize) -> Result<bool, VidmetaDbError> {
        self.cell(pos, col, "bool")
    }

    pub(crate) fn get_char(&self, pos: usize, col: usize) -> Result<char, VidmetaDbError> {
        if let Ok(byte) = self.cell::<i8>(pos, col, "char") {
            return Ok(char::from(u8::from_ne_bytes(byte.to_ne_bytes())));
        }
        let text: String = self.cell(pos, col, "char")?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => {
                let (name, ty) = self.column(col)?;
                Err(VidmetaDbError::TypeMismatch {
                    column: name.to_string(),
                    requested: "char",
                    stored: ty.name().to_string(),
                })
            }
        }
    }

    pub(crate) fn get_string(&self, pos: usize, col: usize) -> Result<String, VidmetaDbError> {
        let (_, ty) = self.column(col)?;
        if EnumLabel::accepts(ty) {
            return Ok(self.cell::<EnumLabel>(pos, col, "string")?.0);
        }
        self.cell(pos, col, "string")
    }

    pub(crate) fn get_string_vec(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<Vec<String>, VidmetaDbError> {
        self.cell(pos, col, "string[]")
    }

    pub(crate) fn get_int(&self, pos: usize, col: usize) -> Result<i32, VidmetaDbError> {
        if let Ok(v) = self.cell::<i32>(pos, col, "int") {
            return Ok(v);
        }
        self.cell::<i16>(pos, col, "int").map(i32::from)
    }

    pub(crate) fn get_int_vec(&self, pos: usize, col: usize) -> Result<Vec<i32>, VidmetaDbError> {
        self.cell(pos, col, "int[]")
    }

    pub(crate) fn get_bigint(&self, pos: usize, col: usize) -> Result<i64, VidmetaDbError> {
        if let Ok(v) = self.cell::<i64>(pos, col, "bigint") {
            return Ok(v);
        }
        self.get_int(pos, col).map(i64::from)
    }

    pub(crate) fn get_bigint_vec(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<Vec<i64>, VidmetaDbError> {
        if let Ok(v) = self.cell::<Vec<i64>>(pos, col, "bigint[]") {
            return Ok(v);
        }
        let narrow: Vec<i32> = self.cell(pos, col, "bigint[]")?;
        Ok(narrow.into_iter().map(i64::from).collect())
    }

    pub(crate) fn get_float(&self, pos: usize, col: usize) -> Result<f32, VidmetaDbError> {
        self.cell(pos, col, "float")
    }

    pub(crate) fn get_float_vec(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<Vec<f32>, VidmetaDbError> {
        self.cell(pos, col, "float[]")
    }

    pub(crate) fn get_double(&self, pos: usize, col: usize) -> Result<f64, VidmetaDbError> {
        if let Ok(v) = self.cell::<f64>(pos, col, "double") {
            return Ok(v);
        }
        self.cell::<f32>(pos, col, "double").map(f64::from)
    }

    pub(crate) fn get_double_vec(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<Vec<f64>, VidmetaDbError> {
        self.cell(pos, col, "double[]")
    }

    pub(crate) fn get_timestamp(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<NaiveDateTime, VidmetaDbError> {
        if let Ok(ts) = self.cell::<NaiveDateTime>(pos, col, "timestamp") {
            return Ok(ts);
        }
        self.cell::<DateTime<Utc>>(pos, col, "timestamp")
            .map(|ts| ts.naive_utc())
    }

    pub(crate) fn get_point(&self, pos: usize, col: usize) -> Result<Point, VidmetaDbError> {
        self.cell(pos, col, "point")
    }

    pub(crate) fn get_point_vec(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<Vec<Point>, VidmetaDbError> {
        self.cell(pos, col, "point[]")
    }

    pub(crate) fn get_region(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<BoundingBox, VidmetaDbError> {
        self.cell(pos, col, "box")
    }

    pub(crate) fn get_blob(&self, pos: usize, col: usize) -> Result<Vec<u8>, VidmetaDbError> {
        self.cell(pos, col, "blob")
    }

    pub(crate) fn get_json(&self, pos: usize, col: usize) -> Result<JsonValue, VidmetaDbError> {
        self.cell(pos, col, "json")
    }

    pub(crate) fn get_event(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<IntervalEvent, VidmetaDbError> {
        self.cell(pos, col, "event")
    }

    pub(crate) fn get_pstate(
        &self,
        pos: usize,
        col: usize,
    ) -> Result<ProcessState, VidmetaDbError> {
        self.cell(pos, col, "pstate")
    }

    pub(crate) fn get_matrix(&self, pos: usize, col: usize) -> Result<Matrix, VidmetaDbError> {
        self.cell(pos, col, "matrix")
    }

    /// Category-dispatched text rendering of one cell.
    pub(crate) fn value(
        &self,
        types: &DatabaseTypes,
        pos: usize,
        col: usize,
    ) -> Result<String, VidmetaDbError> {
        let (_, ty) = self.column(col)?;
        let def = types.get(ty.oid())?;
        match def.category {
            TypeCategory::String
            | TypeCategory::SeqType
            | TypeCategory::InOutType
            | TypeCategory::ProcessStatus => self.get_string(pos, col),
            TypeCategory::Int => self.get_bigint(pos, col).map(|v| v.to_string()),
            TypeCategory::Float => self.get_double(pos, col).map(|v| v.to_string()),
            TypeCategory::Boolean => self.get_bool(pos, col).map(|v| v.to_string()),
            TypeCategory::Blob => self.get_blob(pos, col).map(|v| hex_encode(&v)),
            TypeCategory::Timestamp => self
                .get_timestamp(pos, col)
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            TypeCategory::Json => self.get_json(pos, col).map(|v| v.to_string()),
            TypeCategory::Point => self.get_point(pos, col).map(|v| v.to_string()),
            TypeCategory::Box => self.get_region(pos, col).map(|v| v.to_string()),
            TypeCategory::State => self.get_pstate(pos, col).map(|v| v.to_string()),
            TypeCategory::Event => self.get_event(pos, col).map(|v| v.to_string()),
            TypeCategory::Matrix => self.get_matrix(pos, col).map(|v| v.to_string()),
            TypeCategory::RefType | TypeCategory::RefClass => self
                .cell::<u32>(pos, col, "reference")
                .map(|oid| oid.to_string()),
            TypeCategory::Array => match def.elem {
                Some((TypeCategory::String, _)) => {
                    self.get_string_vec(pos, col).map(|v| join_array(&v))
                }
                Some((TypeCategory::Int, _)) => {
                    self.get_bigint_vec(pos, col).map(|v| join_array(&v))
                }
                Some((TypeCategory::Float, _)) => {
                    self.get_double_vec(pos, col).map(|v| join_array(&v))
                }
                Some((TypeCategory::Point, _)) => {
                    self.get_point_vec(pos, col).map(|v| join_array(&v))
                }
                _ => Err(VidmetaDbError::Unimplemented(format!(
                    "no text rendering for array type {}",
                    def.name
                ))),
            },
            TypeCategory::Numeric | TypeCategory::Geometry => Err(
                VidmetaDbError::Unimplemented(format!("no text rendering for type {}", def.name)),
            ),
        }
    }
}

fn join_array<T: std::fmt::Display>(items: &[T]) -> String {
    crate::values::array_literal(items)
}
