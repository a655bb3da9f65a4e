use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VidmetaDbError;

use super::{array_literal, hex_decode, hex_encode, parse_array_literal, split_top_level,
    strip_delimited};

/// Element type of a stored matrix. Codes follow the conventional image-matrix
/// depth order (8U..64F = 0..6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixElem {
    U8,
    I8,
    U16,
    I16,
    I32,
    F32,
    F64,
}

impl MatrixElem {
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            MatrixElem::U8 => 0,
            MatrixElem::I8 => 1,
            MatrixElem::U16 => 2,
            MatrixElem::I16 => 3,
            MatrixElem::I32 => 4,
            MatrixElem::F32 => 5,
            MatrixElem::F64 => 6,
        }
    }

    /// Size of one element in bytes.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            MatrixElem::U8 | MatrixElem::I8 => 1,
            MatrixElem::U16 | MatrixElem::I16 => 2,
            MatrixElem::I32 | MatrixElem::F32 => 4,
            MatrixElem::F64 => 8,
        }
    }

    /// Resolve a stored depth code.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::ParameterError` for codes outside 0..=6.
    pub fn from_code(code: i32) -> Result<Self, VidmetaDbError> {
        match code {
            0 => Ok(MatrixElem::U8),
            1 => Ok(MatrixElem::I8),
            2 => Ok(MatrixElem::U16),
            3 => Ok(MatrixElem::I16),
            4 => Ok(MatrixElem::I32),
            5 => Ok(MatrixElem::F32),
            6 => Ok(MatrixElem::F64),
            other => Err(VidmetaDbError::ParameterError(format!(
                "unknown matrix element code: {other}"
            ))),
        }
    }
}

/// Dense n-dimensional numeric array, stored with its element code, dimension
/// list and raw data. Text form `(code,[d1,d2],\xHEX)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub elem: MatrixElem,
    pub dims: Vec<i32>,
    pub data: Vec<u8>,
}

impl Matrix {
    /// Build a matrix, validating that the payload length matches the
    /// dimensions and element size.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::ParameterError` when the payload length is
    /// inconsistent with `dims` and `elem`.
    pub fn new(elem: MatrixElem, dims: Vec<i32>, data: Vec<u8>) -> Result<Self, VidmetaDbError> {
        let cells: usize = dims
            .iter()
            .map(|d| usize::try_from(*d).unwrap_or(0))
            .product();
        let expected = cells * elem.size();
        if data.len() != expected {
            return Err(VidmetaDbError::ParameterError(format!(
                "matrix payload is {} bytes, dims {:?} with {}-byte elements need {}",
                data.len(),
                dims,
                elem.size(),
                expected
            )));
        }
        Ok(Self { elem, dims, data })
    }

    /// Parse the canonical matrix literal, re-validating the payload length.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::ParameterError` on malformed input.
    pub fn parse(literal: &str) -> Result<Self, VidmetaDbError> {
        let body = strip_delimited(literal, '(', ')', "matrix")?;
        let parts = split_top_level(body);
        if parts.len() != 3 {
            return Err(VidmetaDbError::ParameterError(format!(
                "malformed matrix literal: {literal:?}"
            )));
        }
        let code = parts[0].trim().parse::<i32>().map_err(|_| {
            VidmetaDbError::ParameterError(format!(
                "bad element code in matrix literal: {literal:?}"
            ))
        })?;
        let dims = parse_array_literal(parts[1].trim(), "matrix dims", |s| {
            s.parse::<i32>().map_err(|_| {
                VidmetaDbError::ParameterError(format!(
                    "bad dimension in matrix literal: {literal:?}"
                ))
            })
        })?;
        Self::new(MatrixElem::from_code(code)?, dims, hex_decode(parts[2])?)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{})",
            self.elem.code(),
            array_literal(&self.dims),
            hex_encode(&self.data)
        )
    }
}
