use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::values::{
    BoundingBox, InOutType, IntervalEvent, Matrix, Point, ProcessState, ProcessStatus, SeqType,
};

/// Values that can be bound as query parameters or read from a result row.
///
/// One enum covers both backends so builder and caller code never branch on
/// driver types:
/// ```rust
/// use vidmeta_db::prelude::*;
///
/// let params = vec![
///     Value::Int(1),
///     Value::Text("video1.mp4".into()),
///     Value::SeqType(SeqType::Video),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Single character
    Char(char),
    /// Text/string value
    Text(String),
    /// Array of strings
    TextArray(Vec<String>),
    /// Integer value (32-bit)
    Int(i32),
    /// Array of 32-bit integers
    IntArray(Vec<i32>),
    /// Integer value (64-bit)
    BigInt(i64),
    /// Array of 64-bit integers
    BigIntArray(Vec<i64>),
    /// Floating point value (32-bit)
    Float(f32),
    /// Array of 32-bit floats
    FloatArray(Vec<f32>),
    /// Floating point value (64-bit)
    Double(f64),
    /// Array of 64-bit floats
    DoubleArray(Vec<f64>),
    /// Timestamp value (no timezone)
    Timestamp(NaiveDateTime),
    /// Binary data
    Blob(Vec<u8>),
    /// JSON value
    Json(JsonValue),
    /// 2D point
    Point(Point),
    /// Array of 2D points
    PointArray(Vec<Point>),
    /// Rectangular region
    Region(BoundingBox),
    /// Sequence kind
    SeqType(SeqType),
    /// Parameter direction
    InOutType(InOutType),
    /// Task lifecycle status
    ProcessStatus(ProcessStatus),
    /// Task progress snapshot
    State(ProcessState),
    /// Detection event
    Event(IntervalEvent),
    /// Dense numeric matrix
    Matrix(Matrix),
}

impl Value {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        if let Value::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bigint(&self) -> Option<i64> {
        match self {
            Value::BigInt(value) => Some(*value),
            Value::Int(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(value) => Some(*value),
            Value::Float(value) => Some(f64::from(*value)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(value) => Some(*value),
            Value::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let Value::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Short name of the variant, used in conversion error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Text(_) => "text",
            Value::TextArray(_) => "text[]",
            Value::Int(_) => "int",
            Value::IntArray(_) => "int[]",
            Value::BigInt(_) => "bigint",
            Value::BigIntArray(_) => "bigint[]",
            Value::Float(_) => "float",
            Value::FloatArray(_) => "float[]",
            Value::Double(_) => "double",
            Value::DoubleArray(_) => "double[]",
            Value::Timestamp(_) => "timestamp",
            Value::Blob(_) => "blob",
            Value::Json(_) => "json",
            Value::Point(_) => "point",
            Value::PointArray(_) => "point[]",
            Value::Region(_) => "box",
            Value::SeqType(_) => "seqtype",
            Value::InOutType(_) => "inouttype",
            Value::ProcessStatus(_) => "pstatus",
            Value::State(_) => "pstate",
            Value::Event(_) => "event",
            Value::Matrix(_) => "matrix",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_widen_where_safe() {
        assert_eq!(Value::Int(7).as_bigint(), Some(7));
        assert_eq!(Value::Float(1.5).as_double(), Some(1.5));
        assert_eq!(Value::Int(1).as_bool(), Some(true));
        assert_eq!(Value::Text("x".into()).as_int(), None);
    }

    #[test]
    fn timestamp_accessor_parses_text() {
        let ts = Value::Text("2024-05-01 12:30:00".into()).as_timestamp().unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-05-01 12:30:00");
    }
}
