//! Parameter binding for the embedded backend.
//!
//! The embedded backend has four storage classes, so composites, arrays and
//! timestamps bind as their canonical text literals.

use rusqlite::types::Value as SqlValue;

use crate::types::Value;
use crate::values::array_literal;

/// Convert a single middleware value to a rusqlite value.
#[must_use]
pub fn value_to_sqlite(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Char(c) => SqlValue::Text(c.to_string()),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::TextArray(v) => SqlValue::Text(array_literal(v)),
        Value::Int(i) => SqlValue::Integer(i64::from(*i)),
        Value::IntArray(v) => SqlValue::Text(array_literal(v)),
        Value::BigInt(i) => SqlValue::Integer(*i),
        Value::BigIntArray(v) => SqlValue::Text(array_literal(v)),
        Value::Float(f) => SqlValue::Real(f64::from(*f)),
        Value::FloatArray(v) => SqlValue::Text(array_literal(v)),
        Value::Double(f) => SqlValue::Real(*f),
        Value::DoubleArray(v) => SqlValue::Text(array_literal(v)),
        Value::Timestamp(ts) => SqlValue::Text(ts.format("%F %T%.f").to_string()),
        Value::Blob(data) => SqlValue::Blob(data.clone()),
        Value::Json(json) => SqlValue::Text(json.to_string()),
        Value::Point(p) => SqlValue::Text(p.to_string()),
        Value::PointArray(v) => SqlValue::Text(array_literal(v)),
        Value::Region(b) => SqlValue::Text(b.to_string()),
        Value::SeqType(e) => SqlValue::Text(e.as_str().to_string()),
        Value::InOutType(e) => SqlValue::Text(e.as_str().to_string()),
        Value::ProcessStatus(e) => SqlValue::Text(e.as_str().to_string()),
        Value::State(s) => SqlValue::Text(s.to_string()),
        Value::Event(e) => SqlValue::Text(e.to_string()),
        Value::Matrix(m) => SqlValue::Text(m.to_string()),
    }
}

/// Unified embedded-backend parameter container.
pub struct Params(pub Vec<SqlValue>);

impl Params {
    /// Convert middleware values into rusqlite values.
    #[must_use]
    pub fn convert(params: &[Value]) -> Self {
        Params(params.iter().map(value_to_sqlite).collect())
    }

    /// Borrow the underlying values.
    #[must_use]
    pub fn as_values(&self) -> &[SqlValue] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rusqlite::types::Value as SqlValue;

    use crate::types::Value;
    use crate::values::{BoundingBox, Point, SeqType};

    use super::value_to_sqlite;

    #[test]
    fn scalars_keep_native_storage() {
        assert_eq!(value_to_sqlite(&Value::Int(7)), SqlValue::Integer(7));
        assert_eq!(value_to_sqlite(&Value::Bool(true)), SqlValue::Integer(1));
        assert_eq!(value_to_sqlite(&Value::Double(1.5)), SqlValue::Real(1.5));
        assert_eq!(value_to_sqlite(&Value::Null), SqlValue::Null);
    }

    #[test]
    fn composites_bind_as_canonical_text() {
        let bbox = BoundingBox::new(Point::new(100.0, 80.0), Point::new(10.0, 20.0));
        assert_eq!(
            value_to_sqlite(&Value::Region(bbox)),
            SqlValue::Text("(100,80,10,20)".to_string())
        );
        assert_eq!(
            value_to_sqlite(&Value::SeqType(SeqType::Video)),
            SqlValue::Text("video".to_string())
        );
        assert_eq!(
            value_to_sqlite(&Value::IntArray(vec![])),
            SqlValue::Text("[]".to_string())
        );
    }

    #[test]
    fn timestamps_bind_with_fractional_seconds() {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_milli_opt(12, 30, 0, 250)
            .unwrap();
        assert_eq!(
            value_to_sqlite(&Value::Timestamp(ts)),
            SqlValue::Text("2024-05-01 12:30:00.250".to_string())
        );
    }
}
