//! Parameter binding for the server backend.

use std::error::Error;

use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use tokio_util::bytes::{BufMut, BytesMut};

use crate::types::Value;

/// Container for server-backend parameters with lifetime tracking.
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Borrow a slice of values as driver parameters.
    #[must_use]
    pub fn convert(params: &'a [Value]) -> Params<'a> {
        let references: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        Params { references }
    }

    /// Get a reference to the underlying parameter array.
    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Char(c) => {
                if *ty == Type::CHAR {
                    out.put_u8(u8::try_from(u32::from(*c))?);
                    Ok(IsNull::No)
                } else {
                    c.to_string().to_sql(ty, out)
                }
            }
            Value::Text(s) => {
                // Enum columns take the raw label bytes.
                if matches!(ty.kind(), Kind::Enum(_)) {
                    out.put_slice(s.as_bytes());
                    Ok(IsNull::No)
                } else {
                    s.to_sql(ty, out)
                }
            }
            Value::TextArray(v) => v.to_sql(ty, out),
            Value::Int(i) => i.to_sql(ty, out),
            Value::IntArray(v) => v.to_sql(ty, out),
            Value::BigInt(i) => i.to_sql(ty, out),
            Value::BigIntArray(v) => v.to_sql(ty, out),
            Value::Float(f) => f.to_sql(ty, out),
            Value::FloatArray(v) => v.to_sql(ty, out),
            Value::Double(f) => f.to_sql(ty, out),
            Value::DoubleArray(v) => v.to_sql(ty, out),
            Value::Timestamp(ts) => ts.to_sql(ty, out),
            Value::Blob(data) => data.to_sql(ty, out),
            Value::Json(json) => json.to_sql(ty, out),
            Value::Point(p) => p.to_sql(ty, out),
            Value::PointArray(v) => v.to_sql(ty, out),
            Value::Region(b) => b.to_sql(ty, out),
            Value::SeqType(e) => e.to_sql(ty, out),
            Value::InOutType(e) => e.to_sql(ty, out),
            Value::ProcessStatus(e) => e.to_sql(ty, out),
            Value::State(s) => s.to_sql(ty, out),
            Value::Event(e) => e.to_sql(ty, out),
            Value::Matrix(m) => m.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        match *ty {
            Type::BOOL
            | Type::CHAR
            | Type::INT2
            | Type::INT4
            | Type::INT8
            | Type::FLOAT4
            | Type::FLOAT8
            | Type::TEXT
            | Type::VARCHAR
            | Type::BPCHAR
            | Type::NAME
            | Type::TIMESTAMP
            | Type::TIMESTAMPTZ
            | Type::BYTEA
            | Type::JSON
            | Type::JSONB
            | Type::POINT
            | Type::BOX => true,
            // User-defined and array types are checked per variant at encode
            // time.
            _ => matches!(
                ty.kind(),
                Kind::Enum(_) | Kind::Composite(_) | Kind::Array(_)
            ),
        }
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use tokio_postgres::types::{IsNull, Kind, ToSql, Type};
    use tokio_util::bytes::BytesMut;

    use crate::types::Value;
    use crate::values::SeqType;

    fn enum_type() -> Type {
        Type::new(
            "seqtype".to_string(),
            90001,
            Kind::Enum(vec![
                "video".to_string(),
                "images".to_string(),
                "data".to_string(),
            ]),
            "vt".to_string(),
        )
    }

    #[test]
    fn null_binds_as_sql_null() {
        let mut buf = BytesMut::new();
        let is_null = Value::Null.to_sql(&Type::INT4, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(buf.is_empty());
    }

    #[test]
    fn enum_value_binds_raw_label() {
        let mut buf = BytesMut::new();
        Value::SeqType(SeqType::Images)
            .to_sql(&enum_type(), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"images");
    }

    #[test]
    fn text_to_enum_column_binds_raw_label() {
        let mut buf = BytesMut::new();
        Value::Text("video".to_string())
            .to_sql(&enum_type(), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"video");
    }

    #[test]
    fn char_binds_single_byte() {
        let mut buf = BytesMut::new();
        Value::Char('A').to_sql(&Type::CHAR, &mut buf).unwrap();
        assert_eq!(&buf[..], b"A");
    }

    #[test]
    fn params_preserve_order() {
        let values = vec![Value::Int(1), Value::Text("a".to_string())];
        let params = super::Params::convert(&values);
        assert_eq!(params.as_refs().len(), 2);
    }
}
