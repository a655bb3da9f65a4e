//! Binary codecs for the server's geometric, enumerated and composite types.
//!
//! Composites travel in the record wire format: a field count, then per field
//! the member type oid, a signed payload length (-1 for NULL) and the payload
//! bytes. Member types are taken from the statement's resolved type metadata,
//! so a column declared with `real` vs `double precision` decodes correctly
//! without recompiling.

use std::error::Error;

use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type, to_sql_checked};
use tokio_util::bytes::{BufMut, BytesMut};

use crate::values::{
    BoundingBox, InOutType, IntervalEvent, Matrix, MatrixElem, Point, ProcessState, ProcessStatus,
    SeqType,
};

type BoxError = Box<dyn Error + Sync + Send>;

impl ToSql for Point {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        out.put_f64(self.x);
        out.put_f64(self.y);
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::POINT
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Point {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let mut reader = Reader::new(raw);
        let point = Point::new(reader.f64()?, reader.f64()?);
        reader.finish()?;
        Ok(point)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::POINT
    }
}

impl ToSql for BoundingBox {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        out.put_f64(self.high.x);
        out.put_f64(self.high.y);
        out.put_f64(self.low.x);
        out.put_f64(self.low.y);
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::BOX
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for BoundingBox {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let mut reader = Reader::new(raw);
        let high = Point::new(reader.f64()?, reader.f64()?);
        let low = Point::new(reader.f64()?, reader.f64()?);
        reader.finish()?;
        Ok(BoundingBox::new(high, low))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::BOX
    }
}

macro_rules! enum_codec {
    ($ty:ident, $name:literal) => {
        impl ToSql for $ty {
            fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
                out.put_slice(self.as_str().as_bytes());
                Ok(IsNull::No)
            }

            fn accepts(ty: &Type) -> bool {
                ty.name() == $name && matches!(ty.kind(), Kind::Enum(_))
            }

            to_sql_checked!();
        }

        impl<'a> FromSql<'a> for $ty {
            fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
                let label = std::str::from_utf8(raw)?;
                $ty::parse(label).map_err(Into::into)
            }

            fn accepts(ty: &Type) -> bool {
                ty.name() == $name && matches!(ty.kind(), Kind::Enum(_))
            }
        }
    };
}

enum_codec!(SeqType, "seqtype");
enum_codec!(InOutType, "inouttype");
enum_codec!(ProcessStatus, "pstatus");

/// Label of any enum column, used by the generic string getter.
pub(crate) struct EnumLabel(pub String);

impl<'a> FromSql<'a> for EnumLabel {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(EnumLabel(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_))
    }
}

impl ToSql for IntervalEvent {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let members = composite_member_types(ty, 6)?;
        write_composite(
            &[
                (&members[0], &self.group_id),
                (&members[1], &self.class_id),
                (&members[2], &self.is_root),
                (&members[3], &self.region),
                (&members[4], &WideFloat(self.score)),
                (&members[5], &self.user_data),
            ],
            out,
        )
    }

    fn accepts(ty: &Type) -> bool {
        ty.name() == "vtevent" && matches!(ty.kind(), Kind::Composite(_))
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for IntervalEvent {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let members = composite_member_types(ty, 6)?;
        let fields = read_composite(raw, 6)?;
        Ok(IntervalEvent {
            group_id: decode_int(&members[0], required(ty, 0, fields[0])?)?,
            class_id: decode_int(&members[1], required(ty, 1, fields[1])?)?,
            is_root: bool::from_sql(&members[2], required(ty, 2, fields[2])?)?,
            region: BoundingBox::from_sql(&members[3], required(ty, 3, fields[3])?)?,
            score: decode_float(&members[4], required(ty, 4, fields[4])?)?,
            // An absent payload is an empty buffer, not an error.
            user_data: fields[5].map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }

    fn accepts(ty: &Type) -> bool {
        ty.name() == "vtevent" && matches!(ty.kind(), Kind::Composite(_))
    }
}

impl ToSql for ProcessState {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let members = composite_member_types(ty, 4)?;
        let current_item = non_empty(&self.current_item);
        let last_error = non_empty(&self.last_error);
        write_composite(
            &[
                (&members[0], &self.status),
                (&members[1], &WideFloat(self.progress)),
                (&members[2], &current_item),
                (&members[3], &last_error),
            ],
            out,
        )
    }

    fn accepts(ty: &Type) -> bool {
        ty.name() == "pstate" && matches!(ty.kind(), Kind::Composite(_))
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for ProcessState {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let members = composite_member_types(ty, 4)?;
        let fields = read_composite(raw, 4)?;
        Ok(ProcessState {
            status: ProcessStatus::from_sql(&members[0], required(ty, 0, fields[0])?)?,
            progress: decode_float(&members[1], required(ty, 1, fields[1])?)?,
            current_item: decode_optional_text(&members[2], fields[2])?,
            last_error: decode_optional_text(&members[3], fields[3])?,
        })
    }

    fn accepts(ty: &Type) -> bool {
        ty.name() == "pstate" && matches!(ty.kind(), Kind::Composite(_))
    }
}

impl ToSql for Matrix {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let members = composite_member_types(ty, 3)?;
        write_composite(
            &[
                (&members[0], &self.elem.code()),
                (&members[1], &self.dims),
                (&members[2], &self.data),
            ],
            out,
        )
    }

    fn accepts(ty: &Type) -> bool {
        ty.name() == "cvmat" && matches!(ty.kind(), Kind::Composite(_))
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Matrix {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let members = composite_member_types(ty, 3)?;
        let fields = read_composite(raw, 3)?;
        let code = decode_int(&members[0], required(ty, 0, fields[0])?)?;
        let dims = Vec::<i32>::from_sql(&members[1], required(ty, 1, fields[1])?)?;
        let data = fields[2].map(<[u8]>::to_vec).unwrap_or_default();
        Matrix::new(MatrixElem::from_code(code)?, dims, data).map_err(Into::into)
    }

    fn accepts(ty: &Type) -> bool {
        ty.name() == "cvmat" && matches!(ty.kind(), Kind::Composite(_))
    }
}

/// Float wrapper that encodes at the member's declared width.
#[derive(Debug)]
struct WideFloat(f64);

impl ToSql for WideFloat {
    #[allow(clippy::cast_possible_truncation)]
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if *ty == Type::FLOAT4 {
            (self.0 as f32).to_sql(ty, out)
        } else {
            self.0.to_sql(ty, out)
        }
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::FLOAT4 || *ty == Type::FLOAT8
    }

    to_sql_checked!();
}

fn non_empty(text: &str) -> Option<&str> {
    if text.is_empty() { None } else { Some(text) }
}

fn composite_member_types(ty: &Type, expected: usize) -> Result<Vec<Type>, BoxError> {
    match ty.kind() {
        Kind::Composite(fields) if fields.len() == expected => {
            Ok(fields.iter().map(|f| f.type_().clone()).collect())
        }
        Kind::Composite(fields) => Err(format!(
            "composite {} has {} members, expected {expected}",
            ty.name(),
            fields.len()
        )
        .into()),
        _ => Err(format!("type {} is not a composite", ty.name()).into()),
    }
}

fn write_composite(
    members: &[(&Type, &(dyn ToSql + Sync))],
    out: &mut BytesMut,
) -> Result<IsNull, BoxError> {
    out.put_i32(i32::try_from(members.len())?);
    for (member_ty, value) in members {
        out.put_u32(member_ty.oid());
        let len_at = out.len();
        out.put_i32(0);
        let start = out.len();
        let len = match value.to_sql_checked(member_ty, out)? {
            IsNull::Yes => -1i32,
            IsNull::No => i32::try_from(out.len() - start)?,
        };
        out[len_at..len_at + 4].copy_from_slice(&len.to_be_bytes());
    }
    Ok(IsNull::No)
}

fn read_composite(raw: &[u8], expected: usize) -> Result<Vec<Option<&[u8]>>, BoxError> {
    let mut reader = Reader::new(raw);
    let count = reader.i32()?;
    if count != i32::try_from(expected)? {
        return Err(format!("composite has {count} fields, expected {expected}").into());
    }
    let mut fields = Vec::with_capacity(expected);
    for _ in 0..expected {
        let _member_oid = reader.u32()?;
        let len = reader.i32()?;
        if len < 0 {
            fields.push(None);
        } else {
            fields.push(Some(reader.slice(usize::try_from(len)?)?));
        }
    }
    reader.finish()?;
    Ok(fields)
}

fn required<'a>(
    ty: &Type,
    index: usize,
    field: Option<&'a [u8]>,
) -> Result<&'a [u8], BoxError> {
    field.ok_or_else(|| format!("member {index} of composite {} is NULL", ty.name()).into())
}

fn decode_int(ty: &Type, raw: &[u8]) -> Result<i32, BoxError> {
    match *ty {
        Type::INT2 => Ok(i32::from(i16::from_sql(ty, raw)?)),
        Type::INT4 => Ok(i32::from_sql(ty, raw)?),
        Type::INT8 => Ok(i32::try_from(i64::from_sql(ty, raw)?)?),
        _ => Err(format!("member type {} is not an integer", ty.name()).into()),
    }
}

fn decode_float(ty: &Type, raw: &[u8]) -> Result<f64, BoxError> {
    match *ty {
        Type::FLOAT4 => Ok(f64::from(f32::from_sql(ty, raw)?)),
        Type::FLOAT8 => Ok(f64::from_sql(ty, raw)?),
        _ => Err(format!("member type {} is not a float", ty.name()).into()),
    }
}

fn decode_optional_text(ty: &Type, raw: Option<&[u8]>) -> Result<String, BoxError> {
    match raw {
        Some(bytes) => Ok(String::from_sql(ty, bytes)?),
        None => Ok(String::new()),
    }
}

/// Big-endian cursor over a binary payload.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn slice(&mut self, len: usize) -> Result<&'a [u8], BoxError> {
        if self.buf.len() < len {
            return Err("unexpected end of binary payload".into());
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn i32(&mut self) -> Result<i32, BoxError> {
        Ok(i32::from_be_bytes(self.slice(4)?.try_into()?))
    }

    fn u32(&mut self) -> Result<u32, BoxError> {
        Ok(u32::from_be_bytes(self.slice(4)?.try_into()?))
    }

    fn f64(&mut self) -> Result<f64, BoxError> {
        Ok(f64::from_be_bytes(self.slice(8)?.try_into()?))
    }

    fn finish(&self) -> Result<(), BoxError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err("trailing bytes in binary payload".into())
        }
    }
}
