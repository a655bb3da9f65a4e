//! Typed key and filter setters.
//!
//! Every setter validates its input first and only then touches builder
//! state, so a failed call leaves the list and the parameter buffer exactly
//! as they were.

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::VidmetaDbError;
use crate::types::Value;
use crate::values::{
    BoundingBox, InOutType, IntervalEvent, Matrix, Point, ProcessState, ProcessStatus, SeqType,
};

use super::{MainItem, QueryBuilder, WhereItem};

fn validate_ident(what: &str, ident: &str) -> Result<(), VidmetaDbError> {
    if ident.trim().is_empty() {
        return Err(VidmetaDbError::QueryBuildError(format!("empty {what}")));
    }
    Ok(())
}

fn owned(table: Option<&str>) -> Option<String> {
    table.filter(|t| !t.is_empty()).map(str::to_string)
}

impl QueryBuilder {
    fn push_main(
        &mut self,
        key: &str,
        table: Option<&str>,
        value: Value,
    ) -> Result<(), VidmetaDbError> {
        validate_ident("key", key)?;
        let param = self.bind(value);
        self.main.push(MainItem {
            key: key.to_string(),
            table: owned(table),
            param: Some(param),
        });
        Ok(())
    }

    fn push_where(
        &mut self,
        column: &str,
        table: Option<&str>,
        oper: &str,
        value: Value,
    ) -> Result<(), VidmetaDbError> {
        validate_ident("filter column", column)?;
        validate_ident("operator", oper)?;
        let param = self.bind(value);
        self.filters.push(WhereItem::Bind {
            column: column.to_string(),
            table: owned(table),
            oper: oper.to_string(),
            param,
        });
        Ok(())
    }

    /// Add a projection-only column; binds no value.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers.
    pub fn key_from(&mut self, table: &str, column: &str) -> Result<(), VidmetaDbError> {
        validate_ident("table", table)?;
        validate_ident("key", column)?;
        self.main.push(MainItem {
            key: column.to_string(),
            table: Some(table.to_string()),
            param: None,
        });
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_bool(
        &mut self,
        key: &str,
        value: bool,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::Bool(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_char(
        &mut self,
        key: &str,
        value: char,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::Char(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key or value.
    pub fn key_string(
        &mut self,
        key: &str,
        value: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        if value.is_empty() {
            return Err(VidmetaDbError::QueryBuildError(format!(
                "empty string value for key {key}"
            )));
        }
        self.push_main(key, from, Value::Text(value.to_string()))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_string_array(
        &mut self,
        key: &str,
        values: Vec<String>,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::TextArray(values))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_int(
        &mut self,
        key: &str,
        value: i32,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::Int(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_int_array(
        &mut self,
        key: &str,
        values: Vec<i32>,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::IntArray(values))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_bigint(
        &mut self,
        key: &str,
        value: i64,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::BigInt(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_bigint_array(
        &mut self,
        key: &str,
        values: Vec<i64>,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::BigIntArray(values))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_float(
        &mut self,
        key: &str,
        value: f32,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::Float(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_float_array(
        &mut self,
        key: &str,
        values: Vec<f32>,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::FloatArray(values))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_double(
        &mut self,
        key: &str,
        value: f64,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::Double(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_double_array(
        &mut self,
        key: &str,
        values: Vec<f64>,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::DoubleArray(values))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_timestamp(
        &mut self,
        key: &str,
        value: NaiveDateTime,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::Timestamp(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_blob(
        &mut self,
        key: &str,
        value: Vec<u8>,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::Blob(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_json(
        &mut self,
        key: &str,
        value: JsonValue,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::Json(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_point(
        &mut self,
        key: &str,
        value: Point,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::Point(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_point_array(
        &mut self,
        key: &str,
        values: Vec<Point>,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::PointArray(values))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_region(
        &mut self,
        key: &str,
        value: BoundingBox,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::Region(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_seqtype(
        &mut self,
        key: &str,
        value: SeqType,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::SeqType(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_inouttype(
        &mut self,
        key: &str,
        value: InOutType,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::InOutType(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_pstatus(
        &mut self,
        key: &str,
        value: ProcessStatus,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::ProcessStatus(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_pstate(
        &mut self,
        key: &str,
        value: ProcessState,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::State(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_event(
        &mut self,
        key: &str,
        value: IntervalEvent,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::Event(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for an empty key.
    pub fn key_matrix(
        &mut self,
        key: &str,
        value: Matrix,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_main(key, from, Value::Matrix(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers.
    pub fn where_bool(
        &mut self,
        column: &str,
        value: bool,
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_where(column, from, oper, Value::Bool(value))
    }

    /// Filter on a string column. The sentinels `"NULL"` and `"NOT NULL"`
    /// render `IS NULL` / `IS NOT NULL` and bind no value.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers or an
    /// empty value.
    pub fn where_string(
        &mut self,
        column: &str,
        value: &str,
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        validate_ident("filter column", column)?;
        match value {
            "NULL" | "NOT NULL" => {
                self.filters.push(WhereItem::Null {
                    column: column.to_string(),
                    table: owned(from),
                    not: value == "NOT NULL",
                });
                Ok(())
            }
            "" => Err(VidmetaDbError::QueryBuildError(format!(
                "empty string filter on column {column}"
            ))),
            _ => self.push_where(column, from, oper, Value::Text(value.to_string())),
        }
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers.
    pub fn where_int(
        &mut self,
        column: &str,
        value: i32,
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_where(column, from, oper, Value::Int(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers.
    pub fn where_bigint(
        &mut self,
        column: &str,
        value: i64,
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_where(column, from, oper, Value::BigInt(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers.
    pub fn where_float(
        &mut self,
        column: &str,
        value: f32,
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_where(column, from, oper, Value::Float(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers.
    pub fn where_double(
        &mut self,
        column: &str,
        value: f64,
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_where(column, from, oper, Value::Double(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers.
    pub fn where_timestamp(
        &mut self,
        column: &str,
        value: NaiveDateTime,
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_where(column, from, oper, Value::Timestamp(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers.
    pub fn where_seqtype(
        &mut self,
        column: &str,
        value: SeqType,
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_where(column, from, oper, Value::SeqType(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers.
    pub fn where_inouttype(
        &mut self,
        column: &str,
        value: InOutType,
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_where(column, from, oper, Value::InOutType(value))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers.
    pub fn where_pstatus(
        &mut self,
        column: &str,
        value: ProcessStatus,
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        self.push_where(column, from, oper, Value::ProcessStatus(value))
    }

    /// Region filter. The box is inlined as a quoted literal because geometric
    /// operators take the value server-side in its literal form.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers.
    pub fn where_region(
        &mut self,
        column: &str,
        value: &BoundingBox,
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        validate_ident("filter column", column)?;
        validate_ident("operator", oper)?;
        let literal = match self.dialect() {
            crate::dialect::Dialect::Postgres => {
                format!("{}::box", self.dialect_escape_literal(&value.to_pg_literal()))
            }
            crate::dialect::Dialect::Sqlite => {
                self.dialect_escape_literal(&value.to_string())
            }
        };
        self.filters.push(WhereItem::Inline {
            column: column.to_string(),
            table: owned(from),
            oper: oper.to_string(),
            literal,
        });
        Ok(())
    }

    /// `IN`-list filter over escaped string literals.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers or an
    /// empty list.
    pub fn where_string_list(
        &mut self,
        column: &str,
        values: &[&str],
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        validate_ident("filter column", column)?;
        validate_ident("operator", oper)?;
        if values.is_empty() {
            return Err(VidmetaDbError::QueryBuildError(format!(
                "empty list filter on column {column}"
            )));
        }
        let items: Vec<String> = values
            .iter()
            .map(|v| self.dialect_escape_literal(v))
            .collect();
        self.filters.push(WhereItem::Inline {
            column: column.to_string(),
            table: owned(from),
            oper: oper.to_string(),
            literal: format!("({})", items.join(",")),
        });
        Ok(())
    }

    /// `IN`-list filter over integer literals.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers or an
    /// empty list.
    pub fn where_int_list(
        &mut self,
        column: &str,
        values: &[i32],
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        validate_ident("filter column", column)?;
        validate_ident("operator", oper)?;
        if values.is_empty() {
            return Err(VidmetaDbError::QueryBuildError(format!(
                "empty list filter on column {column}"
            )));
        }
        let items: Vec<String> = values.iter().map(ToString::to_string).collect();
        self.filters.push(WhereItem::Inline {
            column: column.to_string(),
            table: owned(from),
            oper: oper.to_string(),
            literal: format!("({})", items.join(",")),
        });
        Ok(())
    }

    /// Filter intervals whose `[start, start + length]` range matches the
    /// given window. Server-side only: the range is assembled with
    /// `public.tsrange`, which the embedded backend does not have.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty identifiers and
    /// `VidmetaDbError::Unimplemented` on the embedded backend.
    pub fn where_time_range(
        &mut self,
        key_start: &str,
        key_length: &str,
        start: NaiveDateTime,
        length_secs: u32,
        oper: &str,
        from: Option<&str>,
    ) -> Result<(), VidmetaDbError> {
        validate_ident("filter column", key_start)?;
        validate_ident("filter column", key_length)?;
        validate_ident("operator", oper)?;
        if self.dialect() == crate::dialect::Dialect::Sqlite {
            return Err(VidmetaDbError::Unimplemented(
                "time-range filters are not available on the embedded backend".to_string(),
            ));
        }
        let end = start + chrono::Duration::seconds(i64::from(length_secs));
        let window = format!(
            "'[{},{}]'",
            start.format("%Y-%m-%d %H:%M:%S"),
            end.format("%Y-%m-%d %H:%M:%S")
        );
        let range = format!(
            "public.tsrange({},{})",
            self.construct_column(key_start, from),
            self.construct_column(key_length, from)
        );
        self.filters.push(WhereItem::Expression {
            expr: window,
            oper: oper.to_string(),
            value: range,
        });
        Ok(())
    }

    /// Free-form filter; both sides are rendered verbatim.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` for empty input.
    pub fn where_expression(
        &mut self,
        expression: &str,
        value: &str,
        oper: &str,
    ) -> Result<(), VidmetaDbError> {
        validate_ident("expression", expression)?;
        validate_ident("operator", oper)?;
        validate_ident("expression value", value)?;
        self.filters.push(WhereItem::Expression {
            expr: expression.to_string(),
            oper: oper.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::Dialect;
    use crate::types::Value;

    use super::super::QueryBuilder;

    #[test]
    fn interleaved_setters_bind_in_call_order() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "intervals");
        builder.key_int("t1", 10, None).unwrap();
        builder.where_string("seqname", "cam01", "=", None).unwrap();
        builder.key_int("t2", 20, None).unwrap();
        builder.where_int("taskid", 7, ">", None).unwrap();

        assert_eq!(
            builder.params(),
            &[
                Value::Int(10),
                Value::Text("cam01".into()),
                Value::Int(20),
                Value::Int(7),
            ]
        );
        let sql = builder.update_query(None).unwrap();
        assert!(sql.contains("\"t1\" = $1"));
        assert!(sql.contains("\"t2\" = $3"));
        assert!(sql.contains("\"seqname\" = $2"));
        assert!(sql.contains("\"taskid\" > $4"));
    }

    #[test]
    fn failed_setter_leaves_state_untouched() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "sequences");
        builder.key_string("name", "cam01", None).unwrap();
        assert!(builder.key_string("", "x", None).is_err());
        assert!(builder.key_string("location", "", None).is_err());
        assert!(builder.where_string("seqname", "", "=", None).is_err());
        assert_eq!(builder.params().len(), 1);
        assert_eq!(builder.main.len(), 1);
        assert!(builder.filters.is_empty());
    }

    #[test]
    fn null_sentinels_bind_nothing() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "sequences");
        builder.where_string("notes", "NULL", "=", None).unwrap();
        builder.where_string("owner", "NOT NULL", "=", None).unwrap();
        let sql = builder.select_query();
        assert!(sql.contains("\"notes\" IS NULL"));
        assert!(sql.contains("\"owner\" IS NOT NULL"));
        assert!(builder.params().is_empty());
    }

    #[test]
    fn list_filters_inline_escaped_literals() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "sequences");
        builder
            .where_string_list("seqname", &["cam01", "it's"], "IN", None)
            .unwrap();
        builder.where_int_list("taskid", &[1, 2, 3], "IN", None).unwrap();
        let sql = builder.select_query();
        assert!(sql.contains("\"sequences\".\"seqname\" IN ('cam01','it''s')"));
        assert!(sql.contains("\"sequences\".\"taskid\" IN (1,2,3)"));
        assert!(builder.params().is_empty());

        assert!(builder.where_int_list("taskid", &[], "IN", None).is_err());
    }

    #[test]
    fn time_range_filter_builds_server_side_range() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "intervals");
        let start = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        builder
            .where_time_range("rt_start", "sec_length", start, 3600, "&&", None)
            .unwrap();
        let sql = builder.select_query();
        assert!(
            sql.contains(
                "'[2024-05-01 12:00:00,2024-05-01 13:00:00]' && \
                 public.tsrange(\"intervals\".\"rt_start\",\"intervals\".\"sec_length\")"
            ),
            "{sql}"
        );

        let mut embedded = QueryBuilder::new(Dialect::Sqlite, "vt", "intervals");
        assert!(matches!(
            embedded.where_time_range("rt_start", "sec_length", start, 60, "&&", None),
            Err(crate::error::VidmetaDbError::Unimplemented(_))
        ));
    }

    #[test]
    fn reset_matches_fresh_builder() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "sequences");
        builder.key_string("name", "cam01", None).unwrap();
        builder.where_int("id", 3, "=", None).unwrap();
        builder.set_limit(10);
        builder.reset();

        assert!(builder.main.is_empty());
        assert!(builder.filters.is_empty());
        assert!(builder.params().is_empty());
        builder.key_string("name", "cam02", None).unwrap();
        let sql = builder.insert_query(None).unwrap();
        assert!(sql.contains("VALUES ($1)"), "counter restarts after reset: {sql}");
    }
}
