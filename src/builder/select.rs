//! SELECT and COUNT rendering.

use super::QueryBuilder;

impl QueryBuilder {
    /// Render a SELECT from the accumulated state. With an empty main list
    /// this selects every column of the default table.
    #[must_use]
    pub fn select_query(&self) -> String {
        let columns = if self.main.is_empty() {
            "*".to_string()
        } else {
            let cols: Vec<String> = self
                .main
                .iter()
                .map(|item| self.construct_column(&item.key, item.table.as_deref()))
                .collect();
            cols.join(", ")
        };
        let tables = self.source_tables().join(", ");
        let mut sql = format!("SELECT {columns} FROM {tables}");
        if let Some(filters) = self.where_clause() {
            sql.push_str(" WHERE ");
            sql.push_str(&filters);
        }
        sql.push_str(&self.tail_clauses());
        sql.push(';');
        sql
    }

    /// Render a `COUNT(*)` over the same FROM/WHERE as [`select_query`].
    ///
    /// [`select_query`]: QueryBuilder::select_query
    #[must_use]
    pub fn count_query(&self) -> String {
        let tables = self.source_tables().join(", ");
        let mut sql = format!("SELECT COUNT(*) AS count FROM {tables}");
        if let Some(filters) = self.where_clause() {
            sql.push_str(" WHERE ");
            sql.push_str(&filters);
        }
        sql.push(';');
        sql
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::Dialect;
    use crate::types::Value;
    use crate::values::{BoundingBox, Point, SeqType};

    use super::super::QueryBuilder;

    #[test]
    fn select_with_two_filters_combines_with_and() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "sequences");
        builder.where_string("seqname", "cam01", "=", None).unwrap();
        builder
            .where_seqtype("seqtyp", SeqType::Video, "=", None)
            .unwrap();
        let sql = builder.select_query();
        assert_eq!(
            sql,
            "SELECT * FROM \"vt\".\"sequences\" WHERE \"sequences\".\"seqname\" = $1 AND \"sequences\".\"seqtyp\" = $2;"
        );
        assert_eq!(
            builder.params(),
            &[
                Value::Text("cam01".into()),
                Value::SeqType(SeqType::Video),
            ]
        );
    }

    #[test]
    fn projection_qualifies_and_dedupes_tables() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "intervals");
        builder.key_from("intervals", "seqname").unwrap();
        builder.key_from("intervals", "t1").unwrap();
        builder.key_from("sequences", "seqlocation").unwrap();
        let sql = builder.select_query();
        assert_eq!(
            sql,
            "SELECT \"intervals\".\"seqname\", \"intervals\".\"t1\", \"sequences\".\"seqlocation\" \
             FROM \"vt\".\"intervals\", \"vt\".\"sequences\";"
        );
    }

    #[test]
    fn tail_clauses_render_only_when_set() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "intervals");
        assert!(!builder.select_query().contains("LIMIT"));
        builder.set_order_by("t1");
        builder.set_limit(100);
        builder.set_offset(20);
        let sql = builder.select_query();
        assert!(sql.ends_with("ORDER BY \"intervals\".\"t1\" LIMIT 100 OFFSET 20;"));
    }

    #[test]
    fn region_filter_inlines_box_literal() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "intervals");
        let region = BoundingBox::new(Point::new(100.0, 80.0), Point::new(10.0, 20.0));
        builder.where_region("rt_box", &region, "&&", None).unwrap();
        let sql = builder.select_query();
        assert!(
            sql.contains("\"intervals\".\"rt_box\" && '((100,80),(10,20))'::box"),
            "{sql}"
        );
        assert!(builder.params().is_empty());
    }

    #[test]
    fn sqlite_dialect_brackets_identifiers() {
        let mut builder = QueryBuilder::new(Dialect::Sqlite, "vt", "sequences");
        builder.where_string("seqname", "cam01", "=", None).unwrap();
        assert_eq!(
            builder.select_query(),
            "SELECT * FROM [vt].[sequences] WHERE [sequences].[seqname] = $1;"
        );
    }

    #[test]
    fn count_query_shares_filters() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "sequences");
        builder.where_string("seqname", "cam01", "=", None).unwrap();
        assert_eq!(
            builder.count_query(),
            "SELECT COUNT(*) AS count FROM \"vt\".\"sequences\" WHERE \"sequences\".\"seqname\" = $1;"
        );
    }

    #[test]
    fn direct_builder_passes_through_verbatim() {
        let builder = QueryBuilder::direct(Dialect::Postgres, "vt", "SELECT version();");
        assert_eq!(builder.generic_query().unwrap(), "SELECT version();");
        let accumulating = QueryBuilder::new(Dialect::Postgres, "vt", "sequences");
        assert!(accumulating.generic_query().is_err());
    }
}
