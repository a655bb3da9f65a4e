//! INSERT, UPDATE and DELETE rendering.

use crate::error::VidmetaDbError;

use super::QueryBuilder;

impl QueryBuilder {
    /// Render an INSERT. The target is the explicit `table`, else the first
    /// key's source table, else the default table.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` when no keys carry bound
    /// values.
    pub fn insert_query(&self, table: Option<&str>) -> Result<String, VidmetaDbError> {
        let items: Vec<_> = self.main.iter().filter(|i| i.param.is_some()).collect();
        if items.is_empty() {
            return Err(VidmetaDbError::QueryBuildError(
                "INSERT requires at least one key with a bound value".to_string(),
            ));
        }
        let target = table.or(items[0].table.as_deref());
        let columns: Vec<String> = items
            .iter()
            .map(|item| self.dialect().escape_ident(&item.key))
            .collect();
        let placeholders: Vec<String> = items
            .iter()
            .map(|item| format!("${}", item.param.unwrap_or_default()))
            .collect();
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({});",
            self.construct_table(target),
            columns.join(", "),
            placeholders.join(", ")
        ))
    }

    /// Render an UPDATE. Refuses to render without filters so a missing WHERE
    /// can never rewrite a whole table.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` when no keys carry bound
    /// values or no filters are set.
    pub fn update_query(&self, table: Option<&str>) -> Result<String, VidmetaDbError> {
        let items: Vec<_> = self.main.iter().filter(|i| i.param.is_some()).collect();
        if items.is_empty() {
            return Err(VidmetaDbError::QueryBuildError(
                "UPDATE requires at least one key with a bound value".to_string(),
            ));
        }
        let filters = self.where_clause().ok_or_else(|| {
            VidmetaDbError::QueryBuildError("UPDATE without WHERE is refused".to_string())
        })?;
        let target = table.or(items[0].table.as_deref());
        let assignments: Vec<String> = items
            .iter()
            .map(|item| {
                format!(
                    "{} = ${}",
                    self.dialect().escape_ident(&item.key),
                    item.param.unwrap_or_default()
                )
            })
            .collect();
        Ok(format!(
            "UPDATE {} SET {} WHERE {};",
            self.construct_table(target),
            assignments.join(", "),
            filters
        ))
    }

    /// Render a DELETE. Refuses to render without filters.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` when no filters are set.
    pub fn delete_query(&self, table: Option<&str>) -> Result<String, VidmetaDbError> {
        let filters = self.where_clause().ok_or_else(|| {
            VidmetaDbError::QueryBuildError("DELETE without WHERE is refused".to_string())
        })?;
        Ok(format!(
            "DELETE FROM {} WHERE {};",
            self.construct_table(table),
            filters
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::Dialect;
    use crate::types::Value;
    use crate::values::SeqType;

    use super::super::QueryBuilder;

    #[test]
    fn insert_binds_columns_in_order() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "sequences");
        builder.key_string("name", "cam01", None).unwrap();
        builder.key_string("location", "/data/cam01", None).unwrap();
        builder.key_seqtype("seqtyp", SeqType::Video, None).unwrap();
        let sql = builder.insert_query(None).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"vt\".\"sequences\" (\"name\", \"location\", \"seqtyp\") VALUES ($1, $2, $3);"
        );
        assert_eq!(
            builder.params(),
            &[
                Value::Text("cam01".into()),
                Value::Text("/data/cam01".into()),
                Value::SeqType(SeqType::Video),
            ]
        );
    }

    #[test]
    fn insert_without_values_is_refused() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "sequences");
        assert!(builder.insert_query(None).is_err());
        builder.key_from("sequences", "seqname").unwrap();
        assert!(builder.insert_query(None).is_err());
    }

    #[test]
    fn insert_target_falls_back_to_first_key_table() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "sequences");
        builder.key_int("taskid", 9, Some("tasks")).unwrap();
        let sql = builder.insert_query(None).unwrap();
        assert!(sql.starts_with("INSERT INTO \"vt\".\"tasks\""));
    }

    #[test]
    fn update_and_delete_require_where() {
        let mut builder = QueryBuilder::new(Dialect::Postgres, "vt", "sequences");
        builder.key_string("location", "/mnt/a", None).unwrap();
        assert!(builder.update_query(None).is_err());
        assert!(builder.delete_query(None).is_err());

        builder.where_string("seqname", "cam01", "=", None).unwrap();
        assert_eq!(
            builder.update_query(None).unwrap(),
            "UPDATE \"vt\".\"sequences\" SET \"location\" = $1 WHERE \"sequences\".\"seqname\" = $2;"
        );
        assert_eq!(
            builder.delete_query(None).unwrap(),
            "DELETE FROM \"vt\".\"sequences\" WHERE \"sequences\".\"seqname\" = $2;"
        );
    }

    #[test]
    fn sqlite_insert_uses_dollar_placeholders_too() {
        let mut builder = QueryBuilder::new(Dialect::Sqlite, "vt", "sequences");
        builder.key_string("name", "cam01", None).unwrap();
        assert_eq!(
            builder.insert_query(None).unwrap(),
            "INSERT INTO [vt].[sequences] ([name]) VALUES ($1);"
        );
    }
}
