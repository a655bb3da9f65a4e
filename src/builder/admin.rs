//! Fixed schema-lifecycle statements.
//!
//! The client/server backend manages datasets, methods and tasks through
//! stored procedures; these renderers produce the invoking statements with
//! every argument inlined as an escaped literal. The embedded backend has no
//! stored procedures, so each renderer fails there instead of returning an
//! empty statement.

use crate::dialect::Dialect;
use crate::error::VidmetaDbError;

use super::QueryBuilder;

impl QueryBuilder {
    fn admin_call(&self, call: String) -> Result<String, VidmetaDbError> {
        match self.dialect() {
            Dialect::Postgres => Ok(call),
            Dialect::Sqlite => Err(VidmetaDbError::Unimplemented(
                "schema-lifecycle statements are not available on the embedded backend"
                    .to_string(),
            )),
        }
    }

    fn literal(&self, text: &str) -> String {
        self.dialect_escape_literal(text)
    }

    fn optional_literal(&self, text: Option<&str>) -> String {
        match text {
            Some(t) => self.literal(t),
            None => "NULL".to_string(),
        }
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::Unimplemented` on the embedded backend.
    pub fn dataset_create_query(
        &self,
        name: &str,
        location: &str,
        friendly_name: &str,
        description: &str,
    ) -> Result<String, VidmetaDbError> {
        self.admin_call(format!(
            "SELECT public.VT_dataset_create({}, {}, {}, {});",
            self.literal(name),
            self.literal(location),
            self.literal(friendly_name),
            self.literal(description)
        ))
    }

    /// Truncate all data of a dataset, keeping its definition.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::Unimplemented` on the embedded backend.
    pub fn dataset_reset_query(&self, name: &str) -> Result<String, VidmetaDbError> {
        self.admin_call(format!(
            "SELECT public.VT_dataset_truncate({});",
            self.literal(name)
        ))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::Unimplemented` on the embedded backend.
    pub fn dataset_delete_query(&self, name: &str) -> Result<String, VidmetaDbError> {
        self.admin_call(format!(
            "SELECT public.VT_dataset_drop({});",
            self.literal(name)
        ))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::Unimplemented` on the embedded backend.
    pub fn method_create_query(
        &self,
        name: &str,
        description: &str,
    ) -> Result<String, VidmetaDbError> {
        self.admin_call(format!(
            "SELECT public.VT_method_add({}, {});",
            self.literal(name),
            self.literal(description)
        ))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::Unimplemented` on the embedded backend.
    pub fn method_delete_query(&self, name: &str) -> Result<String, VidmetaDbError> {
        self.admin_call(format!(
            "SELECT public.VT_method_delete({}, TRUE);",
            self.literal(name)
        ))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::Unimplemented` on the embedded backend.
    pub fn task_create_query(
        &self,
        name: &str,
        dataset: &str,
        method: &str,
        params: &str,
        prereq_task: Option<&str>,
        outputs: Option<&str>,
    ) -> Result<String, VidmetaDbError> {
        self.admin_call(format!(
            "SELECT public.VT_task_create({}, {}, {}, {}, {}, {});",
            self.literal(name),
            self.literal(method),
            self.literal(params),
            self.optional_literal(prereq_task),
            self.optional_literal(outputs),
            self.literal(dataset)
        ))
    }

    /// # Errors
    ///
    /// Returns `VidmetaDbError::Unimplemented` on the embedded backend.
    pub fn task_delete_query(
        &self,
        name: &str,
        dataset: &str,
    ) -> Result<String, VidmetaDbError> {
        self.admin_call(format!(
            "SELECT public.VT_task_delete({}, TRUE, {});",
            self.literal(name),
            self.literal(dataset)
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::Dialect;
    use crate::error::VidmetaDbError;

    use super::super::QueryBuilder;

    #[test]
    fn dataset_lifecycle_renders_procedure_calls() {
        let builder = QueryBuilder::new(Dialect::Postgres, "vt", "");
        assert_eq!(
            builder
                .dataset_create_query("traffic", "/data/traffic", "Traffic", "demo set")
                .unwrap(),
            "SELECT public.VT_dataset_create('traffic', '/data/traffic', 'Traffic', 'demo set');"
        );
        assert_eq!(
            builder.dataset_reset_query("traffic").unwrap(),
            "SELECT public.VT_dataset_truncate('traffic');"
        );
        assert_eq!(
            builder.dataset_delete_query("it's").unwrap(),
            "SELECT public.VT_dataset_drop('it''s');"
        );
    }

    #[test]
    fn task_create_renders_optional_arguments_as_null() {
        let builder = QueryBuilder::new(Dialect::Postgres, "vt", "");
        assert_eq!(
            builder
                .task_create_query("detect1", "traffic", "detector", "{}", None, None)
                .unwrap(),
            "SELECT public.VT_task_create('detect1', 'detector', '{}', NULL, NULL, 'traffic');"
        );
    }

    #[test]
    fn embedded_backend_refuses_lifecycle_statements() {
        let builder = QueryBuilder::new(Dialect::Sqlite, "vt", "");
        assert!(matches!(
            builder.dataset_create_query("a", "b", "c", "d"),
            Err(VidmetaDbError::Unimplemented(_))
        ));
        assert!(matches!(
            builder.task_delete_query("t", "ds"),
            Err(VidmetaDbError::Unimplemented(_))
        ));
    }
}
