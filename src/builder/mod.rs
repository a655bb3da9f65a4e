//! SQL construction from accumulated key/filter state.
//!
//! A builder is obtained from a session and carries that session's dialect,
//! default schema and default table. Setters append typed column state and
//! push the value into the builder-owned parameter buffer; render methods are
//! pure functions of the accumulated state and never execute anything.
//!
//! The Nth successfully bound value always corresponds to placeholder `$N` in
//! the rendered SQL, regardless of how key and filter calls interleave. The
//! embedded backend's connection rewrites `$N` to `?N` at bind time.

mod admin;
mod dml;
mod select;
mod setters;

use crate::dialect::Dialect;
use crate::error::VidmetaDbError;
use crate::types::Value;

/// Projection / assignment entry. `param` is absent for projection-only
/// entries added via [`QueryBuilder::key_from`].
#[derive(Debug, Clone)]
pub(crate) struct MainItem {
    pub key: String,
    pub table: Option<String>,
    pub param: Option<u32>,
}

/// Filter entry.
#[derive(Debug, Clone)]
pub(crate) enum WhereItem {
    /// `column <op> $N`
    Bind {
        column: String,
        table: Option<String>,
        oper: String,
        param: u32,
    },
    /// `column IS [NOT] NULL`
    Null {
        column: String,
        table: Option<String>,
        not: bool,
    },
    /// `column <op> <literal>` for values some dialects require inlined.
    Inline {
        column: String,
        table: Option<String>,
        oper: String,
        literal: String,
    },
    /// `<expr> <op> <value>`, both sides caller-supplied.
    Expression {
        expr: String,
        oper: String,
        value: String,
    },
}

/// Accumulating SQL builder for one backend dialect.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    dialect: Dialect,
    default_schema: String,
    default_table: String,
    direct_sql: Option<String>,
    pub(crate) main: Vec<MainItem>,
    pub(crate) filters: Vec<WhereItem>,
    next_param: u32,
    params: Vec<Value>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryBuilder {
    pub(crate) fn new(dialect: Dialect, default_schema: &str, default_table: &str) -> Self {
        Self {
            dialect,
            default_schema: default_schema.to_string(),
            default_table: default_table.to_string(),
            direct_sql: None,
            main: Vec::new(),
            filters: Vec::new(),
            next_param: 0,
            params: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Raw-SQL passthrough mode: [`QueryBuilder::generic_query`] returns the
    /// given statement verbatim. Kept separate from the accumulating mode so
    /// an empty builder is never mistaken for intentional direct SQL.
    pub(crate) fn direct(dialect: Dialect, default_schema: &str, sql: &str) -> Self {
        let mut builder = Self::new(dialect, default_schema, "");
        builder.direct_sql = Some(sql.to_string());
        builder
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The parameter buffer, positionally matching the rendered `$N`
    /// placeholders.
    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.direct_sql.is_some()
    }

    /// Restore the builder to the state of a freshly constructed instance,
    /// dropping all key/filter state and the parameter buffer.
    pub fn reset(&mut self) {
        self.direct_sql = None;
        self.main.clear();
        self.filters.clear();
        self.next_param = 0;
        self.params = Vec::new();
        self.group_by.clear();
        self.order_by.clear();
        self.limit = None;
        self.offset = None;
    }

    pub fn set_group_by(&mut self, column: &str) {
        self.group_by.push(column.to_string());
    }

    pub fn set_order_by(&mut self, column: &str) {
        self.order_by.push(column.to_string());
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    #[must_use]
    pub fn begin_query(&self) -> String {
        self.dialect.begin_transaction().to_string()
    }

    #[must_use]
    pub fn commit_query(&self) -> String {
        self.dialect.commit_transaction().to_string()
    }

    #[must_use]
    pub fn rollback_query(&self) -> String {
        self.dialect.rollback_transaction().to_string()
    }

    #[must_use]
    pub fn last_inserted_id_query(&self) -> String {
        self.dialect.last_insert_id().to_string()
    }

    /// Return the passthrough statement of a direct builder.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::QueryBuildError` on an accumulating builder.
    pub fn generic_query(&self) -> Result<String, VidmetaDbError> {
        self.direct_sql.clone().ok_or_else(|| {
            VidmetaDbError::QueryBuildError(
                "generic_query is only valid on a direct builder".to_string(),
            )
        })
    }

    /// Bind a value, returning its 1-based placeholder number.
    pub(crate) fn bind(&mut self, value: Value) -> u32 {
        self.params.push(value);
        self.next_param += 1;
        self.next_param
    }

    /// Qualify a table reference: `a.b` is used as given, a bare name gets
    /// the default schema, and `None` means the default table.
    pub(crate) fn construct_table(&self, table: Option<&str>) -> String {
        let table = match table {
            Some(t) if !t.is_empty() => t,
            _ => self.default_table.as_str(),
        };
        match table.split_once('.') {
            Some((schema, name)) => format!(
                "{}.{}",
                self.dialect.escape_ident(schema),
                self.dialect.escape_ident(name)
            ),
            None => format!(
                "{}.{}",
                self.dialect.escape_ident(&self.default_schema),
                self.dialect.escape_ident(table)
            ),
        }
    }

    /// Qualify a projection or filter column with its source table name.
    /// A dotted column overrides the entry's table.
    pub(crate) fn construct_column(&self, column: &str, table: Option<&str>) -> String {
        let (table, column) = match column.split_once('.') {
            Some((t, c)) => (t, c),
            None => (
                match table {
                    Some(t) if !t.is_empty() => table_name(t),
                    _ => table_name(&self.default_table),
                },
                column,
            ),
        };
        if column == "*" {
            format!("{}.*", self.dialect.escape_ident(table))
        } else {
            format!(
                "{}.{}",
                self.dialect.escape_ident(table),
                self.dialect.escape_ident(column)
            )
        }
    }

    /// Tables referenced by the main list, deduplicated in first-use order.
    pub(crate) fn source_tables(&self) -> Vec<String> {
        let mut tables = Vec::new();
        for item in &self.main {
            let qualified = self.construct_table(item.table.as_deref());
            if !tables.contains(&qualified) {
                tables.push(qualified);
            }
        }
        if tables.is_empty() {
            tables.push(self.construct_table(None));
        }
        tables
    }

    /// Render the WHERE clause body, or `None` when no filters are set.
    pub(crate) fn where_clause(&self) -> Option<String> {
        if self.filters.is_empty() {
            return None;
        }
        let rendered: Vec<String> = self
            .filters
            .iter()
            .map(|item| match item {
                WhereItem::Bind {
                    column,
                    table,
                    oper,
                    param,
                } => format!(
                    "{} {} ${}",
                    self.construct_column(column, table.as_deref()),
                    oper,
                    param
                ),
                WhereItem::Null { column, table, not } => format!(
                    "{} IS {}NULL",
                    self.construct_column(column, table.as_deref()),
                    if *not { "NOT " } else { "" }
                ),
                WhereItem::Inline {
                    column,
                    table,
                    oper,
                    literal,
                } => format!(
                    "{} {} {}",
                    self.construct_column(column, table.as_deref()),
                    oper,
                    literal
                ),
                WhereItem::Expression { expr, oper, value } => {
                    format!("{expr} {oper} {value}")
                }
            })
            .collect();
        Some(rendered.join(" AND "))
    }

    pub(crate) fn tail_clauses(&self) -> String {
        let mut out = String::new();
        if !self.group_by.is_empty() {
            let cols: Vec<String> = self
                .group_by
                .iter()
                .map(|c| self.construct_column(c, None))
                .collect();
            out.push_str(" GROUP BY ");
            out.push_str(&cols.join(", "));
        }
        if !self.order_by.is_empty() {
            let cols: Vec<String> = self
                .order_by
                .iter()
                .map(|c| self.construct_column(c, None))
                .collect();
            out.push_str(" ORDER BY ");
            out.push_str(&cols.join(", "));
        }
        if let Some(limit) = self.limit {
            use std::fmt::Write;
            let _ = write!(out, " LIMIT {limit}");
        }
        if let Some(offset) = self.offset {
            use std::fmt::Write;
            let _ = write!(out, " OFFSET {offset}");
        }
        out
    }

    pub(crate) fn dialect_escape_literal(&self, text: &str) -> String {
        self.dialect.escape_literal(text)
    }
}

/// Bare table name of a possibly schema-qualified reference, used to qualify
/// columns.
fn table_name(table: &str) -> &str {
    match table.split_once('.') {
        Some((_, name)) => name,
        None => table,
    }
}
