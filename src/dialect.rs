//! Differences between the two SQL dialects the builder can render.

/// SQL dialect of a query builder. Builders obtained from a session always
/// carry the session's dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Quote one identifier part (never a dotted path).
    #[must_use]
    pub fn escape_ident(self, ident: &str) -> String {
        match self {
            Dialect::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
            Dialect::Sqlite => format!("[{ident}]"),
        }
    }

    /// Quote a string literal, doubling embedded quotes.
    #[must_use]
    pub fn escape_literal(self, text: &str) -> String {
        format!("'{}'", text.replace('\'', "''"))
    }

    #[must_use]
    pub fn begin_transaction(self) -> &'static str {
        match self {
            Dialect::Postgres => "BEGIN;",
            Dialect::Sqlite => "BEGIN TRANSACTION;",
        }
    }

    #[must_use]
    pub fn commit_transaction(self) -> &'static str {
        match self {
            Dialect::Postgres => "COMMIT;",
            Dialect::Sqlite => "COMMIT TRANSACTION;",
        }
    }

    #[must_use]
    pub fn rollback_transaction(self) -> &'static str {
        match self {
            Dialect::Postgres => "ROLLBACK;",
            Dialect::Sqlite => "ROLLBACK TRANSACTION;",
        }
    }

    /// Statement returning the id generated by the last insert on this
    /// connection.
    #[must_use]
    pub fn last_insert_id(self) -> &'static str {
        match self {
            Dialect::Postgres => "SELECT lastval();",
            Dialect::Sqlite => "SELECT last_insert_rowid();",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_quoting_per_dialect() {
        assert_eq!(Dialect::Postgres.escape_ident("seqname"), "\"seqname\"");
        assert_eq!(Dialect::Sqlite.escape_ident("seqname"), "[seqname]");
        assert_eq!(Dialect::Postgres.escape_ident("od\"d"), "\"od\"\"d\"");
    }

    #[test]
    fn literal_quoting_doubles_quotes() {
        assert_eq!(Dialect::Postgres.escape_literal("it's"), "'it''s'");
        assert_eq!(Dialect::Sqlite.escape_literal("plain"), "'plain'");
    }

    #[test]
    fn transaction_statements_differ() {
        assert_eq!(Dialect::Postgres.begin_transaction(), "BEGIN;");
        assert_eq!(Dialect::Sqlite.begin_transaction(), "BEGIN TRANSACTION;");
        assert_eq!(Dialect::Sqlite.last_insert_id(), "SELECT last_insert_rowid();");
    }
}
