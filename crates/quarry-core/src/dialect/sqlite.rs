//! SQLite dialect.

use super::Dialect;

/// SQLite: `"` quoting, `?` placeholders, `RETURNING`, `LIMIT -1` for an
/// unbounded limit. No `ILIKE`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn identifier_quote(&self) -> Option<char> {
        Some('"')
    }

    fn supports_returning(&self) -> bool {
        // 3.35+
        true
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        Some("-1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_dialect() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.name(), "sqlite");
        assert_eq!(dialect.quote_identifier("users"), "\"users\"");
        assert!(dialect.supports_returning());
        assert!(!dialect.supports_ilike());
        assert_eq!(dialect.unbounded_limit(), Some("-1"));
        assert_eq!(dialect.default_values(), " DEFAULT VALUES");
    }
}
