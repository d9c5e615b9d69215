//! MySQL dialect implementation.

use super::Dialect;
use crate::value::SqlValue;

/// MySQL dialect: backtick identifiers and `?` placeholders.
///
/// MySQL treats `"` as a string delimiter unless `ANSI_QUOTES` is set, so
/// double-quoted identifiers are never emitted here.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn identifier_quote(&self) -> Option<char> {
        Some('`')
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        Some("18446744073709551615")
    }

    fn default_values(&self) -> &'static str {
        " () VALUES ()"
    }

    fn concat_operator(&self) -> bool {
        false // `||` is logical OR unless PIPES_AS_CONCAT is set
    }

    fn render_literal(&self, value: &SqlValue) -> String {
        match value {
            // Backslash is an escape character inside MySQL string literals.
            SqlValue::Text(s) => {
                let escaped = s.replace('\\', "\\\\").replace('\'', "''");
                format!("'{escaped}'")
            }
            other => other.to_sql_inline(),
        }
    }
}
