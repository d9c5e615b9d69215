//! SQL Dialect support.
//!
//! Different databases quote identifiers and spell placeholders differently.
//! The statement compiler never assumes one convention; it asks the
//! [`Dialect`] it was handed.

mod generic;
mod mysql;
mod postgres;
mod sqlite;

pub use generic::GenericDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::value::SqlValue;

/// How bound parameters are spelled in statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `?` for every parameter.
    Positional,
    /// `$1`, `$2`, ...
    Numbered,
    /// `:p1`, `:p2`, ...
    Named,
}

impl Placeholder {
    /// Renders the placeholder for the parameter at 1-based `index`.
    #[must_use]
    pub fn render(self, index: usize) -> String {
        match self {
            Self::Positional => String::from("?"),
            Self::Numbered => format!("${index}"),
            Self::Named => format!(":p{index}"),
        }
    }
}

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character, or `None` to leave identifiers
    /// bare.
    fn identifier_quote(&self) -> Option<char> {
        Some('"')
    }

    /// Returns the parameter placeholder style.
    fn placeholder(&self) -> Placeholder {
        Placeholder::Positional
    }

    /// Returns whether the dialect supports a RETURNING clause.
    fn supports_returning(&self) -> bool {
        false
    }

    /// Returns whether the dialect has a native `ILIKE` operator.
    fn supports_ilike(&self) -> bool {
        false
    }

    /// Returns the `LIMIT` value meaning "no limit", for dialects that only
    /// accept `OFFSET` after a `LIMIT`.
    fn unbounded_limit(&self) -> Option<&'static str> {
        None
    }

    /// Returns the tail of an `INSERT` that sets no column.
    fn default_values(&self) -> &'static str {
        " DEFAULT VALUES"
    }

    /// Returns whether `||` concatenates strings; otherwise `CONCAT(..)` is
    /// emitted.
    fn concat_operator(&self) -> bool {
        true
    }

    /// Quotes an identifier, doubling any embedded quote character.
    fn quote_identifier(&self, name: &str) -> String {
        match self.identifier_quote() {
            Some(quote) => {
                let escaped = name.replace(quote, &format!("{quote}{quote}"));
                format!("{quote}{escaped}{quote}")
            }
            None => String::from(name),
        }
    }

    /// Renders a value as an inline literal for the debug path.
    fn render_literal(&self, value: &SqlValue) -> String {
        value.to_sql_inline()
    }
}
