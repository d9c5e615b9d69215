//! Generic SQL dialect.

use super::Dialect;

/// A generic dialect: bare identifiers and `?` placeholders.
///
/// Useful for rendering readable SQL in tests and logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl GenericDialect {
    /// Creates a new generic dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn identifier_quote(&self) -> Option<char> {
        None
    }
}
