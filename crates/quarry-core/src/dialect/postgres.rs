//! PostgreSQL dialect implementation.

use super::{Dialect, Placeholder};

/// PostgreSQL dialect: double-quoted identifiers and `$n` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self) -> Placeholder {
        Placeholder::Numbered
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn supports_ilike(&self) -> bool {
        true
    }
}
