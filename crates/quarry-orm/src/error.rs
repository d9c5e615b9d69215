//! Error types for statement execution.

use quarry_core::{StatementKind, ValidationError};
use thiserror::Error;

/// Errors raised while executing statements.
#[derive(Debug, Error)]
pub enum OrmError {
    /// The statement failed to build or its row failed validation. Nothing
    /// was sent to the database.
    #[error(transparent)]
    Build(#[from] quarry_core::Error),

    /// Database error from sqlx, as the driver reported it.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error from a driver that is not backed by sqlx.
    #[error("driver error: {0}")]
    Driver(Box<dyn std::error::Error + Send + Sync>),

    /// A nested row cannot be linked because its parent has no key value.
    #[error("'{schema}' row has no '{key}' value to link association '{association}'")]
    MissingParentKey {
        /// Parent schema.
        schema: String,
        /// Association being written.
        association: String,
        /// Parent field the association joins on.
        key: String,
    },

    /// A nested entry under an association name is not a row.
    #[error("association '{0}' expects nested rows")]
    NotNested(String),

    /// A cascaded update matched no row under its key.
    #[error("no '{schema}' row has key {key}")]
    RowNotFound {
        /// Schema being updated.
        schema: String,
        /// Key value, as SQL.
        key: String,
    },

    /// `commit` or `rollback` without an open transaction.
    #[error("no transaction is open")]
    NoTransaction,

    /// A write statement compiled without a changeset.
    #[error("{0:?} statement carries no changeset")]
    NoChangeset(StatementKind),
}

impl From<ValidationError> for OrmError {
    fn from(error: ValidationError) -> Self {
        Self::Build(quarry_core::Error::Validation(error))
    }
}

impl OrmError {
    /// Returns the validation failure, if this is one.
    #[must_use]
    pub const fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Build(quarry_core::Error::Validation(e)) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for execution.
pub type Result<T> = std::result::Result<T, OrmError>;
