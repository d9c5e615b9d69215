//! Error types for statement building and changeset validation.

use std::fmt;

use thiserror::Error;

/// The changeset stage that rejected a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// A non-nullable field without a default was missing or null.
    Required,
    /// A field's caster rejected the value.
    Cast,
    /// The schema's validation hook rejected the row.
    Hook,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Cast => write!(f, "cast"),
            Self::Hook => write!(f, "hook"),
        }
    }
}

/// A row failed the changeset pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{schema}{}: {stage} failed: {message}", .field.as_ref().map(|f| format!(".{f}")).unwrap_or_default())]
pub struct ValidationError {
    /// Schema name.
    pub schema: String,
    /// Offending field, when the failure is attributable to one.
    pub field: Option<String>,
    /// Pipeline stage.
    pub stage: Stage,
    /// Human-readable reason.
    pub message: String,
}

/// Errors raised before any SQL reaches a driver.
#[derive(Debug, Error)]
pub enum Error {
    /// A statement needs at least one schema.
    #[error("a query needs at least one schema")]
    NoSchema,

    /// A fetch would read every field of a schema that forbids it.
    #[error("schema '{0}' does not allow wildcard select; name the fields to fetch")]
    WildcardSelect(String),

    /// A field name that the schema does not declare.
    #[error("schema '{schema}' has no field '{field}'")]
    UnknownField {
        /// Schema name.
        schema: String,
        /// Requested field.
        field: String,
    },

    /// An association name that the schema does not declare.
    #[error("schema '{schema}' has no association '{association}'")]
    UnknownAssociation {
        /// Schema name.
        schema: String,
        /// Requested association.
        association: String,
    },

    /// A deferred association target that is not in the registry.
    #[error("association '{schema}.{association}' targets unknown schema '{target}'")]
    UnresolvedAssociation {
        /// Declaring schema.
        schema: String,
        /// Association name.
        association: String,
        /// Deferred target name.
        target: String,
    },

    /// Two schemas registered under one name.
    #[error("schema '{0}' is already registered")]
    DuplicateSchema(String),

    /// Two fields of one schema map to the same column or name.
    #[error("schema '{schema}' declares '{column}' twice")]
    DuplicateColumn {
        /// Schema name.
        schema: String,
        /// Repeated column.
        column: String,
    },

    /// More than one field of a schema is flagged as primary key.
    #[error("schema '{0}' declares more than one primary key")]
    MultiplePrimaryKeys(String),

    /// An update whose changeset has no column left to set.
    #[error("update of '{0}' has no column to set")]
    NothingToUpdate(String),

    /// A join names a schema that was not handed to the query.
    #[error("schema '{0}' was not added to the query")]
    JoinTarget(String),

    /// A predicate that cannot be rendered.
    #[error("malformed predicate: {0}")]
    MalformedPredicate(String),

    /// An update or delete with nothing to bound it.
    #[error("{0} requires a predicate or a primary key value")]
    MissingPredicate(&'static str),

    /// An extension call that names no registered template.
    #[error("no extension registered as '{0}'")]
    UnknownExtension(String),

    /// A template referenced an argument that was not supplied.
    #[error("extension '{name}' expects argument {{{index}}}, got {given} arguments")]
    ExtensionArity {
        /// Extension name.
        name: String,
        /// Missing argument index.
        index: usize,
        /// Arguments actually supplied.
        given: usize,
    },

    /// The changeset pipeline rejected a row.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Result type alias for building and validation.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError {
            schema: String::from("users"),
            field: Some(String::from("name")),
            stage: Stage::Required,
            message: String::from("cannot be null"),
        };
        assert_eq!(err.to_string(), "users.name: required failed: cannot be null");

        let err = ValidationError {
            field: None,
            stage: Stage::Hook,
            ..err
        };
        assert_eq!(err.to_string(), "users: hook failed: cannot be null");
    }
}
