//! # quarry-core
//!
//! A schema-driven SQL statement compiler with a changeset pipeline and
//! association hydration.
//!
//! This crate provides:
//! - Declarative [`Schema`] metadata: fields, casts, defaults, keys and
//!   has-one / has-many associations
//! - An expression algebra ([`Expr`], [`op`](expr::op), [`func`](expr::func))
//!   that callers can extend with raw-SQL templates
//! - A typestate [`Query`] builder for select, get, insert, update and delete
//! - Preload planning and hydration of joined rows into nested [`Row`]s
//!
//! The crate performs no I/O. Statements compile against an explicit
//! [`Context`] into SQL with placeholders plus the parameters to bind.
//!
//! ## Building a statement
//!
//! ```rust
//! use std::sync::Arc;
//! use quarry_core::prelude::*;
//! use quarry_core::{Context, Field, FieldType, Filter, Query, Schema, Statement};
//! use quarry_core::dialect::SqliteDialect;
//!
//! let users = Arc::new(
//!     Schema::builder("users")
//!         .field(Field::new("id", FieldType::Int).primary_key())
//!         .field(Field::new("name", FieldType::Text))
//!         .build()?,
//! );
//! let ctx = Context::new(SqliteDialect::new());
//!
//! let compiled = Query::new([&users])
//!     .select([users.col("name")?])
//!     .where_(Filter::new().with("id", 1))
//!     .where_(users.col("name")?.like("A%"))
//!     .compile(&ctx)?;
//!
//! assert_eq!(
//!     compiled.sql(),
//!     r#"SELECT "users"."name" FROM "users" WHERE "users"."id" = ? AND "users"."name" LIKE ?"#
//! );
//! assert_eq!(compiled.params().len(), 2);
//! # Ok::<(), quarry_core::Error>(())
//! ```
//!
//! ## Injection safety
//!
//! Every literal becomes a bound parameter. Only
//! [`Compiled::debug_sql`] inlines values, and it exists for logs.

pub mod builder;
pub mod changeset;
pub mod context;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod preload;
pub mod row;
pub mod schema;
pub mod value;
mod writer;

pub use builder::{
    Cmp, Compiled, Delete, Filter, FilterKey, Get, Insert, JoinKind, Order, Predicate, Query,
    Select, Statement, StatementKind, Unset, Update, Window,
};
pub use changeset::{Action, Changeset};
pub use context::Context;
pub use error::{Error, Result, Stage, ValidationError};
pub use expr::{Expr, Extensions, IntoExpr, Template};
pub use preload::Preload;
pub use row::{Entry, Row};
pub use schema::{
    AssociationKind, Col, Field, FieldDefault, FieldType, Registry, Schema, SchemaBuilder, Target,
};
pub use value::{SqlValue, ToSqlValue};

/// Expression helpers in one import.
pub mod prelude {
    pub use crate::expr::{ExprExt, IntoExpr, func, op};
}
