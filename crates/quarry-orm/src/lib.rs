//! # quarry-orm
//!
//! Runs statements built with `quarry-core` against a database.
//!
//! This crate provides:
//! - The [`Driver`] contract and a sqlx-backed [`SqliteDriver`]
//! - [`Database`], which compiles, executes and hydrates, and tracks
//!   transaction depth with savepoints
//! - Cascading writes of nested rows in one transaction
//! - [`Execute`] so any statement can run with `query.execute(&mut db)`
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use quarry_core::{Field, FieldType, Filter, Query, Registry, Row, Schema};
//! use quarry_orm::{Database, Execute, SqliteDriver, SqliteOptions};
//!
//! async fn example() -> quarry_orm::Result<()> {
//!     let mut registry = Registry::new();
//!     let users = registry.register(
//!         Schema::builder("users")
//!             .field(Field::new("id", FieldType::Int).primary_key())
//!             .field(Field::new("name", FieldType::Text))
//!             .build()?,
//!     )?;
//!
//!     let driver = SqliteDriver::connect(&SqliteOptions::default()).await?;
//!     let mut db = Database::new(driver).with_registry(registry);
//!     db.execute_raw("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", &[])
//!         .await?;
//!
//!     let saved = Query::new([&users])
//!         .insert(Row::new().set("name", "Ann"))
//!         .execute(&mut db)
//!         .await?;
//!     assert!(saved.row().contains("id"));
//!
//!     let ann = Query::new([&users])
//!         .get_all()
//!         .where_(Filter::new().with("name", "Ann"))
//!         .execute(&mut db)
//!         .await?;
//!     assert!(ann.is_some());
//!     Ok(())
//! }
//! ```

mod cascade;
pub mod database;
pub mod driver;
pub mod error;
pub mod execute;
pub mod sqlite;

pub use database::Database;
pub use driver::{Driver, Executed};
pub use error::{OrmError, Result};
pub use execute::Execute;
pub use sqlite::{SqliteDriver, SqliteOptions};
