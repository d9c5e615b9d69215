//! The database driver contract.

use quarry_core::dialect::Dialect;
use quarry_core::{Row, SqlValue};

use crate::error::Result;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Executed {
    /// Rows inserted, updated or deleted.
    pub rows_affected: u64,
    /// Key generated by the last insert, when the backend reports one.
    pub last_insert_id: Option<i64>,
}

/// A connection to one database.
///
/// Drivers run SQL exactly as given and surface backend errors unmodified.
/// Statement building, validation and hydration happen above this layer.
#[allow(async_fn_in_trait)]
pub trait Driver {
    /// The dialect statements for this backend compile to.
    type Dialect: Dialect + Default + 'static;

    /// Runs a statement and returns its rows, keyed by result column label.
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Runs a statement that returns no rows.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<Executed>;

    /// Opens a transaction.
    async fn begin(&mut self) -> Result<()>;

    /// Commits the open transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Rolls the open transaction back.
    async fn rollback(&mut self) -> Result<()>;

    /// Releases the connection.
    async fn close(self) -> Result<()>;
}
