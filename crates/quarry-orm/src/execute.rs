//! `query.execute(&mut db)` for every statement kind.

use quarry_core::{Changeset, Delete, Get, Insert, Query, Row, Select, Update};

use crate::database::Database;
use crate::driver::Driver;
use crate::error::Result;

/// A statement that can run against a [`Database`].
#[allow(async_fn_in_trait)]
pub trait Execute<D: Driver> {
    /// What running the statement yields.
    type Output;

    /// Compiles and runs the statement.
    async fn execute(&self, db: &mut Database<D>) -> Result<Self::Output>;
}

impl<D: Driver> Execute<D> for Query<Select> {
    type Output = Vec<Row>;

    async fn execute(&self, db: &mut Database<D>) -> Result<Self::Output> {
        db.fetch(self).await
    }
}

impl<D: Driver> Execute<D> for Query<Get> {
    type Output = Option<Row>;

    async fn execute(&self, db: &mut Database<D>) -> Result<Self::Output> {
        db.fetch_one(self).await
    }
}

impl<D: Driver> Execute<D> for Query<Insert> {
    type Output = Changeset;

    async fn execute(&self, db: &mut Database<D>) -> Result<Self::Output> {
        db.insert(self).await
    }
}

impl<D: Driver> Execute<D> for Query<Update> {
    type Output = Changeset;

    async fn execute(&self, db: &mut Database<D>) -> Result<Self::Output> {
        db.update(self).await
    }
}

impl<D: Driver> Execute<D> for Query<Delete> {
    type Output = u64;

    async fn execute(&self, db: &mut Database<D>) -> Result<Self::Output> {
        db.delete(self).await
    }
}
