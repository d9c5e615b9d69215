//! Statement execution against a driver.

use std::sync::Arc;

use quarry_core::{
    Changeset, Compiled, Context, Delete, Extensions, Get, Insert, Query, Registry, Row, Schema,
    Select, SqlValue, Statement, Update,
};
use tracing::{debug, warn};

use crate::driver::{Driver, Executed};
use crate::error::{OrmError, Result};

/// A driver plus the context statements compile under.
///
/// Owns no statement state between calls. Every read and write is a fresh
/// round trip; nothing is cached.
#[derive(Debug)]
pub struct Database<D> {
    ctx: Context,
    driver: D,
    depth: usize,
}

impl<D: Driver> Database<D> {
    /// Wraps a driver, compiling for its dialect with an empty registry.
    #[must_use]
    pub fn new(driver: D) -> Self {
        Self {
            ctx: Context::new(D::Dialect::default()),
            driver,
            depth: 0,
        }
    }

    /// Sets the registry that deferred associations resolve against.
    #[must_use]
    pub fn with_registry(mut self, registry: impl Into<Arc<Registry>>) -> Self {
        self.ctx = self.ctx.with_registry(registry);
        self
    }

    /// Sets the extension templates available to statements.
    #[must_use]
    pub fn with_extensions(mut self, extensions: impl Into<Arc<Extensions>>) -> Self {
        self.ctx = self.ctx.with_extensions(extensions);
        self
    }

    /// The compile context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }

    /// The underlying driver.
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// The underlying driver, mutably.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Open transaction levels; `0` outside a transaction.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Compiles a statement for this database's dialect.
    pub fn compile(&self, statement: &impl Statement) -> Result<Compiled> {
        let compiled = statement.compile(&self.ctx)?;
        debug!(
            sql = %compiled.sql(),
            params = compiled.params().len(),
            "Compiled statement"
        );
        Ok(compiled)
    }

    /// Renders a statement with its parameters inlined, for inspection.
    ///
    /// The result is never meant to be executed.
    pub fn print(&self, statement: &impl Statement) -> Result<String> {
        Ok(statement.compile(&self.ctx)?.debug_sql().to_string())
    }

    /// Runs a select and returns its rows, hydrated when it preloads.
    pub async fn fetch(&mut self, query: &Query<Select>) -> Result<Vec<Row>> {
        let compiled = self.compile(query)?;
        let rows = self.driver.query(compiled.sql(), compiled.params()).await?;
        Ok(compiled.shape(rows))
    }

    /// Runs a get and returns the row, if any.
    pub async fn fetch_one(&mut self, query: &Query<Get>) -> Result<Option<Row>> {
        let compiled = self.compile(query)?;
        let rows = self.driver.query(compiled.sql(), compiled.params()).await?;
        Ok(compiled.shape(rows).into_iter().next())
    }

    /// Inserts a row and returns its changeset. When the schema declares a
    /// primary key, the generated key is added to the changeset.
    pub async fn insert(&mut self, query: &Query<Insert>) -> Result<Changeset> {
        let compiled = self.compile(query)?;
        let mut changeset = compiled
            .changeset()
            .cloned()
            .ok_or(OrmError::NoChangeset(compiled.kind()))?;

        let generated = if let Some(key) = compiled.returning() {
            let rows = self.driver.query(compiled.sql(), compiled.params()).await?;
            rows.first().and_then(|row| row.get(key)).cloned()
        } else {
            let done = self.driver.execute(compiled.sql(), compiled.params()).await?;
            match compiled.primary_key() {
                Some(pk) if !changeset.row().has_value(pk) => {
                    done.last_insert_id.map(SqlValue::Int)
                }
                _ => None,
            }
        };

        if let (Some(pk), Some(value)) = (compiled.primary_key(), generated) {
            changeset.assign(pk, value);
        }
        Ok(changeset)
    }

    /// Runs an update and returns its changeset.
    pub async fn update(&mut self, query: &Query<Update>) -> Result<Changeset> {
        self.update_counted(query).await.map(|(changeset, _)| changeset)
    }

    /// Runs an update and returns its changeset with the affected row count.
    pub(crate) async fn update_counted(
        &mut self,
        query: &Query<Update>,
    ) -> Result<(Changeset, u64)> {
        let compiled = self.compile(query)?;
        let done = self.driver.execute(compiled.sql(), compiled.params()).await?;
        debug!(rows = done.rows_affected, "Updated rows");
        let changeset = compiled
            .changeset()
            .cloned()
            .ok_or(OrmError::NoChangeset(compiled.kind()))?;
        Ok((changeset, done.rows_affected))
    }

    /// Updates each row by its primary key, all or nothing.
    pub async fn update_many(
        &mut self,
        schema: &Arc<Schema>,
        rows: Vec<Row>,
    ) -> Result<Vec<Changeset>> {
        self.begin().await?;
        let mut changesets = Vec::with_capacity(rows.len());
        for row in rows {
            match self.update(&Query::new([schema]).update(row)).await {
                Ok(changeset) => changesets.push(changeset),
                Err(e) => return self.abort(e).await,
            }
        }
        self.commit().await?;
        Ok(changesets)
    }

    /// Runs a delete and returns the number of rows removed.
    pub async fn delete(&mut self, query: &Query<Delete>) -> Result<u64> {
        let compiled = self.compile(query)?;
        let done = self.driver.execute(compiled.sql(), compiled.params()).await?;
        Ok(done.rows_affected)
    }

    /// Runs SQL as given. Values still travel as parameters.
    pub async fn execute_raw(&mut self, sql: &str, params: &[SqlValue]) -> Result<Executed> {
        debug!(sql = %sql, params = params.len(), "Executing raw SQL");
        self.driver.execute(sql, params).await
    }

    /// Runs a raw query as given.
    pub async fn query_raw(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        debug!(sql = %sql, params = params.len(), "Querying raw SQL");
        self.driver.query(sql, params).await
    }

    /// Opens a transaction, or a savepoint inside an open one.
    pub async fn begin(&mut self) -> Result<()> {
        if self.depth == 0 {
            self.driver.begin().await?;
        } else {
            let sql = format!("SAVEPOINT {}", savepoint(self.depth));
            self.driver.execute(&sql, &[]).await?;
        }
        self.depth += 1;
        debug!(depth = self.depth, "Transaction opened");
        Ok(())
    }

    /// Commits the innermost transaction level.
    pub async fn commit(&mut self) -> Result<()> {
        match self.depth {
            0 => return Err(OrmError::NoTransaction),
            1 => self.driver.commit().await?,
            n => {
                let sql = format!("RELEASE SAVEPOINT {}", savepoint(n - 1));
                self.driver.execute(&sql, &[]).await?;
            }
        }
        self.depth -= 1;
        debug!(depth = self.depth, "Transaction committed");
        Ok(())
    }

    /// Rolls the innermost transaction level back.
    pub async fn rollback(&mut self) -> Result<()> {
        let level = self.depth;
        if level == 0 {
            return Err(OrmError::NoTransaction);
        }
        // The level is closed even if the driver fails to roll it back.
        self.depth -= 1;
        if level == 1 {
            self.driver.rollback().await?;
        } else {
            let name = savepoint(level - 1);
            self.driver
                .execute(&format!("ROLLBACK TO SAVEPOINT {name}"), &[])
                .await?;
            self.driver
                .execute(&format!("RELEASE SAVEPOINT {name}"), &[])
                .await?;
        }
        warn!(depth = level, "Transaction rolled back");
        Ok(())
    }

    /// Rolls back the innermost level and returns `error`. A rollback
    /// failure is logged; the original error wins.
    pub(crate) async fn abort<T>(&mut self, error: OrmError) -> Result<T> {
        if let Err(rollback) = self.rollback().await {
            warn!(error = %rollback, "Rollback failed");
        }
        Err(error)
    }

    /// Closes the driver.
    pub async fn close(self) -> Result<()> {
        if self.depth > 0 {
            warn!(depth = self.depth, "Closing with an open transaction");
        }
        self.driver.close().await
    }
}

fn savepoint(level: usize) -> String {
    format!("quarry_sp_{level}")
}
