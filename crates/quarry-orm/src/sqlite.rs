//! SQLite driver on sqlx.

use std::str::FromStr;

use quarry_core::dialect::SqliteDialect;
use quarry_core::{Row, SqlValue};
use serde::Deserialize;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use tracing::debug;

use crate::driver::{Driver, Executed};
use crate::error::Result;

/// Connection settings for [`SqliteDriver`].
///
/// Deserializable so host applications can keep it in their own
/// configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SqliteOptions {
    /// Database URL, e.g. `sqlite://app.db` or `sqlite::memory:`.
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
    /// Create the database file if it does not exist.
    pub create_if_missing: bool,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            url: String::from("sqlite::memory:"),
            max_connections: 1,
            create_if_missing: true,
        }
    }
}

/// A SQLite connection checked out of a sqlx pool.
///
/// The connection is held for the driver's lifetime, so transactions and
/// in-memory databases see one session. It returns to the pool on
/// [`close`](Driver::close) or drop.
#[derive(Debug)]
pub struct SqliteDriver {
    pool: SqlitePool,
    conn: PoolConnection<Sqlite>,
}

impl SqliteDriver {
    /// Opens a pool and checks out one connection.
    pub async fn connect(options: &SqliteOptions) -> Result<Self> {
        let connect = SqliteConnectOptions::from_str(&options.url)?
            .create_if_missing(options.create_if_missing);
        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect)
            .await?;
        debug!(url = %options.url, "Connected to SQLite");
        Self::from_pool(pool).await
    }

    /// Checks a connection out of an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let conn = pool.acquire().await?;
        Ok(Self { pool, conn })
    }

    /// The pool the connection came from.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Binds a [`SqlValue`] parameter to a query.
fn bind_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: SqlValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}

/// Reads a column by the storage class of the value it holds.
fn decode(row: &SqliteRow, index: usize) -> Result<SqlValue> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let storage = raw.type_info().name().to_string();
    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => SqlValue::Int(row.try_get(index)?),
        "REAL" => SqlValue::Float(row.try_get(index)?),
        "BLOB" => SqlValue::Blob(row.try_get(index)?),
        _ => SqlValue::Text(row.try_get(index)?),
    };
    Ok(value)
}

fn to_row(row: &SqliteRow) -> Result<Row> {
    let mut out = Row::new();
    for column in row.columns() {
        out.insert(column.name(), decode(row, column.ordinal())?);
    }
    Ok(out)
}

impl Driver for SqliteDriver {
    type Dialect = SqliteDialect;

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param.clone());
        }
        let rows = query.fetch_all(&mut *self.conn).await?;
        rows.iter().map(to_row).collect()
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<Executed> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param.clone());
        }
        let result = query.execute(&mut *self.conn).await?;
        let rows_affected = result.rows_affected();
        Ok(Executed {
            rows_affected,
            last_insert_id: (rows_affected > 0).then(|| result.last_insert_rowid()),
        })
    }

    async fn begin(&mut self) -> Result<()> {
        sqlx::query("BEGIN").execute(&mut *self.conn).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        sqlx::query("COMMIT").execute(&mut *self.conn).await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        sqlx::query("ROLLBACK").execute(&mut *self.conn).await?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        drop(self.conn);
        self.pool.close().await;
        Ok(())
    }
}
