#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use quarry_core::dialect::GenericDialect;
use quarry_core::{Field, FieldDefault, FieldType, Registry, Row, Schema, SqlValue};
use quarry_orm::{Database, Driver, Executed, OrmError, Result, SqliteDriver, SqliteOptions};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

// ===================================================================
// Schemas
// ===================================================================

pub struct Schemas {
    pub registry: Arc<Registry>,
    pub orgs: Arc<Schema>,
    pub users: Arc<Schema>,
    pub profiles: Arc<Schema>,
    pub audit: Arc<Schema>,
}

pub fn schemas() -> Schemas {
    let mut registry = Registry::new();
    let orgs = registry
        .register(
            Schema::builder("orgs")
                .field(Field::new("id", FieldType::Int).primary_key())
                .field(Field::new("name", FieldType::Text).nullable(false))
                .field(Field::new("created_at", FieldType::DateTime).default(FieldDefault::now()))
                .field(Field::new("admin_id", FieldType::Int))
                .has_many("users", "users", ["id", "org_id"])
                .has_one("admin", "users", ["admin_id", "id"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let users = registry
        .register(
            Schema::builder("users")
                .field(Field::new("id", FieldType::Int).primary_key())
                .field(Field::new("name", FieldType::Text).nullable(false))
                .field(Field::new("org_id", FieldType::Int).column("organisation_id"))
                .has_one("profile", "profiles", ["id", "user_id"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let profiles = registry
        .register(
            Schema::builder("profiles")
                .field(Field::new("id", FieldType::Int).primary_key())
                .field(Field::new("user_id", FieldType::Int))
                .field(Field::new("bio", FieldType::Text))
                .build()
                .unwrap(),
        )
        .unwrap();
    // No primary key.
    let audit = registry
        .register(
            Schema::builder("audit")
                .field(Field::new("message", FieldType::Text).nullable(false))
                .field(Field::new("level", FieldType::Int).default_value(1))
                .build()
                .unwrap(),
        )
        .unwrap();
    Schemas {
        registry: Arc::new(registry),
        orgs,
        users,
        profiles,
        audit,
    }
}

// ===================================================================
// SQLite
// ===================================================================

const DDL: &[&str] = &[
    "CREATE TABLE orgs (id INTEGER PRIMARY KEY, name TEXT NOT NULL, created_at TEXT, \
     admin_id INTEGER)",
    "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, \
     organisation_id INTEGER REFERENCES orgs(id))",
    "CREATE TABLE profiles (id INTEGER PRIMARY KEY, user_id INTEGER, bio TEXT)",
    "CREATE TABLE audit (message TEXT NOT NULL, level INTEGER)",
];

pub async fn sqlite(schemas: &Schemas) -> Database<SqliteDriver> {
    init_tracing();
    let driver = SqliteDriver::connect(&SqliteOptions::default())
        .await
        .expect("Failed to open in-memory SQLite");
    let mut db = Database::new(driver).with_registry(Arc::clone(&schemas.registry));
    for sql in DDL {
        db.execute_raw(sql, &[]).await.unwrap();
    }
    db
}

pub async fn count(db: &mut Database<SqliteDriver>, table: &str) -> i64 {
    let rows = db
        .query_raw(&format!("SELECT COUNT(*) AS n FROM {table}"), &[])
        .await
        .unwrap();
    rows[0].get("n").and_then(SqlValue::as_i64).unwrap()
}

// ===================================================================
// Recording driver
// ===================================================================

/// One call the driver saw.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query(String, Vec<SqlValue>),
    Execute(String, Vec<SqlValue>),
    Begin,
    Commit,
    Rollback,
}

/// A driver that records every call, hands out increasing insert ids and
/// can fail the n-th statement.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub fail_statement: Option<usize>,
    pub rows: Vec<Row>,
    pub matches_nothing: bool,
    statements: usize,
    next_id: i64,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the `n`-th query or execute call (1-based).
    pub fn failing_at(n: usize) -> Self {
        Self {
            fail_statement: Some(n),
            ..Self::default()
        }
    }

    /// Rows handed back by every query.
    pub fn returning(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Reports zero affected rows for every execute.
    pub fn matching_nothing() -> Self {
        Self {
            matches_nothing: true,
            ..Self::default()
        }
    }

    fn statement(&mut self) -> Result<()> {
        self.statements += 1;
        if self.fail_statement == Some(self.statements) {
            return Err(OrmError::Driver("injected failure".into()));
        }
        Ok(())
    }
}

impl Driver for RecordingDriver {
    type Dialect = GenericDialect;

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Query(sql.to_string(), params.to_vec()));
        self.statement()?;
        Ok(self.rows.clone())
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<Executed> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Execute(sql.to_string(), params.to_vec()));
        self.statement()?;
        self.next_id += 1;
        Ok(Executed {
            rows_affected: u64::from(!self.matches_nothing),
            last_insert_id: Some(self.next_id),
        })
    }

    async fn begin(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Begin);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Commit);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Rollback);
        Ok(())
    }

    async fn close(self) -> Result<()> {
        Ok(())
    }
}

/// A database over a recording driver, plus a handle on its call log.
pub fn recording(
    schemas: &Schemas,
    driver: RecordingDriver,
) -> (Database<RecordingDriver>, Arc<Mutex<Vec<Call>>>) {
    let calls = Arc::clone(&driver.calls);
    let db = Database::new(driver).with_registry(Arc::clone(&schemas.registry));
    (db, calls)
}

pub fn sql_of(call: &Call) -> Option<&str> {
    match call {
        Call::Query(sql, _) | Call::Execute(sql, _) => Some(sql),
        _ => None,
    }
}
