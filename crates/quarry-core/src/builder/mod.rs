//! Statement builder using the typestate pattern.
//!
//! A [`Query`] starts in the [`Unset`] state over one or more schemas and
//! moves into exactly one statement kind. Methods that only make sense for
//! some kinds (joins and grouping for reads, `where_` for everything but
//! inserts) are only available in those states, so
//!
//! ```compile_fail
//! # use std::sync::Arc;
//! # use quarry_core::{Field, FieldType, Query, Row, Schema};
//! # let s = Arc::new(Schema::builder("t").field(Field::new("a", FieldType::Int)).build().unwrap());
//! Query::new([&s]).insert(Row::new()).group_by(["a"]);
//! ```
//!
//! does not compile. The builder holds no connection; it compiles to SQL and
//! parameters with [`Statement::compile`].

mod compiled;
mod predicate;
mod read;
mod write;

use std::marker::PhantomData;
use std::sync::Arc;

pub use compiled::{Compiled, StatementKind, Window};
pub use predicate::{Cmp, Filter, FilterKey, Predicate};

use crate::context::Context;
use crate::error::Result;
use crate::expr::{Expr, IntoExpr};
use crate::preload::Preload;
use crate::row::Row;
use crate::schema::{Col, Schema};
use crate::writer::SqlWriter;

// Typestate markers (zero-sized types)

/// Marker: no statement kind chosen yet.
#[derive(Debug, Clone, Copy)]
pub struct Unset;
/// Marker: `SELECT`, zero or more rows.
#[derive(Debug, Clone, Copy)]
pub struct Select;
/// Marker: `SELECT`, zero or one row.
#[derive(Debug, Clone, Copy)]
pub struct Get;
/// Marker: `INSERT`.
#[derive(Debug, Clone, Copy)]
pub struct Insert;
/// Marker: `UPDATE`.
#[derive(Debug, Clone, Copy)]
pub struct Update;
/// Marker: `DELETE`.
#[derive(Debug, Clone, Copy)]
pub struct Delete;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Select {}
    impl Sealed for super::Get {}
    impl Sealed for super::Update {}
    impl Sealed for super::Delete {}
}

/// States that read rows.
pub trait Reads: sealed::Sealed {}
impl Reads for Select {}
impl Reads for Get {}

/// States that accept a `WHERE` clause.
pub trait Filters: sealed::Sealed {}
impl Filters for Select {}
impl Filters for Get {}
impl Filters for Update {}
impl Filters for Delete {}

/// Anything that compiles to a single statement.
pub trait Statement {
    /// Compiles to dialect SQL, parameters and debug SQL.
    ///
    /// Build-time and validation errors surface here, before any SQL can
    /// reach a database.
    fn compile(&self, ctx: &Context) -> Result<Compiled>;
}

/// SQL join types, rendered in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `LEFT OUTER JOIN`
    LeftOuter,
    /// `RIGHT JOIN`
    Right,
    /// `RIGHT OUTER JOIN`
    RightOuter,
    /// `FULL JOIN`
    Full,
    /// `FULL OUTER JOIN`
    FullOuter,
}

impl JoinKind {
    /// SQL keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::LeftOuter => "LEFT OUTER JOIN",
            Self::Right => "RIGHT JOIN",
            Self::RightOuter => "RIGHT OUTER JOIN",
            Self::Full => "FULL JOIN",
            Self::FullOuter => "FULL OUTER JOIN",
        }
    }
}

/// One join: `<kind> table [AS alias] ON left = right`.
#[derive(Debug, Clone)]
pub struct Join {
    kind: JoinKind,
    schema: Option<String>,
    table: String,
    alias: Option<String>,
    on: [Col; 2],
}

impl Join {
    pub(crate) fn aliased(kind: JoinKind, table: &str, alias: &str, on: [Col; 2]) -> Self {
        Self {
            kind,
            schema: None,
            table: String::from(table),
            alias: Some(String::from(alias)),
            on,
        }
    }

    /// Join type.
    #[must_use]
    pub const fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Table alias, if any.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub(crate) fn write(&self, w: &mut SqlWriter<'_>) {
        w.push(" ");
        w.push(self.kind.as_str());
        w.push(" ");
        w.ident(&self.table);
        if let Some(alias) = &self.alias {
            w.push(" AS ");
            w.ident(alias);
        }
        w.push(" ON ");
        w.col(&self.on[0]);
        w.push(" = ");
        w.col(&self.on[1]);
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// A statement under construction.
///
/// Single use: build it, compile it, drop it.
#[derive(Debug, Clone)]
pub struct Query<S> {
    schemas: Vec<Arc<Schema>>,
    projection: Vec<Expr>,
    distinct: bool,
    joins: Vec<Join>,
    predicates: Vec<Predicate>,
    group_by: Vec<Expr>,
    having: Vec<Predicate>,
    order_by: Vec<(Expr, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
    unions: Vec<(bool, Query<Select>)>,
    preloads: Vec<Preload>,
    row: Option<Row>,
    _state: PhantomData<S>,
}

impl Query<Unset> {
    /// Starts a statement over `schemas`. The first schema is the statement's
    /// table; the others may be joined.
    #[must_use]
    pub fn new<'s>(schemas: impl IntoIterator<Item = &'s Arc<Schema>>) -> Self {
        Self {
            schemas: schemas.into_iter().map(Arc::clone).collect(),
            projection: vec![],
            distinct: false,
            joins: vec![],
            predicates: vec![],
            group_by: vec![],
            having: vec![],
            order_by: vec![],
            limit: None,
            offset: None,
            unions: vec![],
            preloads: vec![],
            row: None,
            _state: PhantomData,
        }
    }

    /// `SELECT` the given expressions. An empty projection selects every
    /// field of the first schema.
    #[must_use]
    pub fn select<I>(mut self, projection: I) -> Query<Select>
    where
        I: IntoIterator,
        I::Item: IntoExpr,
    {
        self.projection = projection.into_iter().map(IntoExpr::into_expr).collect();
        self.transition()
    }

    /// `SELECT` every field of the first schema.
    #[must_use]
    pub fn select_all(self) -> Query<Select> {
        self.transition()
    }

    /// Like [`select`](Self::select), but yields at most one row.
    #[must_use]
    pub fn get<I>(mut self, projection: I) -> Query<Get>
    where
        I: IntoIterator,
        I::Item: IntoExpr,
    {
        self.projection = projection.into_iter().map(IntoExpr::into_expr).collect();
        self.transition()
    }

    /// Like [`select_all`](Self::select_all), but yields at most one row.
    #[must_use]
    pub fn get_all(self) -> Query<Get> {
        self.transition()
    }

    /// `INSERT` a row after running it through the changeset pipeline.
    #[must_use]
    pub fn insert(mut self, row: Row) -> Query<Insert> {
        self.row = Some(row);
        self.transition()
    }

    /// `UPDATE` with a row. Without a `where_`, the row's primary key selects
    /// the target.
    #[must_use]
    pub fn update(mut self, row: Row) -> Query<Update> {
        self.row = Some(row);
        self.transition()
    }

    /// `DELETE`.
    #[must_use]
    pub fn delete(self) -> Query<Delete> {
        self.transition()
    }
}

impl<S> Query<S> {
    fn transition<T>(self) -> Query<T> {
        Query {
            schemas: self.schemas,
            projection: self.projection,
            distinct: self.distinct,
            joins: self.joins,
            predicates: self.predicates,
            group_by: self.group_by,
            having: self.having,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
            unions: self.unions,
            preloads: self.preloads,
            row: self.row,
            _state: PhantomData,
        }
    }

    fn root(&self) -> Result<&Arc<Schema>> {
        self.schemas.first().ok_or(crate::error::Error::NoSchema)
    }

    /// The schemas the statement was built over.
    #[must_use]
    pub fn schemas(&self) -> &[Arc<Schema>] {
        &self.schemas
    }
}

impl<S: Filters> Query<S> {
    /// Adds a predicate. Repeated calls are `AND`-combined.
    #[must_use]
    pub fn where_(mut self, predicate: impl Into<Predicate>) -> Self {
        self.predicates.push(predicate.into());
        self
    }
}

impl<S: Reads> Query<S> {
    /// Adds a join against one of the statement's schemas.
    #[must_use]
    pub fn join(mut self, kind: JoinKind, schema: &Arc<Schema>, on: [Col; 2]) -> Self {
        self.joins.push(Join {
            kind,
            schema: Some(String::from(schema.name())),
            table: String::from(schema.table()),
            alias: None,
            on,
        });
        self
    }

    /// `INNER JOIN`
    #[must_use]
    pub fn inner_join(self, schema: &Arc<Schema>, on: [Col; 2]) -> Self {
        self.join(JoinKind::Inner, schema, on)
    }

    /// `LEFT JOIN`
    #[must_use]
    pub fn left_join(self, schema: &Arc<Schema>, on: [Col; 2]) -> Self {
        self.join(JoinKind::Left, schema, on)
    }

    /// `LEFT OUTER JOIN`
    #[must_use]
    pub fn left_outer_join(self, schema: &Arc<Schema>, on: [Col; 2]) -> Self {
        self.join(JoinKind::LeftOuter, schema, on)
    }

    /// `RIGHT JOIN`
    #[must_use]
    pub fn right_join(self, schema: &Arc<Schema>, on: [Col; 2]) -> Self {
        self.join(JoinKind::Right, schema, on)
    }

    /// `RIGHT OUTER JOIN`
    #[must_use]
    pub fn right_outer_join(self, schema: &Arc<Schema>, on: [Col; 2]) -> Self {
        self.join(JoinKind::RightOuter, schema, on)
    }

    /// `FULL JOIN`
    #[must_use]
    pub fn full_join(self, schema: &Arc<Schema>, on: [Col; 2]) -> Self {
        self.join(JoinKind::Full, schema, on)
    }

    /// `FULL OUTER JOIN`
    #[must_use]
    pub fn full_outer_join(self, schema: &Arc<Schema>, on: [Col; 2]) -> Self {
        self.join(JoinKind::FullOuter, schema, on)
    }

    /// Sets `DISTINCT`.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Adds `GROUP BY` keys.
    #[must_use]
    pub fn group_by<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoExpr,
    {
        self.group_by.extend(keys.into_iter().map(IntoExpr::into_expr));
        self
    }

    /// Adds a `HAVING` predicate. Repeated calls are `AND`-combined.
    #[must_use]
    pub fn having(mut self, predicate: impl Into<Predicate>) -> Self {
        self.having.push(predicate.into());
        self
    }

    /// Adds an `ORDER BY` key; keys apply in call order.
    #[must_use]
    pub fn order_by(mut self, key: impl IntoExpr, order: Order) -> Self {
        self.order_by.push((key.into_expr(), order));
        self
    }

    /// Skips the first `n` rows (parents, when preloading).
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Hydrates an association into each result row.
    #[must_use]
    pub fn preload(mut self, preload: Preload) -> Self {
        self.preloads.push(preload);
        self
    }
}

impl Query<Select> {
    /// Returns at most `n` rows (parents, when preloading).
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// `UNION` with another select.
    #[must_use]
    pub fn union(mut self, other: Self) -> Self {
        self.unions.push((false, other));
        self
    }

    /// `UNION ALL` with another select.
    #[must_use]
    pub fn union_all(mut self, other: Self) -> Self {
        self.unions.push((true, other));
        self
    }
}

impl Query<Delete> {
    /// Deletes the row identified by the primary key in `row`. Combined
    /// with `where_`, both must match.
    #[must_use]
    pub fn row(mut self, row: Row) -> Self {
        self.row = Some(row);
        self
    }
}
