//! The `where` grammar: expression trees or field → comparison maps.

use std::sync::Arc;

use super::{Query, Select};
use crate::error::{Error, Result};
use crate::expr::{Expr, IntoExpr, op};
use crate::schema::{Col, Schema};
use crate::value::{SqlValue, ToSqlValue};

/// One argument to `where_` / `having`.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// An explicit boolean expression.
    Expr(Expr),
    /// An equality-shorthand map.
    Filter(Filter),
}

impl From<Expr> for Predicate {
    fn from(expr: Expr) -> Self {
        Self::Expr(expr)
    }
}

impl From<Filter> for Predicate {
    fn from(filter: Filter) -> Self {
        Self::Filter(filter)
    }
}

impl Predicate {
    /// Turns the predicate into an expression, resolving filter keys against
    /// `schemas`. Bare names refer to the first schema; `schema.field`
    /// names pick another.
    pub(crate) fn resolve(&self, schemas: &[Arc<Schema>]) -> Result<Expr> {
        match self {
            Self::Expr(expr) => Ok(expr.clone()),
            Self::Filter(filter) => {
                if filter.entries.is_empty() {
                    return Err(Error::MalformedPredicate(String::from("empty filter")));
                }
                let mut parts = Vec::with_capacity(filter.entries.len());
                for (key, cmp) in &filter.entries {
                    let col = key.resolve(schemas)?;
                    parts.push(cmp.clone().apply(Expr::Column(col)));
                }
                Ok(op::and_(parts))
            }
        }
    }
}

/// Combines resolved predicates with `AND`.
pub(crate) fn conjunction(predicates: &[Predicate], schemas: &[Arc<Schema>]) -> Result<Option<Expr>> {
    let mut parts = predicates
        .iter()
        .map(|p| p.resolve(schemas))
        .collect::<Result<Vec<_>>>()?;
    Ok(match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(op::and_(parts)),
    })
}

/// The left-hand side of a filter entry.
#[derive(Debug, Clone)]
pub enum FilterKey {
    /// A column handle.
    Col(Col),
    /// A field (or column) name, optionally `schema.`-qualified.
    Name(String),
}

impl FilterKey {
    fn resolve(&self, schemas: &[Arc<Schema>]) -> Result<Col> {
        let name = match self {
            Self::Col(col) => return Ok(col.clone()),
            Self::Name(name) => name,
        };
        let root = schemas.first().ok_or(Error::NoSchema)?;
        let (schema, field) = match name.split_once('.') {
            Some((qualifier, field)) => {
                let schema = schemas
                    .iter()
                    .find(|s| s.name() == qualifier || s.table() == qualifier)
                    .ok_or_else(|| Error::UnknownField {
                        schema: String::from(qualifier),
                        field: String::from(field),
                    })?;
                (schema, field)
            }
            None => (root, name.as_str()),
        };
        let field = schema.lookup(field).ok_or_else(|| Error::UnknownField {
            schema: String::from(schema.name()),
            field: String::from(field),
        })?;
        Ok(Col::new(schema.table(), field.column_name(), field.name()))
    }
}

impl From<Col> for FilterKey {
    fn from(col: Col) -> Self {
        Self::Col(col)
    }
}

impl From<&Col> for FilterKey {
    fn from(col: &Col) -> Self {
        Self::Col(col.clone())
    }
}

impl From<&str> for FilterKey {
    fn from(name: &str) -> Self {
        Self::Name(String::from(name))
    }
}

impl From<String> for FilterKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// The right-hand side of a filter entry. Plain values mean equality.
#[derive(Debug, Clone)]
pub enum Cmp {
    /// `=`; a `NULL` value renders `IS NULL`.
    Eq(Expr),
    /// `!=`; a `NULL` value renders `IS NOT NULL`.
    NotEq(Expr),
    /// `<`
    Lt(Expr),
    /// `<=`
    LtEq(Expr),
    /// `>`
    Gt(Expr),
    /// `>=`
    GtEq(Expr),
    /// `LIKE`
    Like(Expr),
    /// `NOT LIKE`
    NotLike(Expr),
    /// Case-insensitive `LIKE`.
    ILike(Expr),
    /// `IN (...)`
    In(Vec<Expr>),
    /// `NOT IN (...)`
    NotIn(Vec<Expr>),
    /// `IN (SELECT ...)`
    InQuery(Box<Query<Select>>),
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    NotNull,
    /// `BETWEEN .. AND ..`
    Between(Expr, Expr),
}

impl Cmp {
    /// `!= value`
    pub fn not_eq(value: impl IntoExpr) -> Self {
        Self::NotEq(value.into_expr())
    }

    /// `< value`
    pub fn lt(value: impl IntoExpr) -> Self {
        Self::Lt(value.into_expr())
    }

    /// `<= value`
    pub fn lt_eq(value: impl IntoExpr) -> Self {
        Self::LtEq(value.into_expr())
    }

    /// `> value`
    pub fn gt(value: impl IntoExpr) -> Self {
        Self::Gt(value.into_expr())
    }

    /// `>= value`
    pub fn gt_eq(value: impl IntoExpr) -> Self {
        Self::GtEq(value.into_expr())
    }

    /// `LIKE pattern`
    pub fn like(pattern: impl IntoExpr) -> Self {
        Self::Like(pattern.into_expr())
    }

    /// `NOT LIKE pattern`
    pub fn not_like(pattern: impl IntoExpr) -> Self {
        Self::NotLike(pattern.into_expr())
    }

    /// Case-insensitive `LIKE pattern`
    pub fn ilike(pattern: impl IntoExpr) -> Self {
        Self::ILike(pattern.into_expr())
    }

    /// `IN (...)`
    pub fn in_list<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoExpr,
    {
        Self::In(items.into_iter().map(IntoExpr::into_expr).collect())
    }

    /// `NOT IN (...)`
    pub fn not_in<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoExpr,
    {
        Self::NotIn(items.into_iter().map(IntoExpr::into_expr).collect())
    }

    /// `IN (SELECT ...)`
    #[must_use]
    pub fn in_query(query: Query<Select>) -> Self {
        Self::InQuery(Box::new(query))
    }

    /// `BETWEEN low AND high`
    pub fn between(low: impl IntoExpr, high: impl IntoExpr) -> Self {
        Self::Between(low.into_expr(), high.into_expr())
    }

    /// Builds the comparison with `lhs` on the left.
    #[must_use]
    pub fn apply(self, lhs: Expr) -> Expr {
        match self {
            Self::Eq(Expr::Value(SqlValue::Null)) | Self::IsNull => op::is_null(lhs),
            Self::NotEq(Expr::Value(SqlValue::Null)) | Self::NotNull => op::not_null(lhs),
            Self::Eq(rhs) => op::eq(lhs, rhs),
            Self::NotEq(rhs) => op::not_eq(lhs, rhs),
            Self::Lt(rhs) => op::lt(lhs, rhs),
            Self::LtEq(rhs) => op::lt_eq(lhs, rhs),
            Self::Gt(rhs) => op::gt(lhs, rhs),
            Self::GtEq(rhs) => op::gt_eq(lhs, rhs),
            Self::Like(rhs) => op::like(lhs, rhs),
            Self::NotLike(rhs) => op::not_like(lhs, rhs),
            Self::ILike(rhs) => op::ilike(lhs, rhs),
            Self::In(items) => op::in_list(lhs, items),
            Self::NotIn(items) => op::not_in(lhs, items),
            Self::InQuery(query) => op::in_query(lhs, *query),
            Self::Between(low, high) => op::between(lhs, low, high),
        }
    }
}

impl From<Expr> for Cmp {
    fn from(expr: Expr) -> Self {
        Self::Eq(expr)
    }
}

impl From<Col> for Cmp {
    fn from(col: Col) -> Self {
        Self::Eq(Expr::Column(col))
    }
}

impl<T: ToSqlValue> From<Option<T>> for Cmp {
    fn from(value: Option<T>) -> Self {
        Self::Eq(Expr::Value(value.to_sql_value()))
    }
}

macro_rules! impl_cmp_from_value {
    ($($t:ty),+ $(,)?) => {
        $(
            impl From<$t> for Cmp {
                fn from(value: $t) -> Self {
                    Self::Eq(Expr::Value(value.to_sql_value()))
                }
            }
        )+
    };
}

impl_cmp_from_value!(
    SqlValue, &SqlValue, bool, i64, i32, i16, i8, u32, u16, u8, f64, f32, String, &str,
    Vec<u8>,
);

/// An ordered field → comparison map, `AND`-combined.
///
/// ```
/// use quarry_core::{Cmp, Filter};
///
/// let filter = Filter::new()
///     .with("name", "Ann")
///     .with("age", Cmp::gt_eq(18))
///     .with("deleted_at", Cmp::IsNull);
/// # let _ = filter;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Filter {
    entries: Vec<(FilterKey, Cmp)>,
}

impl Filter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<FilterKey>, cmp: impl Into<Cmp>) -> Self {
        self.entries.push((key.into(), cmp.into()));
        self
    }

    /// Returns `true` if the filter has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<FilterKey>, C: Into<Cmp>> FromIterator<(K, C)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, C)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, c)| (k.into(), c.into()))
                .collect(),
        }
    }
}
