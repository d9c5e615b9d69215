//! Operator constructors.

use super::{BinaryOp, Expr, IntoExpr};
use crate::builder::{Query, Select};

fn binary(op: BinaryOp, left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    Expr::Binary {
        op,
        left: left.into_expr().boxed(),
        right: right.into_expr().boxed(),
    }
}

/// `left = right`
pub fn eq(left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    binary(BinaryOp::Eq, left, right)
}

/// `left != right`
pub fn not_eq(left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    binary(BinaryOp::NotEq, left, right)
}

/// `left < right`
pub fn lt(left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    binary(BinaryOp::Lt, left, right)
}

/// `left <= right`
pub fn lt_eq(left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    binary(BinaryOp::LtEq, left, right)
}

/// `left > right`
pub fn gt(left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    binary(BinaryOp::Gt, left, right)
}

/// `left >= right`
pub fn gt_eq(left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    binary(BinaryOp::GtEq, left, right)
}

/// `left + right`
pub fn add(left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    binary(BinaryOp::Add, left, right)
}

/// `left - right`
pub fn sub(left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    binary(BinaryOp::Sub, left, right)
}

/// `left * right`
pub fn mul(left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    binary(BinaryOp::Mul, left, right)
}

/// `left / right`
pub fn div(left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    binary(BinaryOp::Div, left, right)
}

/// `left % right`
pub fn rem(left: impl IntoExpr, right: impl IntoExpr) -> Expr {
    binary(BinaryOp::Rem, left, right)
}

fn like_impl(expr: impl IntoExpr, pattern: impl IntoExpr, negated: bool, ci: bool) -> Expr {
    Expr::Like {
        expr: expr.into_expr().boxed(),
        pattern: pattern.into_expr().boxed(),
        negated,
        case_insensitive: ci,
    }
}

/// `expr LIKE pattern`. Wildcards must be part of `pattern`.
pub fn like(expr: impl IntoExpr, pattern: impl IntoExpr) -> Expr {
    like_impl(expr, pattern, false, false)
}

/// `expr NOT LIKE pattern`
pub fn not_like(expr: impl IntoExpr, pattern: impl IntoExpr) -> Expr {
    like_impl(expr, pattern, true, false)
}

/// Case-insensitive `LIKE`: `ILIKE` where the dialect has it, otherwise
/// `LOWER(expr) LIKE LOWER(pattern)`.
pub fn ilike(expr: impl IntoExpr, pattern: impl IntoExpr) -> Expr {
    like_impl(expr, pattern, false, true)
}

fn in_impl<I>(expr: impl IntoExpr, items: I, negated: bool) -> Expr
where
    I: IntoIterator,
    I::Item: IntoExpr,
{
    Expr::InList {
        expr: expr.into_expr().boxed(),
        list: items.into_iter().map(IntoExpr::into_expr).collect(),
        negated,
    }
}

/// `expr IN (a, b, ...)`, one parameter per literal.
pub fn in_list<I>(expr: impl IntoExpr, items: I) -> Expr
where
    I: IntoIterator,
    I::Item: IntoExpr,
{
    in_impl(expr, items, false)
}

/// `expr NOT IN (a, b, ...)`
pub fn not_in<I>(expr: impl IntoExpr, items: I) -> Expr
where
    I: IntoIterator,
    I::Item: IntoExpr,
{
    in_impl(expr, items, true)
}

/// `expr IN (SELECT ...)`
pub fn in_query(expr: impl IntoExpr, query: Query<Select>) -> Expr {
    Expr::InQuery {
        expr: expr.into_expr().boxed(),
        query: Box::new(query),
        negated: false,
    }
}

/// `expr NOT IN (SELECT ...)`
pub fn not_in_query(expr: impl IntoExpr, query: Query<Select>) -> Expr {
    Expr::InQuery {
        expr: expr.into_expr().boxed(),
        query: Box::new(query),
        negated: true,
    }
}

/// `expr IS NULL`
pub fn is_null(expr: impl IntoExpr) -> Expr {
    Expr::IsNull {
        expr: expr.into_expr().boxed(),
        negated: false,
    }
}

/// `expr IS NOT NULL`
pub fn not_null(expr: impl IntoExpr) -> Expr {
    Expr::IsNull {
        expr: expr.into_expr().boxed(),
        negated: true,
    }
}

/// `expr BETWEEN low AND high`
pub fn between(expr: impl IntoExpr, low: impl IntoExpr, high: impl IntoExpr) -> Expr {
    Expr::Between {
        expr: expr.into_expr().boxed(),
        low: low.into_expr().boxed(),
        high: high.into_expr().boxed(),
        negated: false,
    }
}

/// `NOT (expr)`
pub fn not_(expr: impl IntoExpr) -> Expr {
    Expr::Not(expr.into_expr().boxed())
}

/// N-ary `AND`. Nested conjunctions are flattened.
pub fn and_<I>(items: I) -> Expr
where
    I: IntoIterator,
    I::Item: IntoExpr,
{
    let mut flat = vec![];
    for item in items {
        match item.into_expr() {
            Expr::And(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    Expr::And(flat)
}

/// N-ary `OR`. Nested disjunctions are flattened.
pub fn or_<I>(items: I) -> Expr
where
    I: IntoIterator,
    I::Item: IntoExpr,
{
    let mut flat = vec![];
    for item in items {
        match item.into_expr() {
            Expr::Or(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    Expr::Or(flat)
}
