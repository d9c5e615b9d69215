//! The expression algebra.
//!
//! [`Expr`] is a tagged union with one variant per operator family. Nodes are
//! built with the free constructors in [`op`] and [`func`], or with the
//! [`ExprExt`] methods on columns and expressions:
//!
//! ```
//! use quarry_core::expr::{ExprExt, op};
//! use quarry_core::{Field, FieldType, Schema};
//!
//! let users = Schema::builder("users")
//!     .field(Field::new("id", FieldType::Int).primary_key())
//!     .field(Field::new("age", FieldType::Int))
//!     .build()
//!     .unwrap();
//!
//! let adults = users.col("age").unwrap().gt_eq(18);
//! let either = op::or_([adults, users.col("id").unwrap().eq(1)]);
//! # let _ = either;
//! ```
//!
//! Every literal becomes a bound parameter when rendered.

pub mod func;
pub mod op;
mod template;

use std::sync::Arc;

pub use template::{Extensions, Template};

use crate::builder::{Query, Select};
use crate::error::{Error, Result};
use crate::schema::Col;
use crate::value::{SqlValue, ToSqlValue};
use crate::writer::SqlWriter;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl BinaryOp {
    /// SQL spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

/// An expression node.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A column reference.
    Column(Col),
    /// A literal, always bound as a parameter.
    Value(SqlValue),
    /// Raw SQL text, emitted verbatim.
    Raw(String),
    /// `*`
    Star,
    /// Comparison or arithmetic.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `NOT (expr)`
    Not(Box<Expr>),
    /// `IS [NOT] NULL`
    IsNull {
        /// Tested expression.
        expr: Box<Expr>,
        /// `IS NOT NULL` when set.
        negated: bool,
    },
    /// `[NOT] IN (a, b, ...)`
    InList {
        /// Tested expression.
        expr: Box<Expr>,
        /// Candidates.
        list: Vec<Expr>,
        /// `NOT IN` when set.
        negated: bool,
    },
    /// `[NOT] IN (SELECT ...)`
    InQuery {
        /// Tested expression.
        expr: Box<Expr>,
        /// Subquery.
        query: Box<Query<Select>>,
        /// `NOT IN` when set.
        negated: bool,
    },
    /// `[NOT] LIKE` / `ILIKE`. The pattern is used as given.
    Like {
        /// Tested expression.
        expr: Box<Expr>,
        /// Pattern.
        pattern: Box<Expr>,
        /// `NOT LIKE` when set.
        negated: bool,
        /// Case-insensitive match.
        case_insensitive: bool,
    },
    /// `[NOT] BETWEEN low AND high`
    Between {
        /// Tested expression.
        expr: Box<Expr>,
        /// Lower bound.
        low: Box<Expr>,
        /// Upper bound.
        high: Box<Expr>,
        /// `NOT BETWEEN` when set.
        negated: bool,
    },
    /// N-ary conjunction.
    And(Vec<Expr>),
    /// N-ary disjunction.
    Or(Vec<Expr>),
    /// A SQL function call, `NAME(args)`.
    Function {
        /// Function name, emitted verbatim.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// String concatenation.
    Concat(Vec<Expr>),
    /// `DISTINCT expr`
    Distinct(Box<Expr>),
    /// `CAST(expr AS ty)`
    Cast {
        /// Converted expression.
        expr: Box<Expr>,
        /// Target SQL type.
        ty: String,
    },
    /// `expr AS name`; result rows are keyed by `name`.
    Alias {
        /// Aliased expression.
        expr: Box<Expr>,
        /// Output name.
        name: String,
    },
    /// `(SELECT ...)`
    Subquery(Box<Query<Select>>),
    /// An inline template.
    Template {
        /// Template.
        template: Arc<Template>,
        /// Arguments, by slot.
        args: Vec<Expr>,
    },
    /// A call to a template registered in the context's [`Extensions`].
    Call {
        /// Registered name.
        name: String,
        /// Arguments, by slot.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// A literal.
    #[must_use]
    pub fn value(value: impl ToSqlValue) -> Self {
        Self::Value(value.to_sql_value())
    }

    /// Raw SQL. Never pass user input here.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Whether the node needs parentheses when used as an operand.
    const fn is_compound(&self) -> bool {
        matches!(
            self,
            Self::Binary { .. }
                | Self::Not(_)
                | Self::IsNull { .. }
                | Self::InList { .. }
                | Self::InQuery { .. }
                | Self::Like { .. }
                | Self::Between { .. }
                | Self::And(_)
                | Self::Or(_)
                | Self::Distinct(_)
                | Self::Alias { .. }
        )
    }

    pub(crate) fn write_operand(&self, w: &mut SqlWriter<'_>) -> Result<()> {
        if self.is_compound() {
            w.push("(");
            self.write(w)?;
            w.push(")");
            Ok(())
        } else {
            self.write(w)
        }
    }

    /// Writes a projection item. Columns whose field name differs from the
    /// column name are aliased to the field name.
    pub(crate) fn write_projection(&self, w: &mut SqlWriter<'_>) -> Result<()> {
        match self {
            Self::Column(col) if col.column() != col.field() => {
                w.col(col);
                w.push(" AS ");
                w.ident(col.field());
                Ok(())
            }
            other => other.write(w),
        }
    }

    /// Writes a grouping or ordering key. Aliases are referenced by name.
    pub(crate) fn write_key(&self, w: &mut SqlWriter<'_>) -> Result<()> {
        match self {
            Self::Alias { name, .. } => {
                w.ident(name);
                Ok(())
            }
            other => other.write(w),
        }
    }

    /// Writes the node.
    pub(crate) fn write(&self, w: &mut SqlWriter<'_>) -> Result<()> {
        match self {
            Self::Column(col) => w.col(col),
            Self::Value(value) => w.bind(value.clone()),
            Self::Raw(sql) => w.push(sql),
            Self::Star => w.push("*"),
            Self::Binary { op, left, right } => {
                left.write_operand(w)?;
                w.push(" ");
                w.push(op.as_str());
                w.push(" ");
                right.write_operand(w)?;
            }
            Self::Not(inner) => {
                w.push("NOT (");
                inner.write(w)?;
                w.push(")");
            }
            Self::IsNull { expr, negated } => {
                expr.write_operand(w)?;
                w.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Self::InList {
                expr,
                list,
                negated,
            } => {
                if list.is_empty() {
                    // Nothing is IN an empty set.
                    w.push(if *negated { "1 = 1" } else { "1 = 0" });
                } else {
                    expr.write_operand(w)?;
                    w.push(if *negated { " NOT IN (" } else { " IN (" });
                    w.list(list, ", ", |w, item| item.write(w))?;
                    w.push(")");
                }
            }
            Self::InQuery {
                expr,
                query,
                negated,
            } => {
                expr.write_operand(w)?;
                w.push(if *negated { " NOT IN (" } else { " IN (" });
                query.write_select(w)?;
                w.push(")");
            }
            Self::Like {
                expr,
                pattern,
                negated,
                case_insensitive,
            } => {
                let not = if *negated { " NOT" } else { "" };
                if *case_insensitive && !w.dialect().supports_ilike() {
                    w.push("LOWER(");
                    expr.write(w)?;
                    w.push(")");
                    w.push(not);
                    w.push(" LIKE LOWER(");
                    pattern.write(w)?;
                    w.push(")");
                } else {
                    expr.write_operand(w)?;
                    w.push(not);
                    w.push(if *case_insensitive { " ILIKE " } else { " LIKE " });
                    pattern.write_operand(w)?;
                }
            }
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => {
                expr.write_operand(w)?;
                w.push(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                low.write_operand(w)?;
                w.push(" AND ");
                high.write_operand(w)?;
            }
            Self::And(items) => write_junction(items, "AND", w)?,
            Self::Or(items) => write_junction(items, "OR", w)?,
            Self::Function { name, args } => {
                w.push(name);
                w.push("(");
                w.list(args, ", ", |w, arg| arg.write(w))?;
                w.push(")");
            }
            Self::Concat(items) => {
                if w.dialect().concat_operator() {
                    w.list(items, " || ", |w, item| item.write_operand(w))?;
                } else {
                    w.push("CONCAT(");
                    w.list(items, ", ", |w, item| item.write(w))?;
                    w.push(")");
                }
            }
            Self::Distinct(inner) => {
                w.push("DISTINCT ");
                inner.write_operand(w)?;
            }
            Self::Cast { expr, ty } => {
                w.push("CAST(");
                expr.write(w)?;
                w.push(" AS ");
                w.push(ty);
                w.push(")");
            }
            Self::Alias { expr, name } => {
                expr.write(w)?;
                w.push(" AS ");
                w.ident(name);
            }
            Self::Subquery(query) => {
                w.push("(");
                query.write_select(w)?;
                w.push(")");
            }
            Self::Template { template, args } => template.write("<inline>", args, w)?,
            Self::Call { name, args } => w.context().extensions().write_call(name, args, w)?,
        }
        Ok(())
    }
}

fn write_junction(items: &[Expr], keyword: &str, w: &mut SqlWriter<'_>) -> Result<()> {
    match items {
        [] => Err(Error::MalformedPredicate(format!("empty {keyword} group"))),
        [only] => only.write(w),
        _ => {
            let sep = format!(" {keyword} ");
            w.list(items, &sep, |w, item| match item {
                Expr::And(_) | Expr::Or(_) => item.write_operand(w),
                _ => item.write(w),
            })
        }
    }
}

/// Conversion into an expression operand.
pub trait IntoExpr {
    /// Converts `self` into an [`Expr`].
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for Col {
    fn into_expr(self) -> Expr {
        Expr::Column(self)
    }
}

impl IntoExpr for &Col {
    fn into_expr(self) -> Expr {
        Expr::Column(self.clone())
    }
}

impl IntoExpr for Query<Select> {
    fn into_expr(self) -> Expr {
        Expr::Subquery(Box::new(self))
    }
}

impl<T: ToSqlValue> IntoExpr for Option<T> {
    fn into_expr(self) -> Expr {
        Expr::Value(self.to_sql_value())
    }
}

macro_rules! impl_into_expr_value {
    ($($t:ty),+ $(,)?) => {
        $(
            impl IntoExpr for $t {
                fn into_expr(self) -> Expr {
                    Expr::Value(self.to_sql_value())
                }
            }
        )+
    };
}

impl_into_expr_value!(
    SqlValue, &SqlValue, bool, i64, i32, i16, i8, u32, u16, u8, f64, f32, String, &str,
    Vec<u8>, &[u8],
);

/// Method-style constructors, available on [`Col`] and [`Expr`].
///
/// `col.eq(5)` is the same node as `op::eq(col, 5)`.
pub trait ExprExt: IntoExpr + Sized {
    /// `self = other`
    fn eq(self, other: impl IntoExpr) -> Expr {
        op::eq(self, other)
    }

    /// `self != other`
    fn not_eq(self, other: impl IntoExpr) -> Expr {
        op::not_eq(self, other)
    }

    /// `self < other`
    fn lt(self, other: impl IntoExpr) -> Expr {
        op::lt(self, other)
    }

    /// `self <= other`
    fn lt_eq(self, other: impl IntoExpr) -> Expr {
        op::lt_eq(self, other)
    }

    /// `self > other`
    fn gt(self, other: impl IntoExpr) -> Expr {
        op::gt(self, other)
    }

    /// `self >= other`
    fn gt_eq(self, other: impl IntoExpr) -> Expr {
        op::gt_eq(self, other)
    }

    /// `self LIKE pattern`
    fn like(self, pattern: impl IntoExpr) -> Expr {
        op::like(self, pattern)
    }

    /// Case-insensitive `LIKE`.
    fn ilike(self, pattern: impl IntoExpr) -> Expr {
        op::ilike(self, pattern)
    }

    /// `self NOT LIKE pattern`
    fn not_like(self, pattern: impl IntoExpr) -> Expr {
        op::not_like(self, pattern)
    }

    /// `self IN (...)`
    fn in_list<I>(self, items: I) -> Expr
    where
        I: IntoIterator,
        I::Item: IntoExpr,
    {
        op::in_list(self, items)
    }

    /// `self NOT IN (...)`
    fn not_in<I>(self, items: I) -> Expr
    where
        I: IntoIterator,
        I::Item: IntoExpr,
    {
        op::not_in(self, items)
    }

    /// `self IN (SELECT ...)`
    fn in_query(self, query: Query<Select>) -> Expr {
        op::in_query(self, query)
    }

    /// `self IS NULL`
    fn is_null(self) -> Expr {
        op::is_null(self)
    }

    /// `self IS NOT NULL`
    fn not_null(self) -> Expr {
        op::not_null(self)
    }

    /// `self BETWEEN low AND high`
    fn between(self, low: impl IntoExpr, high: impl IntoExpr) -> Expr {
        op::between(self, low, high)
    }

    /// `self + other`
    fn add(self, other: impl IntoExpr) -> Expr {
        op::add(self, other)
    }

    /// `self - other`
    fn sub(self, other: impl IntoExpr) -> Expr {
        op::sub(self, other)
    }

    /// `self * other`
    fn mul(self, other: impl IntoExpr) -> Expr {
        op::mul(self, other)
    }

    /// `self / other`
    fn div(self, other: impl IntoExpr) -> Expr {
        op::div(self, other)
    }

    /// `self % other`
    fn rem(self, other: impl IntoExpr) -> Expr {
        op::rem(self, other)
    }

    /// `self AND other`, flattening nested conjunctions.
    fn and(self, other: impl IntoExpr) -> Expr {
        op::and_([self.into_expr(), other.into_expr()])
    }

    /// `self OR other`, flattening nested disjunctions.
    fn or(self, other: impl IntoExpr) -> Expr {
        op::or_([self.into_expr(), other.into_expr()])
    }

    /// `self AS name`
    fn alias(self, name: impl Into<String>) -> Expr {
        func::alias(self, name)
    }
}

impl ExprExt for Expr {}
impl ExprExt for Col {}
