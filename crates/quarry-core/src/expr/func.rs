//! Function constructors.

use std::sync::Arc;

use super::{Expr, IntoExpr, Template};

fn call1(name: &str, arg: impl IntoExpr) -> Expr {
    Expr::Function {
        name: String::from(name),
        args: vec![arg.into_expr()],
    }
}

/// `COUNT(expr)`
pub fn count(expr: impl IntoExpr) -> Expr {
    call1("COUNT", expr)
}

/// `COUNT(*)`
#[must_use]
pub fn count_all() -> Expr {
    call1("COUNT", Expr::Star)
}

/// `SUM(expr)`
pub fn sum(expr: impl IntoExpr) -> Expr {
    call1("SUM", expr)
}

/// `AVG(expr)`
pub fn avg(expr: impl IntoExpr) -> Expr {
    call1("AVG", expr)
}

/// `CEIL(expr)`
pub fn ceil(expr: impl IntoExpr) -> Expr {
    call1("CEIL", expr)
}

/// `MIN(expr)`
pub fn min(expr: impl IntoExpr) -> Expr {
    call1("MIN", expr)
}

/// `MAX(expr)`
pub fn max(expr: impl IntoExpr) -> Expr {
    call1("MAX", expr)
}

/// `LOWER(expr)`
pub fn lower(expr: impl IntoExpr) -> Expr {
    call1("LOWER", expr)
}

/// `UPPER(expr)`
pub fn upper(expr: impl IntoExpr) -> Expr {
    call1("UPPER", expr)
}

/// `COALESCE(a, b, ...)`
pub fn coalesce<I>(items: I) -> Expr
where
    I: IntoIterator,
    I::Item: IntoExpr,
{
    Expr::Function {
        name: String::from("COALESCE"),
        args: items.into_iter().map(IntoExpr::into_expr).collect(),
    }
}

/// `DISTINCT expr`, e.g. inside [`count`].
pub fn distinct(expr: impl IntoExpr) -> Expr {
    Expr::Distinct(Box::new(expr.into_expr()))
}

/// String concatenation, spelled per dialect.
pub fn concat<I>(items: I) -> Expr
where
    I: IntoIterator,
    I::Item: IntoExpr,
{
    Expr::Concat(items.into_iter().map(IntoExpr::into_expr).collect())
}

/// `CAST(expr AS ty)`
pub fn cast(expr: impl IntoExpr, ty: impl Into<String>) -> Expr {
    Expr::Cast {
        expr: Box::new(expr.into_expr()),
        ty: ty.into(),
    }
}

/// `expr AS name`. Result rows carry the value under `name`.
pub fn alias(expr: impl IntoExpr, name: impl Into<String>) -> Expr {
    Expr::Alias {
        expr: Box::new(expr.into_expr()),
        name: name.into(),
    }
}

/// Any SQL function by name.
pub fn function<I>(name: impl Into<String>, args: I) -> Expr
where
    I: IntoIterator,
    I::Item: IntoExpr,
{
    Expr::Function {
        name: name.into(),
        args: args.into_iter().map(IntoExpr::into_expr).collect(),
    }
}

/// A call to a template registered in the context's extensions.
pub fn call<I>(name: impl Into<String>, args: I) -> Expr
where
    I: IntoIterator,
    I::Item: IntoExpr,
{
    Expr::Call {
        name: name.into(),
        args: args.into_iter().map(IntoExpr::into_expr).collect(),
    }
}

/// An inline template applied to `args`.
pub fn template<I>(template: impl Into<Arc<Template>>, args: I) -> Expr
where
    I: IntoIterator,
    I::Item: IntoExpr,
{
    Expr::Template {
        template: template.into(),
        args: args.into_iter().map(IntoExpr::into_expr).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::dialect::GenericDialect;
    use crate::schema::Col;
    use crate::writer::SqlWriter;

    fn sql(expr: &Expr) -> String {
        let ctx = Context::new(GenericDialect::new());
        let mut w = SqlWriter::new(&ctx);
        expr.write(&mut w).unwrap();
        w.finish().0
    }

    #[test]
    fn test_aggregates() {
        let id = Col::new("users", "id", "id");
        assert_eq!(sql(&count_all()), "COUNT(*)");
        assert_eq!(sql(&count(distinct(&id))), "COUNT(DISTINCT users.id)");
        assert_eq!(
            sql(&alias(ceil(avg(&id)), "mean")),
            "CEIL(AVG(users.id)) AS mean"
        );
    }

    #[test]
    fn test_cast_and_coalesce() {
        let age = Col::new("users", "age", "age");
        assert_eq!(sql(&cast(&age, "TEXT")), "CAST(users.age AS TEXT)");
        assert_eq!(
            sql(&coalesce([Expr::Column(age), Expr::value(0)])),
            "COALESCE(users.age, ?)"
        );
    }

    #[test]
    fn test_inline_template() {
        let t = Template::new("{0} REGEXP {1}");
        let name = Col::new("users", "name", "name");
        assert_eq!(
            sql(&template(t, [Expr::Column(name), Expr::value("^a")])),
            "users.name REGEXP ?"
        );
    }
}
