//! `INSERT`, `UPDATE` and `DELETE` compilation.

use std::sync::Arc;

use super::predicate::conjunction;
use super::{Compiled, Delete, Insert, Query, Statement, StatementKind, Update, Window};
use crate::changeset::{Action, Changeset};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::expr::{Expr, op};
use crate::row::Row;
use crate::schema::{Col, Field, Schema};
use crate::value::SqlValue;
use crate::writer::SqlWriter;

/// Column and value pairs of a changeset, in changeset order.
fn assignments<'s>(schema: &'s Schema, changeset: &Changeset) -> Result<Vec<(&'s Field, SqlValue)>> {
    changeset
        .row()
        .values()
        .map(|(key, value)| {
            let field = schema.field(key).ok_or_else(|| Error::UnknownField {
                schema: String::from(schema.name()),
                field: String::from(key),
            })?;
            Ok((field, value.clone()))
        })
        .collect()
}

/// `pk = value` for the key stored in `row`, if it carries one.
fn key_predicate(schema: &Schema, row: &Row) -> Option<Expr> {
    let pk = schema.primary_key()?;
    let value = row.get(pk.name()).filter(|v| !v.is_empty_key())?;
    let col = Col::new(schema.table(), pk.column_name(), pk.name());
    Some(op::eq(col, value.clone()))
}

fn compiled(
    kind: StatementKind,
    root: &Arc<Schema>,
    w: SqlWriter<'_>,
    changeset: Option<Changeset>,
    returning: Option<String>,
) -> Compiled {
    let (sql, params, debug_sql) = w.finish();
    Compiled {
        kind,
        sql,
        params,
        debug_sql,
        single: false,
        plan: None,
        window: Window::default(),
        changeset,
        returning,
        primary_key: root.primary_key().map(|pk| String::from(pk.name())),
    }
}

impl Statement for Query<Insert> {
    fn compile(&self, ctx: &Context) -> Result<Compiled> {
        let root = self.root()?;
        let input = self.row.clone().unwrap_or_default();
        let changeset = Changeset::new(root, &input, Action::Insert)?;
        let values = assignments(root, &changeset)?;

        let mut w = SqlWriter::new(ctx);
        w.push("INSERT INTO ");
        w.ident(root.table());
        if values.is_empty() {
            w.push(w.dialect().default_values());
        } else {
            w.push(" (");
            w.list(&values, ", ", |w, (field, _)| {
                w.ident(field.column_name());
                Ok::<_, Error>(())
            })?;
            w.push(") VALUES (");
            w.list(&values, ", ", |w, (_, value)| {
                w.bind(value.clone());
                Ok::<_, Error>(())
            })?;
            w.push(")");
        }

        let returning = match root.primary_key() {
            Some(pk) if ctx.dialect().supports_returning() => {
                w.push(" RETURNING ");
                w.ident(pk.column_name());
                if pk.column_name() != pk.name() {
                    w.push(" AS ");
                    w.ident(pk.name());
                }
                Some(String::from(pk.name()))
            }
            _ => None,
        };

        Ok(compiled(
            StatementKind::Insert,
            root,
            w,
            Some(changeset),
            returning,
        ))
    }
}

impl Statement for Query<Update> {
    fn compile(&self, ctx: &Context) -> Result<Compiled> {
        let root = self.root()?;
        let input = self.row.clone().unwrap_or_default();
        let changeset = Changeset::new(root, &input, Action::Update)?;

        // Without a predicate the row's own key selects the target, and the
        // key is not rewritten.
        let (predicate, skip_key) = match conjunction(&self.predicates, &self.schemas)? {
            Some(expr) => (expr, None),
            None => {
                let expr = key_predicate(root, changeset.row())
                    .ok_or(Error::MissingPredicate("update"))?;
                (expr, root.primary_key().map(Field::name))
            }
        };
        let values: Vec<_> = assignments(root, &changeset)?
            .into_iter()
            .filter(|(field, _)| Some(field.name()) != skip_key)
            .collect();
        if values.is_empty() {
            return Err(Error::NothingToUpdate(String::from(root.name())));
        }

        let mut w = SqlWriter::new(ctx);
        w.push("UPDATE ");
        w.ident(root.table());
        w.push(" SET ");
        w.list(&values, ", ", |w, (field, value)| {
            w.ident(field.column_name());
            w.push(" = ");
            w.bind(value.clone());
            Ok::<_, Error>(())
        })?;
        w.push(" WHERE ");
        predicate.write(&mut w)?;

        Ok(compiled(
            StatementKind::Update,
            root,
            w,
            Some(changeset),
            None,
        ))
    }
}

impl Statement for Query<Delete> {
    fn compile(&self, ctx: &Context) -> Result<Compiled> {
        let root = self.root()?;
        // A target row narrows any predicate to that row.
        let by_key = self.row.as_ref().and_then(|row| key_predicate(root, row));
        let predicate = match (conjunction(&self.predicates, &self.schemas)?, by_key) {
            (Some(expr), Some(key)) => op::and_([expr, key]),
            (Some(expr), None) | (None, Some(expr)) => expr,
            (None, None) => return Err(Error::MissingPredicate("delete")),
        };

        let mut w = SqlWriter::new(ctx);
        w.push("DELETE FROM ");
        w.ident(root.table());
        w.push(" WHERE ");
        predicate.write(&mut w)?;

        Ok(compiled(StatementKind::Delete, root, w, None, None))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;
    use crate::builder::{Cmp, Filter};
    use crate::dialect::{GenericDialect, MySqlDialect, PostgresDialect, SqliteDialect};
    use crate::error::Stage;
    use crate::schema::FieldType;

    fn users() -> Arc<Schema> {
        Arc::new(
            Schema::builder("users")
                .field(Field::new("id", FieldType::Int).primary_key().column("user_id"))
                .field(Field::new("name", FieldType::Text).nullable(false))
                .field(Field::new("age", FieldType::Int))
                .build()
                .unwrap(),
        )
    }

    fn log() -> Arc<Schema> {
        Arc::new(
            Schema::builder("log")
                .field(Field::new("message", FieldType::Text))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_insert_with_returning() {
        let ctx = Context::new(PostgresDialect::new());
        let users = users();
        let compiled = Query::new([&users])
            .insert(Row::new().set("name", "Ann").set("age", "30"))
            .compile(&ctx)
            .unwrap();
        assert_eq!(
            compiled.sql(),
            "INSERT INTO \"users\" (\"name\", \"age\") VALUES ($1, $2) \
             RETURNING \"user_id\" AS \"id\""
        );
        assert_eq!(
            compiled.params(),
            &[SqlValue::Text(String::from("Ann")), SqlValue::Int(30)]
        );
        assert_eq!(compiled.returning(), Some("id"));
        assert_eq!(compiled.kind(), StatementKind::Insert);
    }

    #[test]
    fn test_insert_without_primary_key() {
        let ctx = Context::new(SqliteDialect::new());
        let log = log();
        let compiled = Query::new([&log])
            .insert(Row::new().set("message", "hi"))
            .compile(&ctx)
            .unwrap();
        assert_eq!(compiled.sql(), "INSERT INTO \"log\" (\"message\") VALUES (?)");
        assert_eq!(compiled.returning(), None);
        assert_eq!(compiled.primary_key(), None);
        assert!(!compiled.changeset().unwrap().row().contains("id"));
    }

    #[test]
    fn test_insert_default_values() {
        let log = log();
        let sqlite = Query::new([&log])
            .insert(Row::new())
            .compile(&Context::new(SqliteDialect::new()))
            .unwrap();
        assert_eq!(sqlite.sql(), "INSERT INTO \"log\" DEFAULT VALUES");
        let mysql = Query::new([&log])
            .insert(Row::new())
            .compile(&Context::new(MySqlDialect::new()))
            .unwrap();
        assert_eq!(mysql.sql(), "INSERT INTO `log` () VALUES ()");
    }

    #[test]
    fn test_insert_factory_runs_per_compile() {
        let counter = Arc::new(AtomicI64::new(0));
        let next = Arc::clone(&counter);
        let schema = Arc::new(
            Schema::builder("tickets")
                .field(
                    Field::new("serial", FieldType::Int)
                        .default_with(move || SqlValue::Int(next.fetch_add(1, Ordering::SeqCst))),
                )
                .build()
                .unwrap(),
        );
        let ctx = Context::new(GenericDialect::new());
        let query = Query::new([&schema]).insert(Row::new());
        let first = query.compile(&ctx).unwrap();
        let second = query.compile(&ctx).unwrap();
        assert_eq!(first.params(), &[SqlValue::Int(0)]);
        assert_eq!(second.params(), &[SqlValue::Int(1)]);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_insert_validation_fails_before_sql() {
        let ctx = Context::new(GenericDialect::new());
        let users = users();
        let err = Query::new([&users])
            .insert(Row::new().set("age", 3))
            .compile(&ctx)
            .unwrap_err();
        match err {
            Error::Validation(e) => {
                assert_eq!(e.field.as_deref(), Some("name"));
                assert_eq!(e.stage, Stage::Required);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_update_by_primary_key() {
        let ctx = Context::new(GenericDialect::new());
        let users = users();
        let compiled = Query::new([&users])
            .update(Row::new().set("id", 7).set("name", "Bea"))
            .compile(&ctx)
            .unwrap();
        assert_eq!(
            compiled.sql(),
            "UPDATE users SET name = ? WHERE users.user_id = ?"
        );
        assert_eq!(compiled.debug_sql(), "UPDATE users SET name = 'Bea' WHERE users.user_id = 7");
    }

    #[test]
    fn test_update_with_predicate() {
        let ctx = Context::new(PostgresDialect::new());
        let users = users();
        let compiled = Query::new([&users])
            .update(Row::new().set("age", 40))
            .where_(Filter::new().with("age", Cmp::lt(18)))
            .compile(&ctx)
            .unwrap();
        assert_eq!(
            compiled.sql(),
            "UPDATE \"users\" SET \"age\" = $1 WHERE \"users\".\"age\" < $2"
        );
    }

    #[test]
    fn test_update_needs_target_and_columns() {
        let ctx = Context::new(GenericDialect::new());
        let users = users();
        let err = Query::new([&users])
            .update(Row::new().set("name", "x"))
            .compile(&ctx)
            .unwrap_err();
        assert!(matches!(err, Error::MissingPredicate("update")));

        let err = Query::new([&users])
            .update(Row::new().set("id", 1))
            .compile(&ctx)
            .unwrap_err();
        assert!(matches!(err, Error::NothingToUpdate(ref s) if s == "users"));
    }

    #[test]
    fn test_delete_by_predicate_or_row() {
        let ctx = Context::new(GenericDialect::new());
        let users = users();
        let compiled = Query::new([&users])
            .delete()
            .where_(Filter::new().with("name", "Ann"))
            .compile(&ctx)
            .unwrap();
        assert_eq!(compiled.sql(), "DELETE FROM users WHERE users.name = ?");

        let compiled = Query::new([&users])
            .delete()
            .row(Row::new().set("id", 3))
            .compile(&ctx)
            .unwrap();
        assert_eq!(compiled.debug_sql(), "DELETE FROM users WHERE users.user_id = 3");

        let err = Query::new([&users]).delete().compile(&ctx).unwrap_err();
        assert!(matches!(err, Error::MissingPredicate("delete")));
    }

    #[test]
    fn test_delete_row_narrows_predicate() {
        let ctx = Context::new(GenericDialect::new());
        let users = users();
        let compiled = Query::new([&users])
            .delete()
            .where_(Filter::new().with("name", "Ann"))
            .row(Row::new().set("id", 3))
            .compile(&ctx)
            .unwrap();
        assert_eq!(
            compiled.sql(),
            "DELETE FROM users WHERE users.name = ? AND users.user_id = ?"
        );
        assert_eq!(
            compiled.params(),
            &[SqlValue::Text(String::from("Ann")), SqlValue::Int(3)]
        );

        // A keyless row leaves the predicate alone.
        let compiled = Query::new([&users])
            .delete()
            .where_(Filter::new().with("name", "Ann"))
            .row(Row::new().set("name", "Ann"))
            .compile(&ctx)
            .unwrap();
        assert_eq!(compiled.sql(), "DELETE FROM users WHERE users.name = ?");
    }
}
