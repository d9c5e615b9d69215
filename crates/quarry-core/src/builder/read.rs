//! `SELECT` compilation for [`Select`] and [`Get`].

use super::predicate::conjunction;
use super::{Compiled, Get, Order, Query, Reads, Select, Statement, StatementKind, Window};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::preload::Plan;
use crate::writer::SqlWriter;

impl<S: Reads> Query<S> {
    /// Checks wildcard policy and join targets.
    fn check_read(&self) -> Result<()> {
        let root = self.root()?;
        if self.projection.is_empty() {
            root.check_wildcard()?;
        } else if self.projection.iter().any(|e| matches!(e, Expr::Star)) {
            for schema in &self.schemas {
                schema.check_wildcard()?;
            }
        }
        for join in &self.joins {
            if let Some(name) = &join.schema {
                if !self.schemas.iter().any(|s| s.name() == name) {
                    return Err(Error::JoinTarget(name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Whether the projection returns the root primary key under its field
    /// name.
    fn projects_root_key(&self) -> Result<bool> {
        let root = self.root()?;
        let Some(pk) = root.primary_key() else {
            return Ok(false);
        };
        if self.projection.is_empty() {
            return Ok(true);
        }
        Ok(self.projection.iter().any(|e| match e {
            Expr::Column(col) => col.qualifier() == root.table() && col.field() == pk.name(),
            Expr::Alias { name, .. } => name == pk.name(),
            _ => false,
        }))
    }

    /// Writes `SELECT ... HAVING ...`, without ordering or limits.
    fn write_core(&self, w: &mut SqlWriter<'_>, plan: Option<&Plan>) -> Result<()> {
        self.check_read()?;
        let root = self.root()?;

        w.push("SELECT ");
        if self.distinct {
            w.push("DISTINCT ");
        }
        if self.projection.is_empty() {
            let cols: Vec<Expr> = root.cols().into_iter().map(Expr::Column).collect();
            w.list(&cols, ", ", |w, e| e.write_projection(w))?;
        } else {
            w.list(&self.projection, ", ", |w, e| e.write_projection(w))?;
        }
        if let Some(plan) = plan {
            for (col, key) in plan.projection() {
                w.push(", ");
                w.col(col);
                w.push(" AS ");
                w.ident(key);
            }
        }

        w.push(" FROM ");
        w.ident(root.table());

        for join in &self.joins {
            join.write(w);
        }
        if let Some(plan) = plan {
            for join in plan.joins() {
                join.write(w);
            }
        }

        if let Some(expr) = conjunction(&self.predicates, &self.schemas)? {
            w.push(" WHERE ");
            expr.write(w)?;
        }

        if !self.group_by.is_empty() {
            w.push(" GROUP BY ");
            w.list(&self.group_by, ", ", |w, e| e.write_key(w))?;
        }

        if let Some(expr) = conjunction(&self.having, &self.schemas)? {
            w.push(" HAVING ");
            expr.write(w)?;
        }

        for (all, other) in &self.unions {
            w.push(if *all { " UNION ALL " } else { " UNION " });
            other.write_core(w, None)?;
        }
        Ok(())
    }

    fn write_tail(&self, w: &mut SqlWriter<'_>, window: Window) -> Result<()> {
        if !self.order_by.is_empty() {
            w.push(" ORDER BY ");
            w.list(&self.order_by, ", ", |w, (key, order)| {
                key.write_key(w)?;
                if *order == Order::Desc {
                    w.push(" DESC");
                }
                Ok::<(), Error>(())
            })?;
        }
        if let Some(n) = window.limit {
            w.push(&format!(" LIMIT {n}"));
        }
        if let Some(n) = window.offset {
            if window.limit.is_none() {
                if let Some(all) = w.dialect().unbounded_limit() {
                    w.push(" LIMIT ");
                    w.push(all);
                }
            }
            w.push(&format!(" OFFSET {n}"));
        }
        Ok(())
    }

    fn compile_read(&self, ctx: &Context, limit: Option<u64>, single: bool) -> Result<Compiled> {
        let root = self.root()?;
        let plan = if self.preloads.is_empty() {
            None
        } else {
            Some(Plan::new(
                root,
                self.projects_root_key()?,
                &self.preloads,
                ctx.registry(),
            )?)
        };

        let window = Window {
            limit,
            offset: self.offset,
        };
        let mut w = SqlWriter::new(ctx);
        self.write_core(&mut w, plan.as_ref())?;
        // Fan-out rows per parent are unknown, so a preload window is applied
        // after hydration.
        let (sql_window, memory_window) = if plan.is_some() {
            (Window::default(), window)
        } else {
            (window, Window::default())
        };
        self.write_tail(&mut w, sql_window)?;

        let (sql, params, debug_sql) = w.finish();
        Ok(Compiled {
            kind: StatementKind::Select,
            sql,
            params,
            debug_sql,
            single,
            plan,
            window: memory_window,
            changeset: None,
            returning: None,
            primary_key: root.primary_key().map(|pk| String::from(pk.name())),
        })
    }
}

impl Query<Select> {
    /// Writes the statement as a subquery or union member.
    pub(crate) fn write_select(&self, w: &mut SqlWriter<'_>) -> Result<()> {
        self.write_core(w, None)?;
        self.write_tail(
            w,
            Window {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

impl Statement for Query<Select> {
    fn compile(&self, ctx: &Context) -> Result<Compiled> {
        self.compile_read(ctx, self.limit, false)
    }
}

impl Statement for Query<Get> {
    fn compile(&self, ctx: &Context) -> Result<Compiled> {
        self.compile_read(ctx, Some(1), true)
    }
}
