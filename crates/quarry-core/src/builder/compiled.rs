//! The output of [`Statement::compile`](super::Statement::compile).

use crate::changeset::Changeset;
use crate::preload::Plan;
use crate::row::Row;
use crate::value::SqlValue;

/// Row window applied after hydration when a read preloads associations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    /// Maximum number of parent rows.
    pub limit: Option<u64>,
    /// Parent rows to skip.
    pub offset: Option<u64>,
}

impl Window {
    /// Returns `true` if the window keeps every row.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }

    fn apply(self, rows: Vec<Row>) -> Vec<Row> {
        if self.is_unbounded() {
            return rows;
        }
        let skip = usize::try_from(self.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let take = self
            .limit
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
        rows.into_iter().skip(skip).take(take).collect()
    }
}

/// What a compiled statement does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Reads rows.
    Select,
    /// Inserts one row.
    Insert,
    /// Updates rows.
    Update,
    /// Deletes rows.
    Delete,
}

/// A compiled statement: SQL with placeholders, the parameters in
/// placeholder order, and a literal-inlined rendering for logs.
///
/// The debug rendering is never meant to be executed.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub(crate) kind: StatementKind,
    pub(crate) sql: String,
    pub(crate) params: Vec<SqlValue>,
    pub(crate) debug_sql: String,
    pub(crate) single: bool,
    pub(crate) plan: Option<Plan>,
    pub(crate) window: Window,
    pub(crate) changeset: Option<Changeset>,
    pub(crate) returning: Option<String>,
    pub(crate) primary_key: Option<String>,
}

impl Compiled {
    /// SQL with dialect placeholders.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters, in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// SQL with parameters rendered inline. For logs only.
    #[must_use]
    pub fn debug_sql(&self) -> &str {
        &self.debug_sql
    }

    /// Statement kind.
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Whether the statement yields at most one row.
    #[must_use]
    pub const fn is_single(&self) -> bool {
        self.single
    }

    /// Window still to apply to hydrated rows.
    #[must_use]
    pub const fn window(&self) -> Window {
        self.window
    }

    /// The validated row behind an insert or update.
    #[must_use]
    pub const fn changeset(&self) -> Option<&Changeset> {
        self.changeset.as_ref()
    }

    /// Field name of the key the statement's `RETURNING` clause yields.
    #[must_use]
    pub fn returning(&self) -> Option<&str> {
        self.returning.as_deref()
    }

    /// Field name of the statement table's primary key.
    #[must_use]
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Preload plan, for reads that preload associations.
    #[must_use]
    pub const fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Turns the rows the database returned into result rows: folds
    /// preloaded children into their parents, then applies the window.
    #[must_use]
    pub fn shape(&self, rows: Vec<Row>) -> Vec<Row> {
        let rows = match &self.plan {
            Some(plan) => plan.hydrate(rows),
            None => rows,
        };
        let mut rows = self.window.apply(rows);
        if self.single {
            rows.truncate(1);
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: i64) -> Vec<Row> {
        (1..=n).map(|i| Row::new().set("id", i)).collect()
    }

    fn compiled(window: Window, single: bool) -> Compiled {
        Compiled {
            kind: StatementKind::Select,
            sql: String::new(),
            params: vec![],
            debug_sql: String::new(),
            single,
            plan: None,
            window,
            changeset: None,
            returning: None,
            primary_key: None,
        }
    }

    #[test]
    fn test_shape_applies_window() {
        let c = compiled(
            Window {
                limit: Some(2),
                offset: Some(1),
            },
            false,
        );
        let ids: Vec<_> = c
            .shape(rows(5))
            .iter()
            .map(|r| r.get("id").cloned())
            .collect();
        assert_eq!(ids, vec![Some(SqlValue::Int(2)), Some(SqlValue::Int(3))]);
    }

    #[test]
    fn test_shape_offset_past_end() {
        let c = compiled(
            Window {
                limit: None,
                offset: Some(10),
            },
            false,
        );
        assert!(c.shape(rows(3)).is_empty());
    }

    #[test]
    fn test_shape_single_keeps_first() {
        let c = compiled(Window::default(), true);
        assert_eq!(c.shape(rows(3)).len(), 1);
        assert!(Window::default().is_unbounded());
    }
}
