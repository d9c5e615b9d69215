//! Two-track SQL output.

use crate::context::Context;
use crate::dialect::Dialect;
use crate::schema::Col;
use crate::value::SqlValue;

/// Accumulates a statement as parameterized SQL and, in lockstep, as debug
/// SQL with literals substituted for placeholders.
///
/// Everything except bound values is written to both tracks identically, so
/// the two only ever differ at parameter positions.
pub struct SqlWriter<'a> {
    ctx: &'a Context,
    sql: String,
    debug: String,
    params: Vec<SqlValue>,
}

impl<'a> SqlWriter<'a> {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            sql: String::new(),
            debug: String::new(),
            params: Vec::new(),
        }
    }

    /// The context the statement compiles under.
    #[must_use]
    pub const fn context(&self) -> &'a Context {
        self.ctx
    }

    /// The target dialect.
    #[must_use]
    pub fn dialect(&self) -> &'a dyn Dialect {
        self.ctx.dialect()
    }

    /// Appends raw SQL text.
    pub fn push(&mut self, text: &str) {
        self.sql.push_str(text);
        self.debug.push_str(text);
    }

    /// Appends a quoted identifier.
    pub fn ident(&mut self, name: &str) {
        let quoted = self.dialect().quote_identifier(name);
        self.push(&quoted);
    }

    /// Appends a qualified column reference.
    pub fn col(&mut self, col: &Col) {
        self.ident(col.qualifier());
        self.push(".");
        self.ident(col.column());
    }

    /// Binds a value: a placeholder on the SQL track, a literal on the debug
    /// track.
    pub fn bind(&mut self, value: SqlValue) {
        let literal = self.dialect().render_literal(&value);
        self.params.push(value);
        let placeholder = self.dialect().placeholder().render(self.params.len());
        self.sql.push_str(&placeholder);
        self.debug.push_str(&literal);
    }

    /// Appends `items` separated by `sep`, writing each with `each`.
    pub fn list<T, E>(
        &mut self,
        items: &[T],
        sep: &str,
        mut each: impl FnMut(&mut Self, &T) -> Result<(), E>,
    ) -> Result<(), E> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(sep);
            }
            each(self, item)?;
        }
        Ok(())
    }

    /// Returns `(sql, params, debug_sql)`.
    #[must_use]
    pub fn finish(self) -> (String, Vec<SqlValue>, String) {
        (self.sql, self.params, self.debug)
    }
}
