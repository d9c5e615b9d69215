//! Caller-registered raw SQL operators and functions.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use super::Expr;
use crate::error::{Error, Result};
use crate::writer::SqlWriter;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(\d+)\}").expect("valid template placeholder regex"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Arg(usize),
}

/// A raw SQL fragment with `{0}`, `{1}`, ... argument slots.
///
/// ```
/// use quarry_core::expr::Template;
///
/// let json_has = Template::new("json_extract({0}, {1}) IS NOT NULL");
/// assert_eq!(json_has.arity(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    pieces: Vec<Piece>,
}

impl Template {
    /// Parses a template.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut pieces = vec![];
        let mut last = 0;
        for caps in placeholder_regex().captures_iter(&source) {
            let Some(whole) = caps.get(0) else { continue };
            // Indices too large for usize can never be satisfied; keep them as text.
            let Some(index) = caps.get(1).and_then(|m| m.as_str().parse().ok()) else {
                continue;
            };
            if whole.start() > last {
                pieces.push(Piece::Text(source[last..whole.start()].to_string()));
            }
            pieces.push(Piece::Arg(index));
            last = whole.end();
        }
        if last < source.len() {
            pieces.push(Piece::Text(source[last..].to_string()));
        }
        Self { source, pieces }
    }

    /// The template text as registered.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of arguments the template reads (highest slot + 1).
    #[must_use]
    pub fn arity(&self) -> usize {
        self.pieces
            .iter()
            .filter_map(|p| match p {
                Piece::Arg(i) => Some(i + 1),
                Piece::Text(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn write(&self, name: &str, args: &[Expr], w: &mut SqlWriter<'_>) -> Result<()> {
        let arity = self.arity();
        if arity > args.len() {
            return Err(Error::ExtensionArity {
                name: String::from(name),
                index: arity - 1,
                given: args.len(),
            });
        }
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => w.push(text),
                Piece::Arg(i) => args[*i].write_operand(w)?,
            }
        }
        Ok(())
    }
}

/// Named templates available to [`func::call`](super::func::call).
#[derive(Debug, Default, Clone)]
pub struct Extensions {
    templates: HashMap<String, Arc<Template>>,
}

impl Extensions {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a named template.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.register(name, template);
        self
    }

    /// Registers (or replaces) a named template in place.
    pub fn register(&mut self, name: impl Into<String>, template: impl Into<String>) {
        self.templates
            .insert(name.into(), Arc::new(Template::new(template)));
    }

    /// Looks a template up.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Template>> {
        self.templates.get(name)
    }

    pub(crate) fn write_call(&self, name: &str, args: &[Expr], w: &mut SqlWriter<'_>) -> Result<()> {
        let template = self
            .get(name)
            .ok_or_else(|| Error::UnknownExtension(String::from(name)))?;
        template.write(name, args, w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pieces() {
        let t = Template::new("{0} @> {1}::jsonb");
        assert_eq!(
            t.pieces,
            vec![
                Piece::Arg(0),
                Piece::Text(String::from(" @> ")),
                Piece::Arg(1),
                Piece::Text(String::from("::jsonb")),
            ]
        );
        assert_eq!(t.arity(), 2);
    }

    #[test]
    fn test_repeated_and_constant_templates() {
        assert_eq!(Template::new("{0} = {0}").arity(), 1);
        assert_eq!(Template::new("RANDOM()").arity(), 0);
    }
}
