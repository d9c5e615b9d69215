//! Ordered, string-keyed rows.
//!
//! The same shape is used for input rows, changesets and hydrated results.
//! Nested association data lives under the association's declared name as
//! [`Entry::One`] or [`Entry::Many`].

use indexmap::IndexMap;

use crate::value::{SqlValue, ToSqlValue};

/// One slot in a [`Row`].
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A scalar column value.
    Value(SqlValue),
    /// A has-one association: the nested row, or `None` when nothing matched.
    One(Option<Row>),
    /// A has-many association: nested rows in first-seen order.
    Many(Vec<Row>),
}

impl Entry {
    /// Returns the scalar value, if this entry is one.
    #[must_use]
    pub const fn as_value(&self) -> Option<&SqlValue> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// An insertion-ordered mapping of names to entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    entries: IndexMap<String, Entry>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style scalar insert.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl ToSqlValue) -> Self {
        self.insert(name, value.to_sql_value());
        self
    }

    /// Builder-style has-one insert.
    #[must_use]
    pub fn one(mut self, name: impl Into<String>, row: Option<Self>) -> Self {
        self.entries.insert(name.into(), Entry::One(row));
        self
    }

    /// Builder-style has-many insert.
    #[must_use]
    pub fn many(mut self, name: impl Into<String>, rows: Vec<Self>) -> Self {
        self.entries.insert(name.into(), Entry::Many(rows));
        self
    }

    /// Inserts or replaces a scalar, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: SqlValue) {
        self.entries.insert(name.into(), Entry::Value(value));
    }

    /// Inserts or replaces an arbitrary entry.
    pub fn insert_entry(&mut self, name: impl Into<String>, entry: Entry) {
        self.entries.insert(name.into(), entry);
    }

    /// Removes an entry, preserving the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        self.entries.shift_remove(name)
    }

    /// Returns the entry stored under `name`.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Returns the scalar stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.entries.get(name).and_then(Entry::as_value)
    }

    /// Returns the nested has-one row stored under `name`.
    #[must_use]
    pub fn get_one(&self, name: &str) -> Option<&Self> {
        match self.entries.get(name) {
            Some(Entry::One(row)) => row.as_ref(),
            _ => None,
        }
    }

    /// Returns the nested has-many rows stored under `name`.
    #[must_use]
    pub fn get_many(&self, name: &str) -> Option<&[Self]> {
        match self.entries.get(name) {
            Some(Entry::Many(rows)) => Some(rows),
            _ => None,
        }
    }

    /// Returns `true` if a non-null scalar is stored under `name`.
    #[must_use]
    pub fn has_value(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_null())
    }

    /// Returns `true` if the row has an entry named `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the row has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entry names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates the scalar entries in order, skipping nested ones.
    pub fn values(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_value().map(|v| (k.as_str(), v)))
    }
}

impl IntoIterator for Row {
    type Item = (String, Entry);
    type IntoIter = indexmap::map::IntoIter<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, SqlValue)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_preserves_insertion_order() {
        let row = Row::new().set("b", 1).set("a", 2).set("c", 3);
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_row_replace_keeps_position() {
        let row = Row::new().set("a", 1).set("b", 2).set("a", 9);
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("a"), Some(&SqlValue::Int(9)));
    }

    #[test]
    fn test_nested_entries() {
        let row = Row::new()
            .set("name", "Org")
            .one("admin", None)
            .many("users", vec![Row::new().set("name", "A")]);

        assert!(row.get_one("admin").is_none());
        assert_eq!(row.get_many("users").map(<[Row]>::len), Some(1));
        assert_eq!(row.values().count(), 1);
        assert!(row.get("users").is_none());
    }

    #[test]
    fn test_has_value_ignores_null() {
        let row = Row::new().set("a", SqlValue::Null).set("b", 0);
        assert!(!row.has_value("a"));
        assert!(row.has_value("b"));
        assert!(!row.has_value("missing"));
    }
}
