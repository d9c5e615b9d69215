//! Turning raw input rows into the rows that are persisted.
//!
//! The pipeline runs in a fixed order: defaults for absent fields (insert
//! only), casts for present fields, the nullability check, then the schema's
//! validation hook. The first failure stops it and names the field and
//! stage.

use crate::error::{Stage, ValidationError};
use crate::row::Row;
use crate::schema::{Field, Schema};
use crate::value::SqlValue;

/// Whether a row is being inserted or updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A new row. Absent fields get their defaults.
    Insert,
    /// An existing row. Absent fields are left untouched.
    Update,
}

/// A validated row, keyed by field name, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Changeset {
    action: Action,
    row: Row,
}

impl Changeset {
    /// Runs the pipeline for `input` against `schema`.
    ///
    /// Input keys may be field names or column names. Keys that name neither
    /// are ignored, as are nested association entries.
    pub fn new(schema: &Schema, input: &Row, action: Action) -> Result<Self, ValidationError> {
        let failure = |field: Option<&Field>, stage, message: String| ValidationError {
            schema: String::from(schema.name()),
            field: field.map(|f| String::from(f.name())),
            stage,
            message,
        };

        let mut row = Row::new();
        for field in schema.fields() {
            let given = input
                .get(field.name())
                .or_else(|| input.get(field.column_name()))
                .cloned();
            let value = match (given, action) {
                (Some(value), _) => value,
                (None, Action::Insert) => match field.default_spec() {
                    Some(default) => default.produce(),
                    None => continue,
                },
                (None, Action::Update) => continue,
            };
            let value = field
                .cast(value)
                .map_err(|message| failure(Some(field), Stage::Cast, message))?;
            row.insert(field.name(), value);
        }

        for field in schema.fields().filter(|f| !f.is_nullable()) {
            let missing = match row.get(field.name()) {
                Some(value) => value.is_null(),
                None => action == Action::Insert,
            };
            // An insert may leave the key to the database.
            if missing && !(action == Action::Insert && field.is_primary_key()) {
                return Err(failure(
                    Some(field),
                    Stage::Required,
                    String::from("cannot be null"),
                ));
            }
        }

        if action == Action::Insert {
            if let Some(pk) = schema.primary_key() {
                if row.get(pk.name()).is_some_and(SqlValue::is_empty_key) {
                    row.remove(pk.name());
                }
            }
        }

        if let Some(hook) = schema.validator() {
            row = hook(row, action).map_err(|message| failure(None, Stage::Hook, message))?;
        }

        Ok(Self { action, row })
    }

    /// Insert or update.
    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// The validated row.
    #[must_use]
    pub const fn row(&self) -> &Row {
        &self.row
    }

    /// Consumes the changeset.
    #[must_use]
    pub fn into_row(self) -> Row {
        self.row
    }

    /// Records a value produced by the database, such as a generated key.
    pub fn assign(&mut self, field: &str, value: SqlValue) {
        self.row.insert(field, value);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;
    use crate::schema::FieldType;

    fn users() -> Schema {
        Schema::builder("users")
            .field(Field::new("id", FieldType::Int).primary_key().nullable(false))
            .field(Field::new("name", FieldType::Text).nullable(false))
            .field(Field::new("nick", FieldType::Text).default_value("default name"))
            .field(Field::new("age", FieldType::Int).column("user_age"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_insert_fills_defaults_and_casts() {
        let input = Row::new().set("name", "Ann").set("user_age", "41").set("junk", 1);
        let cs = Changeset::new(&users(), &input, Action::Insert).unwrap();
        assert_eq!(
            cs.row().keys().collect::<Vec<_>>(),
            vec!["name", "nick", "age"]
        );
        assert_eq!(cs.row().get("age"), Some(&SqlValue::Int(41)));
        assert_eq!(
            cs.row().get("nick"),
            Some(&SqlValue::Text(String::from("default name")))
        );
    }

    #[test]
    fn test_update_skips_defaults() {
        let input = Row::new().set("id", 1).set("age", 3);
        let cs = Changeset::new(&users(), &input, Action::Update).unwrap();
        assert_eq!(cs.row().keys().collect::<Vec<_>>(), vec!["id", "age"]);
    }

    #[test]
    fn test_required_field() {
        let err = Changeset::new(&users(), &Row::new(), Action::Insert).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("name"));
        assert_eq!(err.stage, Stage::Required);

        let input = Row::new().set("id", 1).set("name", SqlValue::Null);
        let err = Changeset::new(&users(), &input, Action::Update).unwrap_err();
        assert_eq!(err.stage, Stage::Required);
    }

    #[test]
    fn test_cast_failure_names_field() {
        let input = Row::new().set("name", "Ann").set("age", "old");
        let err = Changeset::new(&users(), &input, Action::Insert).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("age"));
        assert_eq!(err.stage, Stage::Cast);
    }

    #[test]
    fn test_empty_primary_key_left_to_database() {
        let input = Row::new().set("id", SqlValue::Null).set("name", "Ann");
        let cs = Changeset::new(&users(), &input, Action::Insert).unwrap();
        assert!(!cs.row().contains("id"));
    }

    #[test]
    fn test_factory_runs_per_changeset() {
        let counter = Arc::new(AtomicI64::new(100));
        let c = Arc::clone(&counter);
        let schema = Schema::builder("events")
            .field(
                Field::new("seq", FieldType::Int)
                    .default_with(move || SqlValue::Int(c.fetch_add(1, Ordering::SeqCst))),
            )
            .build()
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 100);
        let a = Changeset::new(&schema, &Row::new(), Action::Insert).unwrap();
        let b = Changeset::new(&schema, &Row::new(), Action::Insert).unwrap();
        assert_eq!(a.row().get("seq"), Some(&SqlValue::Int(100)));
        assert_eq!(b.row().get("seq"), Some(&SqlValue::Int(101)));
    }

    #[test]
    fn test_hook_can_rewrite_or_reject() {
        let schema = Schema::builder("tags")
            .field(Field::new("label", FieldType::Text))
            .validator(|row, action| {
                let label = row.get("label").and_then(SqlValue::as_str).unwrap_or("");
                if label.is_empty() {
                    return Err(String::from("label must not be blank"));
                }
                let mut row = row.clone();
                if action == Action::Insert {
                    row.insert("label", SqlValue::Text(label.to_lowercase()));
                }
                Ok(row)
            })
            .build()
            .unwrap();

        let cs = Changeset::new(&schema, &Row::new().set("label", "RUST"), Action::Insert).unwrap();
        assert_eq!(cs.row().get("label").and_then(SqlValue::as_str), Some("rust"));

        let err = Changeset::new(&schema, &Row::new().set("label", ""), Action::Insert).unwrap_err();
        assert_eq!(err.stage, Stage::Hook);
        assert_eq!(err.field, None);
        assert_eq!(err.message, "label must not be blank");
    }

    #[test]
    fn test_schema_without_primary_key() {
        let schema = Schema::builder("logs")
            .field(Field::new("line", FieldType::Text))
            .build()
            .unwrap();
        let cs = Changeset::new(&schema, &Row::new().set("line", "x"), Action::Insert).unwrap();
        assert_eq!(cs.row().len(), 1);
    }
}
