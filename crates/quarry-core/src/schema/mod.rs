//! Table metadata.
//!
//! A [`Schema`] is built once at startup with [`SchemaBuilder`] and then
//! shared read-only behind an `Arc`. Fields are looked up by name and
//! turned into [`Col`] handles for use in expressions.

mod association;
mod field;
mod registry;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

pub use association::{Association, AssociationKind, Target};
pub use field::{Caster, DATETIME_FORMAT, Field, FieldDefault, FieldType};
pub use registry::Registry;

use crate::changeset::Action;
use crate::error::{Error, Result};
use crate::row::Row;

/// Caller-supplied row validation, run after defaults and casts.
///
/// Returning `Err` rejects the row with the given reason.
pub type Validator = Arc<dyn Fn(Row, Action) -> std::result::Result<Row, String> + Send + Sync>;

/// A typed reference to one column of one table (or table alias).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Col {
    qualifier: String,
    column: String,
    field: String,
}

impl Col {
    /// Creates a column reference.
    #[must_use]
    pub fn new(
        qualifier: impl Into<String>,
        column: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            qualifier: qualifier.into(),
            column: column.into(),
            field: field.into(),
        }
    }

    /// Rebinds the column to another qualifier, e.g. a join alias.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    /// Table name or alias.
    #[must_use]
    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    /// Database column name.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Logical field name; selected columns come back under this key.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }
}

/// A table mapping.
pub struct Schema {
    name: String,
    table: String,
    fields: IndexMap<String, Field>,
    primary_key: Option<String>,
    wildcard_select: bool,
    associations: IndexMap<String, Association>,
    validator: Option<Validator>,
}

impl Schema {
    /// Starts declaring a schema. The table name defaults to `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Registry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Looks a field up by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Looks a field up by name, falling back to its column name.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&Field> {
        self.fields
            .get(key)
            .or_else(|| self.fields.values().find(|f| f.column_name() == key))
    }

    /// Like [`field`](Self::field), but unknown names are an error.
    pub fn require_field(&self, name: &str) -> Result<&Field> {
        self.field(name).ok_or_else(|| Error::UnknownField {
            schema: self.name.clone(),
            field: String::from(name),
        })
    }

    /// The primary key, when one is declared.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Field> {
        self.primary_key
            .as_deref()
            .and_then(|name| self.fields.get(name))
    }

    /// Whether the schema can be fetched without naming fields.
    #[must_use]
    pub const fn allows_wildcard(&self) -> bool {
        self.wildcard_select
    }

    /// Fails when the schema forbids wildcard fetches.
    pub fn check_wildcard(&self) -> Result<()> {
        if self.wildcard_select {
            Ok(())
        } else {
            Err(Error::WildcardSelect(self.name.clone()))
        }
    }

    /// Associations in declaration order.
    pub fn associations(&self) -> impl Iterator<Item = &Association> {
        self.associations.values()
    }

    /// Looks an association up by name.
    pub fn association(&self, name: &str) -> Result<&Association> {
        self.associations
            .get(name)
            .ok_or_else(|| Error::UnknownAssociation {
                schema: self.name.clone(),
                association: String::from(name),
            })
    }

    /// Returns `true` if `name` is a declared association.
    #[must_use]
    pub fn has_association(&self, name: &str) -> bool {
        self.associations.contains_key(name)
    }

    /// The validation hook.
    #[must_use]
    pub const fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    /// A column handle qualified by the table name.
    pub fn col(&self, field: &str) -> Result<Col> {
        let f = self.require_field(field)?;
        Ok(Col::new(&self.table, f.column_name(), f.name()))
    }

    /// Column handles for every field, in declaration order.
    #[must_use]
    pub fn cols(&self) -> Vec<Col> {
        self.fields
            .values()
            .map(|f| Col::new(&self.table, f.column_name(), f.name()))
            .collect()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("fields", &self.fields)
            .field("primary_key", &self.primary_key)
            .field("wildcard_select", &self.wildcard_select)
            .field("associations", &self.associations.keys().collect::<Vec<_>>())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

type PendingAssociation = (String, AssociationKind, Target, [String; 2]);

/// Declares a [`Schema`].
pub struct SchemaBuilder {
    name: String,
    table: Option<String>,
    fields: Vec<Field>,
    wildcard_select: bool,
    associations: Vec<PendingAssociation>,
    validator: Option<Validator>,
}

impl SchemaBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: vec![],
            wildcard_select: true,
            associations: vec![],
            validator: None,
        }
    }

    /// Sets the table name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Allows or forbids fetching the schema without naming fields.
    #[must_use]
    pub const fn wildcard_select(mut self, allowed: bool) -> Self {
        self.wildcard_select = allowed;
        self
    }

    /// Declares a has-one association joined on `[local_key, foreign_key]`.
    #[must_use]
    pub fn has_one(self, name: impl Into<String>, target: impl Into<Target>, on: [&str; 2]) -> Self {
        self.associate(name.into(), AssociationKind::HasOne, target.into(), on)
    }

    /// Declares a has-many association joined on `[local_key, foreign_key]`.
    #[must_use]
    pub fn has_many(
        self,
        name: impl Into<String>,
        target: impl Into<Target>,
        on: [&str; 2],
    ) -> Self {
        self.associate(name.into(), AssociationKind::HasMany, target.into(), on)
    }

    fn associate(
        mut self,
        name: String,
        kind: AssociationKind,
        target: Target,
        [local, foreign]: [&str; 2],
    ) -> Self {
        self.associations.push((
            name,
            kind,
            target,
            [String::from(local), String::from(foreign)],
        ));
        self
    }

    /// Installs the validation hook.
    #[must_use]
    pub fn validator<F>(mut self, hook: F) -> Self
    where
        F: Fn(Row, Action) -> std::result::Result<Row, String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(hook));
        self
    }

    /// Checks the declaration and builds the schema.
    pub fn build(self) -> Result<Schema> {
        let mut fields = IndexMap::new();
        let mut columns = HashSet::new();
        let mut primary_key = None;

        for field in self.fields {
            if !columns.insert(String::from(field.column_name()))
                || fields.contains_key(field.name())
            {
                return Err(Error::DuplicateColumn {
                    schema: self.name,
                    column: String::from(field.column_name()),
                });
            }
            if field.is_primary_key() {
                if primary_key.is_some() {
                    return Err(Error::MultiplePrimaryKeys(self.name));
                }
                primary_key = Some(String::from(field.name()));
            }
            fields.insert(String::from(field.name()), field);
        }
        // Input keys fall back from field name to column name, so a column
        // may not shadow another field's name.
        if let Some(field) = fields
            .values()
            .find(|f| f.column_name() != f.name() && fields.contains_key(f.column_name()))
        {
            return Err(Error::DuplicateColumn {
                schema: self.name,
                column: String::from(field.column_name()),
            });
        }

        let mut associations = IndexMap::new();
        for (name, kind, target, [local, foreign]) in self.associations {
            if !fields.contains_key(&local) {
                return Err(Error::UnknownField {
                    schema: self.name,
                    field: local,
                });
            }
            if fields.contains_key(&name) || associations.contains_key(&name) {
                return Err(Error::DuplicateColumn {
                    schema: self.name,
                    column: name,
                });
            }
            let association =
                Association::new(&self.name, name.clone(), kind, target, [local, foreign]);
            associations.insert(name, association);
        }

        Ok(Schema {
            table: self.table.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            fields,
            primary_key,
            wildcard_select: self.wildcard_select,
            associations,
            validator: self.validator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Schema {
        Schema::builder("users")
            .field(Field::new("id", FieldType::Int).primary_key())
            .field(Field::new("name", FieldType::Text).nullable(false))
            .field(Field::new("org_id", FieldType::Int).column("organisation_id"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_and_lookup() {
        let schema = users();
        assert_eq!(schema.table(), "users");
        assert_eq!(schema.primary_key().map(Field::name), Some("id"));
        assert_eq!(schema.lookup("organisation_id").map(Field::name), Some("org_id"));
        assert_eq!(schema.lookup("org_id").map(Field::name), Some("org_id"));
        assert!(schema.lookup("nope").is_none());

        let col = schema.col("org_id").unwrap();
        assert_eq!(col.qualifier(), "users");
        assert_eq!(col.column(), "organisation_id");
        assert_eq!(col.field(), "org_id");
    }

    #[test]
    fn test_unknown_field_handle() {
        let err = users().col("email").unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "email"));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let err = Schema::builder("t")
            .field(Field::new("a", FieldType::Int))
            .field(Field::new("b", FieldType::Int).column("a"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn { ref column, .. } if column == "a"));
    }

    #[test]
    fn test_multiple_primary_keys_rejected() {
        let err = Schema::builder("t")
            .field(Field::new("a", FieldType::Int).primary_key())
            .field(Field::new("b", FieldType::Int).primary_key())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MultiplePrimaryKeys(_)));
    }

    #[test]
    fn test_column_shadowing_field_name_rejected() {
        let err = Schema::builder("t")
            .field(Field::new("a", FieldType::Int).column("x"))
            .field(Field::new("b", FieldType::Int).column("a"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn { ref column, .. } if column == "a"));

        // Declaration order does not matter.
        let err = Schema::builder("t")
            .field(Field::new("b", FieldType::Int).column("a"))
            .field(Field::new("a", FieldType::Int).column("x"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn { ref column, .. } if column == "a"));

        // Swapped names and columns stay ambiguous too.
        let err = Schema::builder("t")
            .field(Field::new("a", FieldType::Int).column("b"))
            .field(Field::new("b", FieldType::Int).column("a"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn { .. }));
    }

    #[test]
    fn test_association_local_key_must_exist() {
        let err = Schema::builder("orgs")
            .field(Field::new("id", FieldType::Int))
            .has_many("users", "users", ["uid", "org_id"])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "uid"));
    }

    #[test]
    fn test_wildcard_policy() {
        let schema = Schema::builder("secrets")
            .field(Field::new("id", FieldType::Int))
            .wildcard_select(false)
            .build()
            .unwrap();
        assert!(!schema.allows_wildcard());
        assert!(matches!(schema.check_wildcard(), Err(Error::WildcardSelect(ref s)) if s == "secrets"));
        assert!(users().check_wildcard().is_ok());
    }

    #[test]
    fn test_deferred_association_resolves_once() {
        let mut registry = Registry::new();
        let orgs = registry
            .register(
                Schema::builder("orgs")
                    .field(Field::new("id", FieldType::Int).primary_key())
                    .has_many("users", "users", ["id", "org_id"])
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let association = orgs.association("users").unwrap();
        let err = association.resolve(&registry).unwrap_err();
        assert!(matches!(err, Error::UnresolvedAssociation { ref target, .. } if target == "users"));

        let users = registry.register(users()).unwrap();
        let first = association.resolve(&registry).unwrap();
        let second = association.resolve(&registry).unwrap();
        assert!(Arc::ptr_eq(&first, &users));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.resolve_all().is_ok());
    }

    #[test]
    fn test_concurrent_resolution_yields_same_schema() {
        let mut registry = Registry::new();
        registry.register(users()).unwrap();
        let orgs = registry
            .register(
                Schema::builder("orgs")
                    .field(Field::new("id", FieldType::Int).primary_key())
                    .has_one("admin", "users", ["id", "org_id"])
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let registry = &registry;
        let association = orgs.association("admin").unwrap();
        let resolved: Vec<Arc<Schema>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(move || association.resolve(registry).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(resolved.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_unknown_foreign_key_on_resolution() {
        let target = Arc::new(users());
        let orgs = Schema::builder("orgs")
            .field(Field::new("id", FieldType::Int))
            .has_many("users", &target, ["id", "company_id"])
            .build()
            .unwrap();
        let err = orgs
            .association("users")
            .unwrap()
            .resolve(&Registry::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "company_id"));
    }

    #[test]
    fn test_duplicate_schema_registration() {
        let mut registry = Registry::new();
        registry.register(users()).unwrap();
        assert!(matches!(
            registry.register(users()),
            Err(Error::DuplicateSchema(ref n)) if n == "users"
        ));
    }
}
