//! Read-side hydration of associations.
//!
//! A [`Preload`] names an association and, optionally, the fields to fetch
//! and nested preloads. Planning turns the specs into `LEFT JOIN`s with one
//! alias per association path (`_users`, `_users__posts`, ...) and child
//! columns selected as `path__field`. Hydration then folds the flat, fanned
//! out result rows back into one row per parent.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::builder::{Join, JoinKind};
use crate::error::Result;
use crate::row::{Entry, Row};
use crate::schema::{AssociationKind, Col, Field, Registry, Schema};
use crate::value::SqlValue;

/// What to load for one association.
///
/// Every level must be requested explicitly; nothing is loaded
/// transitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preload {
    association: String,
    fields: Option<Vec<String>>,
    nested: Vec<Preload>,
}

impl Preload {
    /// Loads every field of the associated schema.
    ///
    /// Fails at compile time if that schema forbids wildcard selects.
    #[must_use]
    pub fn all(association: impl Into<String>) -> Self {
        Self {
            association: association.into(),
            fields: None,
            nested: vec![],
        }
    }

    /// Loads the named fields of the associated schema.
    #[must_use]
    pub fn fields<I>(association: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            association: association.into(),
            fields: Some(fields.into_iter().map(Into::into).collect()),
            nested: vec![],
        }
    }

    /// Adds a nested preload on the associated schema.
    #[must_use]
    pub fn with(mut self, nested: Self) -> Self {
        self.nested.push(nested);
        self
    }

    /// Association name.
    #[must_use]
    pub fn association(&self) -> &str {
        &self.association
    }
}

/// One planned association level.
#[derive(Debug, Clone)]
struct Node {
    name: String,
    kind: AssociationKind,
    /// Result key of the child primary key, used to tell children apart.
    key: Option<String>,
    /// `(result key, field name)` of the requested fields.
    fields: Vec<(String, String)>,
    children: Vec<Node>,
}

/// The joins, extra projection and folding instructions for a read with
/// preloads.
#[derive(Debug, Clone)]
pub struct Plan {
    root_key: Option<String>,
    strip_root_key: bool,
    joins: Vec<Join>,
    projection: Vec<(Col, String)>,
    nodes: Vec<Node>,
    claimed: HashSet<String>,
}

impl Plan {
    /// Plans `preloads` on `root`.
    ///
    /// `has_root_key` says whether the caller's projection already returns
    /// the root primary key under its field name; if not, it is added and
    /// stripped again after hydration.
    pub(crate) fn new(
        root: &Arc<Schema>,
        has_root_key: bool,
        preloads: &[Preload],
        registry: &Registry,
    ) -> Result<Self> {
        let mut plan = Self {
            root_key: None,
            strip_root_key: false,
            joins: vec![],
            projection: vec![],
            nodes: vec![],
            claimed: HashSet::new(),
        };

        if let Some(pk) = root.primary_key() {
            plan.root_key = Some(String::from(pk.name()));
            if !has_root_key {
                plan.strip_root_key = true;
                plan.projection.push((
                    Col::new(root.table(), pk.column_name(), pk.name()),
                    String::from(pk.name()),
                ));
            }
        }

        for spec in preloads {
            let node = plan.plan_node(root, root.table(), "", spec, registry)?;
            plan.nodes.push(node);
        }
        Ok(plan)
    }

    fn plan_node(
        &mut self,
        parent: &Schema,
        parent_alias: &str,
        parent_path: &str,
        spec: &Preload,
        registry: &Registry,
    ) -> Result<Node> {
        let association = parent.association(&spec.association)?;
        let target = association.resolve(registry)?;

        let path = if parent_path.is_empty() {
            spec.association.clone()
        } else {
            format!("{parent_path}__{}", spec.association)
        };
        let alias = format!("_{path}");

        let local = parent.require_field(association.local_key())?;
        let foreign = target.require_field(association.foreign_key())?;
        self.joins.push(Join::aliased(
            JoinKind::Left,
            target.table(),
            &alias,
            [
                Col::new(parent_alias, local.column_name(), local.name()),
                Col::new(&alias, foreign.column_name(), foreign.name()),
            ],
        ));

        let selected: Vec<&Field> = match &spec.fields {
            None => {
                target.check_wildcard()?;
                target.fields().collect()
            }
            Some(names) => names
                .iter()
                .map(|name| target.require_field(name))
                .collect::<Result<_>>()?,
        };

        let mut fields = vec![];
        for field in selected {
            let key = format!("{path}__{}", field.name());
            self.select(Col::new(&alias, field.column_name(), field.name()), &key);
            fields.push((key, String::from(field.name())));
        }

        let key = target.primary_key().map(|pk| {
            let key = format!("{path}__{}", pk.name());
            if !fields.iter().any(|(k, _)| *k == key) {
                self.select(Col::new(&alias, pk.column_name(), pk.name()), &key);
            }
            key
        });

        let mut children = vec![];
        for nested in &spec.nested {
            children.push(self.plan_node(&target, &alias, &path, nested, registry)?);
        }

        Ok(Node {
            name: spec.association.clone(),
            kind: association.kind(),
            key,
            fields,
            children,
        })
    }

    fn select(&mut self, col: Col, key: &str) {
        self.claimed.insert(String::from(key));
        self.projection.push((col, String::from(key)));
    }

    /// `LEFT JOIN`s, in planning order.
    pub(crate) fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Columns appended to the caller's projection, with their result keys.
    pub(crate) fn projection(&self) -> &[(Col, String)] {
        &self.projection
    }

    /// Folds flat joined rows into one nested row per parent, in first-seen
    /// parent order.
    #[must_use]
    pub fn hydrate(&self, rows: Vec<Row>) -> Vec<Row> {
        let mut parents: IndexMap<String, Group> = IndexMap::new();

        for row in rows {
            let identity = match &self.root_key {
                Some(key) => identity_of(row.get(key).into_iter()),
                None => identity_of(
                    row.values()
                        .filter(|(k, _)| !self.claimed.contains(*k))
                        .map(|(_, v)| v),
                ),
            };
            let group = parents.entry(identity).or_insert_with(|| {
                let mut parent = Row::new();
                for (key, value) in row.values() {
                    let stripped = self.strip_root_key && self.root_key.as_deref() == Some(key);
                    if !stripped && !self.claimed.contains(key) {
                        parent.insert(key, value.clone());
                    }
                }
                Group::new(parent, &self.nodes)
            });
            absorb(&self.nodes, &mut group.children, &row);
        }

        parents
            .into_values()
            .map(|group| group.finish(&self.nodes))
            .collect()
    }
}

fn identity_of<'v>(values: impl Iterator<Item = &'v SqlValue>) -> String {
    values
        .map(SqlValue::to_sql_inline)
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

/// A hydrated row under construction plus the children collected for it.
struct Group {
    row: Row,
    children: Vec<IndexMap<String, Group>>,
}

impl Group {
    fn new(row: Row, nodes: &[Node]) -> Self {
        Self {
            row,
            children: nodes.iter().map(|_| IndexMap::new()).collect(),
        }
    }

    fn finish(self, nodes: &[Node]) -> Row {
        let mut row = self.row;
        for (node, items) in nodes.iter().zip(self.children) {
            let mut items = items.into_values().map(|g| g.finish(&node.children));
            let entry = match node.kind {
                AssociationKind::HasOne => Entry::One(items.next()),
                AssociationKind::HasMany => Entry::Many(items.collect()),
            };
            row.insert_entry(node.name.clone(), entry);
        }
        row
    }
}

fn absorb(nodes: &[Node], accs: &mut [IndexMap<String, Group>], row: &Row) {
    for (node, acc) in nodes.iter().zip(accs.iter_mut()) {
        let is_null = |key: &String| row.get(key).map_or(true, SqlValue::is_null);
        // LEFT JOIN with no match: every child column is NULL.
        if node.fields.iter().all(|(k, _)| is_null(k)) && node.key.as_ref().map_or(true, is_null) {
            continue;
        }

        let identity = match &node.key {
            Some(key) => identity_of(row.get(key).into_iter()),
            None => identity_of(node.fields.iter().filter_map(|(k, _)| row.get(k))),
        };
        let child = acc.entry(identity).or_insert_with(|| {
            let mut child = Row::new();
            for (key, field) in &node.fields {
                child.insert(field.clone(), row.get(key).cloned().unwrap_or(SqlValue::Null));
            }
            Group::new(child, &node.children)
        });
        absorb(&node.children, &mut child.children, row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, Target};

    fn registry() -> (Registry, Arc<Schema>) {
        let mut registry = Registry::new();
        registry
            .register(
                Schema::builder("users")
                    .field(Field::new("id", FieldType::Int).primary_key())
                    .field(Field::new("name", FieldType::Text))
                    .field(Field::new("org_id", FieldType::Int))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let orgs = registry
            .register(
                Schema::builder("orgs")
                    .field(Field::new("id", FieldType::Int).primary_key())
                    .field(Field::new("name", FieldType::Text))
                    .field(Field::new("admin_id", FieldType::Int))
                    .has_many("users", Target::from("users"), ["id", "org_id"])
                    .has_one("admin", Target::from("users"), ["admin_id", "id"])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        (registry, orgs)
    }

    fn flat(org: (i64, &str), user: Option<(i64, &str)>) -> Row {
        let row = Row::new().set("id", org.0).set("name", org.1);
        match user {
            Some((id, name)) => row.set("users__id", id).set("users__name", name),
            None => row
                .set("users__id", SqlValue::Null)
                .set("users__name", SqlValue::Null),
        }
    }

    #[test]
    fn test_plan_aliases_and_keys() {
        let (registry, orgs) = registry();
        let plan = Plan::new(&orgs, true, &[Preload::fields("users", ["name"])], &registry).unwrap();

        let keys: Vec<&str> = plan.projection().iter().map(|(_, k)| k.as_str()).collect();
        assert_eq!(keys, vec!["users__name", "users__id"]);
        assert_eq!(plan.joins().len(), 1);
        assert_eq!(plan.joins()[0].alias(), Some("_users"));
    }

    #[test]
    fn test_has_many_dedup_first_seen_order() {
        let (registry, orgs) = registry();
        let plan = Plan::new(&orgs, true, &[Preload::fields("users", ["id", "name"])], &registry).unwrap();

        let rows = vec![
            flat((2, "B"), Some((7, "g"))),
            flat((1, "A"), Some((5, "e"))),
            flat((2, "B"), Some((3, "c"))),
            flat((1, "A"), Some((5, "e"))),
            flat((3, "C"), None),
        ];
        let out = plan.hydrate(rows);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].get("id"), Some(&SqlValue::Int(2)));
        let names = |row: &Row| -> Vec<String> {
            row.get_many("users")
                .unwrap()
                .iter()
                .map(|u| u.get("name").and_then(SqlValue::as_str).unwrap().to_string())
                .collect()
        };
        assert_eq!(names(&out[0]), vec!["g", "c"]);
        assert_eq!(names(&out[1]), vec!["e"]);
        assert!(names(&out[2]).is_empty());
        assert!(!out[0].contains("users__id"));
    }

    #[test]
    fn test_has_one_without_match_is_none() {
        let (registry, orgs) = registry();
        let plan = Plan::new(&orgs, false, &[Preload::fields("admin", ["name"])], &registry).unwrap();
        let rows = vec![Row::new()
            .set("name", "A")
            .set("id", 1)
            .set("admin__name", SqlValue::Null)
            .set("admin__id", SqlValue::Null)];
        let out = plan.hydrate(rows);
        assert_eq!(out.len(), 1);
        assert!(out[0].get_one("admin").is_none());
        assert!(matches!(out[0].entry("admin"), Some(Entry::One(None))));
        // The root key was only fetched for grouping.
        assert!(!out[0].contains("id"));
    }

    #[test]
    fn test_wildcard_forbidden_child() {
        let mut registry = Registry::new();
        registry
            .register(
                Schema::builder("secrets")
                    .field(Field::new("id", FieldType::Int).primary_key())
                    .field(Field::new("owner_id", FieldType::Int))
                    .wildcard_select(false)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let owners = registry
            .register(
                Schema::builder("owners")
                    .field(Field::new("id", FieldType::Int).primary_key())
                    .has_many("secrets", "secrets", ["id", "owner_id"])
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let err = Plan::new(&owners, true, &[Preload::all("secrets")], &registry).unwrap_err();
        assert!(matches!(err, crate::Error::WildcardSelect(ref s) if s == "secrets"));
        assert!(Plan::new(&owners, true, &[Preload::fields("secrets", ["id"])], &registry).is_ok());
    }
}
