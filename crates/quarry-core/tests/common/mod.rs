#![allow(dead_code)]

use std::sync::Arc;

use quarry_core::dialect::Dialect;
use quarry_core::{Context, Field, FieldType, Registry, Row, Schema, SqlValue};

/// Organisations, users, profiles and posts, declared parent-first so the
/// associations resolve by name.
pub struct Blog {
    pub registry: Arc<Registry>,
    pub orgs: Arc<Schema>,
    pub users: Arc<Schema>,
    pub profiles: Arc<Schema>,
    pub posts: Arc<Schema>,
}

pub fn blog() -> Blog {
    let mut registry = Registry::new();
    let orgs = registry
        .register(
            Schema::builder("orgs")
                .field(Field::new("id", FieldType::Int).primary_key())
                .field(Field::new("name", FieldType::Text).nullable(false))
                .has_many("users", "users", ["id", "org_id"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let users = registry
        .register(
            Schema::builder("users")
                .field(Field::new("id", FieldType::Int).primary_key())
                .field(Field::new("name", FieldType::Text).nullable(false))
                .field(Field::new("org_id", FieldType::Int))
                .has_one("profile", "profiles", ["id", "user_id"])
                .has_many("posts", "posts", ["id", "author_id"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let profiles = registry
        .register(
            Schema::builder("profiles")
                .field(Field::new("id", FieldType::Int).primary_key())
                .field(Field::new("user_id", FieldType::Int))
                .field(Field::new("bio", FieldType::Text))
                .build()
                .unwrap(),
        )
        .unwrap();
    let posts = registry
        .register(
            Schema::builder("posts")
                .field(Field::new("id", FieldType::Int).primary_key())
                .field(Field::new("author_id", FieldType::Int).column("user_id"))
                .field(Field::new("title", FieldType::Text))
                .wildcard_select(false)
                .build()
                .unwrap(),
        )
        .unwrap();
    Blog {
        registry: Arc::new(registry),
        orgs,
        users,
        profiles,
        posts,
    }
}

pub fn ctx(blog: &Blog, dialect: impl Dialect + 'static) -> Context {
    Context::new(dialect).with_registry(Arc::clone(&blog.registry))
}

/// Builds a flat result row from `(key, value)` pairs.
pub fn flat(pairs: &[(&str, SqlValue)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (String::from(*k), v.clone()))
        .collect()
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(String::from(s))
}
