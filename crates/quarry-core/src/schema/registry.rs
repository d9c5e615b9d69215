//! Name → schema symbol table.

use std::sync::Arc;

use indexmap::IndexMap;

use super::Schema;
use crate::error::{Error, Result};

/// Every schema known to a [`Context`](crate::Context), keyed by name.
///
/// Deferred association targets are looked up here. Schemas are registered
/// once at startup and only read afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    schemas: IndexMap<String, Arc<Schema>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema and returns the shared handle to it.
    pub fn register(&mut self, schema: Schema) -> Result<Arc<Schema>> {
        self.register_arc(Arc::new(schema))
    }

    /// Registers an already shared schema.
    pub fn register_arc(&mut self, schema: Arc<Schema>) -> Result<Arc<Schema>> {
        let name = String::from(schema.name());
        if self.schemas.contains_key(&name) {
            return Err(Error::DuplicateSchema(name));
        }
        self.schemas.insert(name, Arc::clone(&schema));
        Ok(schema)
    }

    /// Looks a schema up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    /// Resolves every association of every registered schema.
    ///
    /// Calling this after registration surfaces dangling targets at startup
    /// rather than on first use.
    pub fn resolve_all(&self) -> Result<()> {
        for schema in self.schemas.values() {
            for association in schema.associations() {
                association.resolve(self)?;
            }
        }
        Ok(())
    }

    /// Iterates registered schemas in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }
}
