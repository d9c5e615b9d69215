//! Has-one / has-many links between schemas.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::{Registry, Schema};
use crate::error::{Error, Result};

/// Cardinality of an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// At most one associated row.
    HasOne,
    /// Zero or more associated rows.
    HasMany,
}

/// Where an association points.
#[derive(Debug, Clone)]
pub enum Target {
    /// A schema that already exists.
    Schema(Arc<Schema>),
    /// A schema looked up by name in the [`Registry`] on first use.
    Named(String),
}

impl From<&Arc<Schema>> for Target {
    fn from(schema: &Arc<Schema>) -> Self {
        Self::Schema(Arc::clone(schema))
    }
}

impl From<Arc<Schema>> for Target {
    fn from(schema: Arc<Schema>) -> Self {
        Self::Schema(schema)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::Named(String::from(name))
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// A declared relation from one schema to another.
///
/// `local_key` is a field of the declaring schema; `foreign_key` is a field
/// of the target holding the same value.
#[derive(Debug, Clone)]
pub struct Association {
    name: String,
    owner: String,
    kind: AssociationKind,
    local_key: String,
    foreign_key: String,
    target: Target,
    resolved: OnceLock<Arc<Schema>>,
}

impl Association {
    pub(crate) fn new(
        owner: &str,
        name: String,
        kind: AssociationKind,
        target: Target,
        [local_key, foreign_key]: [String; 2],
    ) -> Self {
        Self {
            name,
            owner: String::from(owner),
            kind,
            local_key,
            foreign_key,
            target,
            resolved: OnceLock::new(),
        }
    }

    /// Association name, used as the nested key in rows.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Has-one or has-many.
    #[must_use]
    pub const fn kind(&self) -> AssociationKind {
        self.kind
    }

    /// Field of the declaring schema.
    #[must_use]
    pub fn local_key(&self) -> &str {
        &self.local_key
    }

    /// Field of the target schema.
    #[must_use]
    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    /// The unresolved target.
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// Resolves the target schema, caching it on first success.
    ///
    /// Concurrent first calls may both look the target up, but every caller
    /// receives the one `Arc` that won the cache slot.
    pub fn resolve(&self, registry: &Registry) -> Result<Arc<Schema>> {
        if let Some(schema) = self.resolved.get() {
            return Ok(Arc::clone(schema));
        }

        let schema = match &self.target {
            Target::Schema(schema) => Arc::clone(schema),
            Target::Named(target) => {
                registry
                    .get(target)
                    .cloned()
                    .ok_or_else(|| Error::UnresolvedAssociation {
                        schema: self.owner.clone(),
                        association: self.name.clone(),
                        target: target.clone(),
                    })?
            }
        };

        if schema.field(&self.foreign_key).is_none() {
            return Err(Error::UnknownField {
                schema: String::from(schema.name()),
                field: self.foreign_key.clone(),
            });
        }

        debug!(
            schema = %self.owner,
            association = %self.name,
            target = %schema.name(),
            "Resolved association"
        );
        Ok(Arc::clone(self.resolved.get_or_init(|| schema)))
    }
}
