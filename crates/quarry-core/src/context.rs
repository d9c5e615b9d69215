//! The explicit compilation context.

use std::fmt;
use std::sync::Arc;

use crate::dialect::Dialect;
use crate::expr::Extensions;
use crate::schema::Registry;

/// Everything a statement needs to compile: the target dialect, the schema
/// registry that deferred associations resolve against, and the registered
/// extension templates.
///
/// There is no global default; every compile takes a `&Context`.
#[derive(Clone)]
pub struct Context {
    dialect: Arc<dyn Dialect>,
    registry: Arc<Registry>,
    extensions: Arc<Extensions>,
}

impl Context {
    /// Creates a context with an empty registry and no extensions.
    #[must_use]
    pub fn new(dialect: impl Dialect + 'static) -> Self {
        Self {
            dialect: Arc::new(dialect),
            registry: Arc::new(Registry::new()),
            extensions: Arc::new(Extensions::new()),
        }
    }

    /// Replaces the schema registry.
    #[must_use]
    pub fn with_registry(mut self, registry: impl Into<Arc<Registry>>) -> Self {
        self.registry = registry.into();
        self
    }

    /// Replaces the extension templates.
    #[must_use]
    pub fn with_extensions(mut self, extensions: impl Into<Arc<Extensions>>) -> Self {
        self.extensions = extensions.into();
        self
    }

    /// The target dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// The schema registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The extension templates.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("dialect", &self.dialect.name())
            .field("registry", &self.registry)
            .field("extensions", &self.extensions)
            .finish()
    }
}
