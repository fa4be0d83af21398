//! Configuration resolution: default-construct a config, then apply ordered
//! mutation specs.
//!
//! A configurable definition holds a [`ConfigResolver`]; every codec build
//! resolves a fresh configuration, so codecs built from the same definition
//! never observe each other's config instance.

use std::sync::Arc;

use crate::error::{short_type_name, DefinitionError};

/// Default-construct capability for a configuration or segment type, supplied
/// explicitly by the caller (no runtime introspection). Failure carries a
/// human-readable reason.
pub type Factory<T> = Arc<dyn Fn() -> Result<T, String> + Send + Sync>;

/// One ordered mutation applied to a freshly constructed configuration.
pub type ConfigSpec<C> = Arc<dyn Fn(&mut C) + Send + Sync>;

/// Factory backed by the type's `Default` implementation.
pub fn factory_of<T: Default + 'static>() -> Factory<T> {
    Arc::new(|| Ok(T::default()))
}

/// A default-construct factory plus the ordered mutation specs declared so
/// far. Immutable: [`ConfigResolver::with_spec`] returns a sibling.
pub struct ConfigResolver<C> {
    factory: Factory<C>,
    specs: Vec<ConfigSpec<C>>,
}

impl<C> std::fmt::Debug for ConfigResolver<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("specs", &self.specs.len())
            .finish_non_exhaustive()
    }
}

impl<C> Clone for ConfigResolver<C> {
    fn clone(&self) -> Self {
        ConfigResolver {
            factory: Arc::clone(&self.factory),
            specs: self.specs.clone(),
        }
    }
}

impl<C: 'static> ConfigResolver<C> {
    /// Probes the factory once: a configuration type that cannot be
    /// constructed fails here, at declaration time, not at first use.
    pub fn new(factory: Factory<C>) -> Result<Self, DefinitionError> {
        factory().map_err(|reason| DefinitionError::Construction {
            type_name: short_type_name::<C>(),
            reason,
        })?;
        Ok(ConfigResolver {
            factory,
            specs: Vec::new(),
        })
    }

    /// Infallible constructor for config types with a `Default`.
    pub(crate) fn of_default() -> Self
    where
        C: Default,
    {
        ConfigResolver {
            factory: Arc::new(|| Ok(C::default())),
            specs: Vec::new(),
        }
    }

    /// Returns a new resolver with `spec` appended; `self` is unaffected.
    pub fn with_spec(&self, spec: ConfigSpec<C>) -> Self {
        let mut next = self.clone();
        next.specs.push(spec);
        next
    }

    /// Default-construct a fresh `C`, then apply every spec in declaration
    /// order.
    pub fn resolve(&self) -> Result<C, DefinitionError> {
        let mut config = (self.factory)().map_err(|reason| DefinitionError::Construction {
            type_name: short_type_name::<C>(),
            reason,
        })?;
        for spec in &self.specs {
            spec(&mut config);
        }
        Ok(config)
    }
}
