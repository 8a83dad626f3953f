use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

use tracing::debug;

use crate::errors::{ResolverError, Result};
use crate::strategy::ResourceResolverStrategy;
use crate::types::{Reference, Resource};

/// Binds exactly one strategy instance to the operations the registry and
/// the dispatcher use.
///
/// A handle never shares its instance with another handle. For strategies
/// that are not thread-safe, [`isolated`](Self::isolated) hands out a
/// transient handle around a fresh instance so the registered one is never
/// driven by two callers at once.
pub struct ResolverHandle {
    strategy: Box<dyn ResourceResolverStrategy>,
}

/// A handle that is safe to probe and resolve through on the current thread.
pub enum Isolated<'a> {
    /// The original handle; its strategy is thread-safe.
    Shared(&'a ResolverHandle),
    /// A transient handle around a freshly constructed instance.
    Fresh(ResolverHandle),
}

impl Deref for Isolated<'_> {
    type Target = ResolverHandle;

    fn deref(&self) -> &ResolverHandle {
        match self {
            Isolated::Shared(handle) => handle,
            Isolated::Fresh(handle) => handle,
        }
    }
}

impl ResolverHandle {
    pub fn new<S>(strategy: S) -> Self
    where
        S: ResourceResolverStrategy + 'static,
    {
        Self::from_boxed(Box::new(strategy))
    }

    pub fn from_boxed(strategy: Box<dyn ResourceResolverStrategy>) -> Self {
        Self { strategy }
    }

    /// Name of the wrapped strategy.
    pub fn name(&self) -> &str {
        self.strategy.name()
    }

    pub fn strategy(&self) -> &dyn ResourceResolverStrategy {
        self.strategy.as_ref()
    }

    pub fn is_thread_safe(&self) -> bool {
        self.strategy.is_thread_safe()
    }

    pub fn can_resolve(&self, reference: &Reference) -> bool {
        self.strategy.can_resolve(reference)
    }

    /// Returns a handle that is safe to use for one resolution attempt.
    ///
    /// Thread-safe strategies are used as-is. Otherwise a new instance of
    /// the same strategy is constructed and receives a copy of this
    /// instance's properties. Construction failure is reported as
    /// [`ResolverError::Instantiation`].
    pub fn isolated(&self) -> Result<Isolated<'_>> {
        if self.is_thread_safe() {
            return Ok(Isolated::Shared(self));
        }

        debug!(strategy = self.name(), "constructing isolated resolver instance");
        let fresh = self
            .strategy
            .fresh_instance()
            .map_err(|e| match e {
                ResolverError::Instantiation { .. } => e,
                other => ResolverError::Instantiation {
                    strategy: self.name().to_string(),
                    message: other.to_string(),
                },
            })?;

        let properties = self.strategy.properties().snapshot();
        if !properties.is_empty() {
            fresh.add_properties(&properties);
        }
        Ok(Isolated::Fresh(Self::from_boxed(fresh)))
    }

    /// Resolves `reference` through an instance that no other caller is
    /// using. The capability probe is the caller's responsibility.
    pub fn resolve_safely(&self, reference: &Reference) -> Result<Resource> {
        self.isolated()?.resolve_in_place(reference)
    }

    /// Resolves through this exact instance.
    pub(crate) fn resolve_in_place(&self, reference: &Reference) -> Result<Resource> {
        self.strategy.resolve(reference)
    }

    pub fn get_property(&self, key: &str) -> Option<String> {
        self.strategy.get_property(key)
    }

    pub fn set_property(&self, key: &str, value: &str) {
        self.strategy.set_property(key, value);
    }

    pub fn add_properties(&self, properties: &HashMap<String, String>) {
        self.strategy.add_properties(properties);
    }

    pub fn property_keys(&self) -> &[&str] {
        self.strategy.property_keys()
    }

    pub fn understands_property(&self, key: &str) -> bool {
        self.strategy.understands_property(key)
    }
}

impl fmt::Debug for ResolverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverHandle")
            .field("strategy", &self.name())
            .field("thread_safe", &self.is_thread_safe())
            .finish()
    }
}
