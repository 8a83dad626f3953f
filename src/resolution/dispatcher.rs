use std::sync::Arc;

use tracing::debug;

use super::handle::{Isolated, ResolverHandle};
use super::registry::ResolverRegistry;
use crate::errors::{ResolverError, Result};
use crate::types::{Reference, Resource};

/// The handle a probe settled on, owned or borrowed so that it can outlive
/// the registry lock.
enum Selected<'a> {
    Borrowed(&'a ResolverHandle),
    Registered(Arc<ResolverHandle>),
    Fresh(ResolverHandle),
}

impl Selected<'_> {
    fn handle(&self) -> &ResolverHandle {
        match self {
            Selected::Borrowed(handle) => handle,
            Selected::Registered(handle) => handle,
            Selected::Fresh(handle) => handle,
        }
    }
}

/// Selects and runs the resolver for a reference.
///
/// Candidates supplied by the caller are probed first, in order, without
/// touching the registry lock. If none of them can resolve the reference,
/// the registry is scanned in probe order while its lock is held. The first
/// handle that reports capability is resolved through; its error, if any,
/// is returned as-is and no further handle is tried.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'r> {
    registry: &'r ResolverRegistry,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r ResolverRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r ResolverRegistry {
        self.registry
    }

    /// Resolves `reference`, trying `candidates` before the registry.
    ///
    /// # Errors
    ///
    /// - [`ResolverError::NotFound`] if no handle reports capability.
    /// - [`ResolverError::Instantiation`] if an isolated instance of a
    ///   non-thread-safe strategy could not be built.
    /// - Whatever the selected strategy's `resolve` returns.
    pub fn resolve(
        &self,
        reference: &Reference,
        candidates: &[ResolverHandle],
    ) -> Result<Resource> {
        let selected = self.select_handle(reference, candidates)?;
        let handle = selected.handle();
        debug!(
            strategy = handle.name(),
            uri = reference.uri_or_null(),
            "resolving reference"
        );
        handle.resolve_in_place(reference)
    }

    /// Returns the name of the strategy `resolve` would use, without
    /// resolving.
    pub fn select(&self, reference: &Reference, candidates: &[ResolverHandle]) -> Result<String> {
        self.select_handle(reference, candidates)
            .map(|selected| selected.handle().name().to_string())
    }

    fn select_handle<'c>(
        &self,
        reference: &Reference,
        candidates: &'c [ResolverHandle],
    ) -> Result<Selected<'c>> {
        debug!(
            candidates = candidates.len(),
            uri = reference.uri_or_null(),
            base_uri = reference.base_uri(),
            "selecting resolver"
        );

        if let Some(selected) = probe_candidates(reference, candidates)? {
            return Ok(selected);
        }
        if let Some(selected) = self.probe_registry(reference)? {
            return Ok(selected);
        }

        Err(ResolverError::NotFound {
            uri: reference.uri_or_null().to_string(),
            base_uri: reference.base_uri().to_string(),
        })
    }

    /// Scans the registry while holding its lock for the whole loop.
    fn probe_registry(&self, reference: &Reference) -> Result<Option<Selected<'static>>> {
        let handles = self.registry.snapshot();
        for handle in handles.iter() {
            debug!(strategy = handle.name(), "check resolvability");
            match handle.isolated()? {
                Isolated::Shared(shared) => {
                    if shared.can_resolve(reference) {
                        return Ok(Some(Selected::Registered(Arc::clone(handle))));
                    }
                }
                Isolated::Fresh(fresh) => {
                    if fresh.can_resolve(reference) {
                        return Ok(Some(Selected::Fresh(fresh)));
                    }
                }
            }
        }
        Ok(None)
    }
}

fn probe_candidates<'c>(
    reference: &Reference,
    candidates: &'c [ResolverHandle],
) -> Result<Option<Selected<'c>>> {
    for handle in candidates {
        debug!(strategy = handle.name(), "check resolvability of candidate");
        match handle.isolated()? {
            Isolated::Shared(shared) => {
                if shared.can_resolve(reference) {
                    return Ok(Some(Selected::Borrowed(shared)));
                }
            }
            Isolated::Fresh(fresh) => {
                if fresh.can_resolve(reference) {
                    return Ok(Some(Selected::Fresh(fresh)));
                }
            }
        }
    }
    Ok(None)
}

impl Dispatcher<'static> {
    /// A dispatcher over [`ResolverRegistry::global`].
    pub fn global() -> Self {
        Self::new(ResolverRegistry::global())
    }
}
