use tracing::debug;

use super::{builtin, resolution_error, PropertyBag, ResourceResolverStrategy};
use crate::errors::Result;
use crate::types::{Reference, Resource, SelectionTarget};

/// Prefix that marks an XPointer expression rather than a bare fragment.
const XPOINTER_PREFIX: &str = "#xpointer(";

/// Resolves same-document references: `""` (the whole document) and `#id`
/// (the element carrying that id). Comments are excluded in both cases.
#[derive(Debug, Default)]
pub struct FragmentResolver {
    properties: PropertyBag,
}

impl FragmentResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResourceResolverStrategy for FragmentResolver {
    fn name(&self) -> &str {
        builtin::FRAGMENT
    }

    fn can_resolve(&self, reference: &Reference) -> bool {
        let Some(uri) = reference.uri() else {
            debug!("fragment: quick fail for absent uri");
            return false;
        };
        uri.is_empty() || (uri.starts_with('#') && !uri.starts_with(XPOINTER_PREFIX))
    }

    fn resolve(&self, reference: &Reference) -> Result<Resource> {
        let uri = reference.uri().unwrap_or_default();
        let target = if uri.is_empty() {
            SelectionTarget::WholeDocument
        } else {
            let id = uri.strip_prefix('#').unwrap_or(uri);
            if id.is_empty() || uri.starts_with(XPOINTER_PREFIX) {
                return Err(resolution_error(
                    self.name(),
                    reference,
                    "not a bare fragment identifier",
                ));
            }
            SelectionTarget::ElementById(id.to_string())
        };
        Ok(Resource::selection(target, false, Some(uri.to_string())))
    }

    fn is_thread_safe(&self) -> bool {
        true
    }

    fn fresh_instance(&self) -> Result<Box<dyn ResourceResolverStrategy>> {
        Ok(Box::new(Self::new()))
    }

    fn properties(&self) -> &PropertyBag {
        &self.properties
    }
}
