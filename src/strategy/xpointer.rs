use tracing::debug;

use super::{builtin, resolution_error, PropertyBag, ResourceResolverStrategy};
use crate::errors::Result;
use crate::types::{Reference, Resource, SelectionTarget};

const ROOT_POINTER: &str = "#xpointer(/)";
const ID_POINTER_PREFIX: &str = "#xpointer(id(";
const ID_POINTER_SUFFIX: &str = "))";

/// Resolves the two XPointer forms used by XML signatures:
/// `#xpointer(/)` for the whole document and `#xpointer(id('X'))` for one
/// element. Unlike bare fragments, both keep comment nodes.
#[derive(Debug, Default)]
pub struct XPointerResolver {
    properties: PropertyBag,
}

impl XPointerResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Extracts `X` from `#xpointer(id('X'))` or `#xpointer(id("X"))`.
///
/// Quotes must match and the id must be non-empty.
fn parse_id_pointer(uri: &str) -> Option<&str> {
    let inner = uri
        .strip_prefix(ID_POINTER_PREFIX)?
        .strip_suffix(ID_POINTER_SUFFIX)?;
    let quote = inner.chars().next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }
    let id = inner.strip_prefix(quote)?.strip_suffix(quote)?;
    if id.is_empty() || id.contains(quote) {
        return None;
    }
    Some(id)
}

fn target_for(uri: &str) -> Option<SelectionTarget> {
    if uri == ROOT_POINTER {
        return Some(SelectionTarget::WholeDocument);
    }
    parse_id_pointer(uri).map(|id| SelectionTarget::ElementById(id.to_string()))
}

impl ResourceResolverStrategy for XPointerResolver {
    fn name(&self) -> &str {
        builtin::XPOINTER
    }

    fn can_resolve(&self, reference: &Reference) -> bool {
        match reference.uri() {
            Some(uri) => target_for(uri).is_some(),
            None => {
                debug!("xpointer: quick fail for absent uri");
                false
            }
        }
    }

    fn resolve(&self, reference: &Reference) -> Result<Resource> {
        let uri = reference.uri().unwrap_or_default();
        let target = target_for(uri).ok_or_else(|| {
            resolution_error(self.name(), reference, "unsupported xpointer expression")
        })?;
        Ok(Resource::selection(target, true, Some(uri.to_string())))
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
