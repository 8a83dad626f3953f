use std::fs;

use tracing::debug;

use super::{absolute_url, builtin, resolution_error, PropertyBag, ResourceResolverStrategy};
use crate::errors::Result;
use crate::types::{Reference, Resource};

/// Resolves references that point at a `file:` URL, either directly or
/// relative to a `file:` base URI.
#[derive(Debug, Default)]
pub struct LocalFilesystemResolver {
    properties: PropertyBag,
}

impl LocalFilesystemResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResourceResolverStrategy for LocalFilesystemResolver {
    fn name(&self) -> &str {
        builtin::LOCAL_FILESYSTEM
    }

    fn can_resolve(&self, reference: &Reference) -> bool {
        let Some(uri) = reference.uri() else {
            return false;
        };
        if uri.is_empty() || uri.starts_with('#') || uri.starts_with("http:") {
            return false;
        }
        match absolute_url(reference) {
            Some(url) if url.scheme() == "file" => {
                debug!(url = %url, "local-filesystem: can resolve");
                true
            }
            _ => false,
        }
    }

    fn resolve(&self, reference: &Reference) -> Result<Resource> {
        let mut url = absolute_url(reference)
            .filter(|url| url.scheme() == "file")
            .ok_or_else(|| resolution_error(self.name(), reference, "not a file: url"))?;
        url.set_fragment(None);

        let path = url.to_file_path().map_err(|_| {
            resolution_error(
                self.name(),
                reference,
                format!("'{url}' does not map to a local path"),
            )
        })?;

        let bytes = fs::read(&path).map_err(|e| {
            resolution_error(
                self.name(),
                reference,
                format!("failed to read '{}': {e}", path.display()),
            )
        })?;

        Ok(Resource::octets(bytes, Some(url.to_string())))
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
