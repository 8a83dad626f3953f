use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::NULL_URI;

/// A signed reference to be resolved: the URI attribute as written in the
/// document, plus the base URI of the document it occurs in.
///
/// The URI is optional because a reference element may omit the attribute
/// entirely, which is distinct from an empty URI (`""`, the whole document).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    uri: Option<String>,
    base_uri: String,
}

impl Reference {
    /// Creates a reference with a URI value.
    pub fn new(uri: impl Into<String>, base_uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            base_uri: base_uri.into(),
        }
    }

    /// Creates a reference whose URI attribute is absent.
    pub fn without_uri(base_uri: impl Into<String>) -> Self {
        Self {
            uri: None,
            base_uri: base_uri.into(),
        }
    }

    /// The URI value, if the attribute is present.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// The base URI of the enclosing document. May be empty.
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// The URI value for diagnostics: the value itself, or `"null"`.
    pub fn uri_or_null(&self) -> &str {
        self.uri.as_deref().unwrap_or(NULL_URI)
    }
}

/// Which part of the signing document a same-document reference selects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SelectionTarget {
    WholeDocument,
    ElementById(String),
}

/// A node selection inside the document that carries the signature.
///
/// The resolver does not parse the document; the caller applies the
/// selection to its own tree before canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeSelection {
    pub target: SelectionTarget,
    /// Whether comment nodes are kept in the selected subtree.
    pub include_comments: bool,
}

/// Content produced by a resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResourceContent {
    /// Raw bytes fetched from a file or over the network.
    Octets(Vec<u8>),
    /// A subtree of the signing document.
    Selection(NodeSelection),
}

/// A successfully resolved resource. Ownership passes to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// The absolute URI the content came from, when one is known.
    pub source_uri: Option<String>,
    /// MIME type reported by the source, if any.
    pub mime_type: Option<String>,
    pub content: ResourceContent,
}

impl Resource {
    /// Creates an octet resource.
    pub fn octets(bytes: Vec<u8>, source_uri: Option<String>) -> Self {
        Self {
            source_uri,
            mime_type: None,
            content: ResourceContent::Octets(bytes),
        }
    }

    /// Creates a same-document selection resource.
    pub fn selection(
        target: SelectionTarget,
        include_comments: bool,
        source_uri: Option<String>,
    ) -> Self {
        Self {
            source_uri,
            mime_type: None,
            content: ResourceContent::Selection(NodeSelection {
                target,
                include_comments,
            }),
        }
    }

    /// Sets the MIME type, builder style.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Returns the octet content, or `None` for a node selection.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.content {
            ResourceContent::Octets(bytes) => Some(bytes),
            ResourceContent::Selection(_) => None,
        }
    }

    /// Returns the node selection, or `None` for octet content.
    pub fn node_selection(&self) -> Option<&NodeSelection> {
        match &self.content {
            ResourceContent::Selection(selection) => Some(selection),
            ResourceContent::Octets(_) => None,
        }
    }

    /// Lowercase hex SHA-256 of octet content; `None` for a selection.
    pub fn content_digest(&self) -> Option<String> {
        self.bytes().map(content_hash)
    }
}

/// Compute the SHA-256 hash of raw content, hex encoded.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
