//! Resolution strategies and the contract they implement.
//!
//! A strategy knows how to turn one family of references into resolved
//! content: same-document fragments, XPointer expressions, local files, HTTP
//! URLs, or anything a third party plugs in.

mod direct_http;
mod fragment;
mod local_filesystem;
mod xpointer;

pub use direct_http::{
    DirectHttpResolver, PROPERTY_PROXY_HOST, PROPERTY_PROXY_PASSWORD, PROPERTY_PROXY_PORT,
    PROPERTY_PROXY_USERNAME, PROPERTY_TIMEOUT_SECS,
};
pub use fragment::FragmentResolver;
pub use local_filesystem::LocalFilesystemResolver;
pub use xpointer::XPointerResolver;

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use url::Url;

use crate::errors::{ResolverError, Result};
use crate::types::{Reference, Resource};

/// Identifiers of the built-in strategies, as understood by
/// [`StrategyCatalog::builtin`].
pub mod builtin {
    pub const FRAGMENT: &str = "fragment";
    pub const LOCAL_FILESYSTEM: &str = "local-filesystem";
    pub const XPOINTER: &str = "xpointer";
    pub const DIRECT_HTTP: &str = "direct-http";

    /// The order in which `register_defaults` appends the built-ins.
    pub const DEFAULT_ORDER: [&str; 4] = [FRAGMENT, LOCAL_FILESYSTEM, XPOINTER, DIRECT_HTTP];
}

/// Trait for pluggable resource resolution strategies.
///
/// Implementations must be `Send + Sync` so they can live in a shared
/// registry. A strategy that keeps per-call state and therefore must not be
/// driven by two callers at once reports `is_thread_safe() == false`; the
/// registry then runs every attempt against a fresh instance obtained from
/// [`fresh_instance`](Self::fresh_instance).
pub trait ResourceResolverStrategy: Send + Sync {
    /// Stable identifier used in diagnostics and logs.
    fn name(&self) -> &str;

    /// Side-effect-free capability probe. May perform I/O.
    fn can_resolve(&self, reference: &Reference) -> bool;

    /// Produce the referenced content.
    ///
    /// May fail even after a positive probe, e.g. when a file disappears in
    /// between.
    fn resolve(&self, reference: &Reference) -> Result<Resource>;

    /// Whether one instance may serve concurrent resolutions.
    fn is_thread_safe(&self) -> bool {
        false
    }

    /// Construct a new, independent instance of the same strategy.
    fn fresh_instance(&self) -> Result<Box<dyn ResourceResolverStrategy>>;

    /// The instance-local property bag.
    fn properties(&self) -> &PropertyBag;

    /// Property keys this strategy understands.
    fn property_keys(&self) -> &[&str] {
        &[]
    }

    fn understands_property(&self, key: &str) -> bool {
        self.property_keys().iter().any(|k| *k == key)
    }

    fn get_property(&self, key: &str) -> Option<String> {
        self.properties().get(key)
    }

    fn set_property(&self, key: &str, value: &str) {
        self.properties().set(key, value);
    }

    fn add_properties(&self, properties: &HashMap<String, String>) {
        self.properties().extend(properties);
    }
}

/// String-keyed, case-sensitive strategy configuration.
///
/// Setters take `&self` so a strategy can be configured while it sits in a
/// shared registry.
#[derive(Debug, Default)]
pub struct PropertyBag {
    values: RwLock<HashMap<String, String>>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    pub fn extend(&self, properties: &HashMap<String, String>) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in properties {
            values.insert(key.clone(), value.clone());
        }
    }

    /// A copy of every key/value pair currently set.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

/// Constructor function stored in a [`StrategyCatalog`].
pub type StrategyFactory = fn() -> Result<Box<dyn ResourceResolverStrategy>>;

/// Table of strategies that can be registered by identifier.
///
/// Replaces lookup-by-class-name: every registrable strategy is listed here
/// at compile time, and third parties add their own entries with
/// [`insert`](Self::insert).
#[derive(Clone)]
pub struct StrategyCatalog {
    factories: BTreeMap<String, StrategyFactory>,
}

impl StrategyCatalog {
    /// An empty catalog.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A catalog containing the four built-in strategies.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.insert(builtin::FRAGMENT, new_fragment);
        catalog.insert(builtin::LOCAL_FILESYSTEM, new_local_filesystem);
        catalog.insert(builtin::XPOINTER, new_xpointer);
        catalog.insert(builtin::DIRECT_HTTP, new_direct_http);
        catalog
    }

    /// Adds or replaces the factory for `identifier`.
    pub fn insert(&mut self, identifier: &str, factory: StrategyFactory) {
        self.factories.insert(identifier.to_string(), factory);
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// Registered identifiers in sorted order.
    pub fn identifiers(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Constructs one instance of the strategy named `identifier`.
    ///
    /// Unknown identifiers and failing factories both yield
    /// [`ResolverError::Instantiation`].
    pub fn construct(&self, identifier: &str) -> Result<Box<dyn ResourceResolverStrategy>> {
        let factory = self
            .factories
            .get(identifier)
            .ok_or_else(|| ResolverError::Instantiation {
                strategy: identifier.to_string(),
                message: "no such resolver in catalog".to_string(),
            })?;
        factory()
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for StrategyCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyCatalog")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

fn new_fragment() -> Result<Box<dyn ResourceResolverStrategy>> {
    Ok(Box::new(FragmentResolver::new()))
}

fn new_local_filesystem() -> Result<Box<dyn ResourceResolverStrategy>> {
    Ok(Box::new(LocalFilesystemResolver::new()))
}

fn new_xpointer() -> Result<Box<dyn ResourceResolverStrategy>> {
    Ok(Box::new(XPointerResolver::new()))
}

fn new_direct_http() -> Result<Box<dyn ResourceResolverStrategy>> {
    Ok(Box::new(DirectHttpResolver::new()))
}

/// Absolute URL of `reference`: the URI itself when absolute, otherwise the
/// URI joined against the base URI. `None` when neither yields a URL.
pub(crate) fn absolute_url(reference: &Reference) -> Option<Url> {
    let uri = reference.uri()?;
    match Url::parse(uri) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(reference.base_uri()).ok()?;
            base.join(uri).ok()
        }
        Err(_) => None,
    }
}

/// Builds a resolution error for `reference` on behalf of `strategy`.
pub(crate) fn resolution_error(
    strategy: &str,
    reference: &Reference,
    message: impl Into<String>,
) -> ResolverError {
    ResolverError::Resolution {
        strategy: strategy.to_string(),
        uri: reference.uri_or_null().to_string(),
        message: message.into(),
    }
}
