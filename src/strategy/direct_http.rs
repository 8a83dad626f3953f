use std::time::Duration;

use tracing::debug;
use url::Url;

use super::{absolute_url, builtin, resolution_error, PropertyBag, ResourceResolverStrategy};
use crate::errors::Result;
use crate::types::{Reference, Resource};

pub const PROPERTY_PROXY_HOST: &str = "http.proxy.host";
pub const PROPERTY_PROXY_PORT: &str = "http.proxy.port";
pub const PROPERTY_PROXY_USERNAME: &str = "http.proxy.username";
pub const PROPERTY_PROXY_PASSWORD: &str = "http.proxy.password";
pub const PROPERTY_TIMEOUT_SECS: &str = "http.timeout.secs";

const UNDERSTOOD_PROPERTIES: &[&str] = &[
    PROPERTY_PROXY_HOST,
    PROPERTY_PROXY_PORT,
    PROPERTY_PROXY_USERNAME,
    PROPERTY_PROXY_PASSWORD,
    PROPERTY_TIMEOUT_SECS,
];

/// Fetches `http:` and `https:` references over the network.
///
/// Relative URIs are accepted when the base URI is itself an HTTP URL. The
/// fragment is stripped before fetching. Proxy and timeout settings come
/// from the `http.*` properties.
#[derive(Debug, Default)]
pub struct DirectHttpResolver {
    properties: PropertyBag,
}

impl DirectHttpResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an agent from the current property bag.
    fn agent(&self, reference: &Reference) -> Result<ureq::Agent> {
        let mut config = ureq::Agent::config_builder().http_status_as_error(false);

        if let Some(proxy_url) = proxy_url(&self.properties) {
            let proxy = ureq::Proxy::new(&proxy_url).map_err(|e| {
                resolution_error(self.name(), reference, format!("invalid proxy: {e}"))
            })?;
            config = config.proxy(Some(proxy));
        }

        if let Some(raw) = self.properties.get(PROPERTY_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                resolution_error(
                    self.name(),
                    reference,
                    format!("invalid {PROPERTY_TIMEOUT_SECS} value '{raw}'"),
                )
            })?;
            config = config.timeout_global(Some(Duration::from_secs(secs)));
        }

        Ok(ureq::Agent::new_with_config(config.build()))
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http:") || value.starts_with("https:")
}

/// Proxy URL assembled from the proxy properties, if a host is configured.
fn proxy_url(properties: &PropertyBag) -> Option<String> {
    let host = properties.get(PROPERTY_PROXY_HOST)?;
    let host = host.trim();
    if host.is_empty() {
        return None;
    }

    let credentials = match (
        properties.get(PROPERTY_PROXY_USERNAME),
        properties.get(PROPERTY_PROXY_PASSWORD),
    ) {
        (Some(user), Some(password)) => format!("{user}:{password}@"),
        (Some(user), None) => format!("{user}@"),
        _ => String::new(),
    };

    match properties.get(PROPERTY_PROXY_PORT) {
        Some(port) if !port.trim().is_empty() => {
            Some(format!("http://{credentials}{host}:{}", port.trim()))
        }
        _ => Some(format!("http://{credentials}{host}")),
    }
}

/// The URL to fetch: the absolute reference URL without its fragment.
fn fetch_url(reference: &Reference) -> Option<Url> {
    let mut url = absolute_url(reference)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

impl ResourceResolverStrategy for DirectHttpResolver {
    fn name(&self) -> &str {
        builtin::DIRECT_HTTP
    }

    fn can_resolve(&self, reference: &Reference) -> bool {
        let Some(uri) = reference.uri() else {
            return false;
        };
        if uri.is_empty() || uri.starts_with('#') {
            return false;
        }
        if is_http_url(uri) {
            return true;
        }
        is_http_url(reference.base_uri())
            && matches!(
                Url::parse(uri),
                Err(url::ParseError::RelativeUrlWithoutBase)
            )
    }

    fn resolve(&self, reference: &Reference) -> Result<Resource> {
        let url = fetch_url(reference)
            .ok_or_else(|| resolution_error(self.name(), reference, "not an http(s) url"))?;
        let agent = self.agent(reference)?;

        debug!(url = %url, "direct-http: fetching");
        let mut response = agent
            .get(url.as_str())
            .call()
            .map_err(|e| resolution_error(self.name(), reference, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(resolution_error(
                self.name(),
                reference,
                format!("server answered {status} for '{url}'"),
            ));
        }

        let mime_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response.body_mut().read_to_vec().map_err(|e| {
            resolution_error(self.name(), reference, format!("failed to read body: {e}"))
        })?;

        let mut resource = Resource::octets(bytes, Some(url.to_string()));
        resource.mime_type = mime_type;
        Ok(resource)
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

    fn property_keys(&self) -> &[&str] {
        UNDERSTOOD_PROPERTIES
    }
}
