//! Resolution of the effective proxy for an auth identity.

use crate::auth::AuthIdentity;
use crate::utils::mask_proxy_url;

use serde::Serialize;

/// Warning attached when an identity points at a pool id that does not exist.
pub const POOL_ID_NOT_FOUND: &str = "proxy pool ID not found in configuration";

/// Read access to pool URLs by id.
pub trait PoolLookup {
    /// URL of the pool entry `pool_id`, if present.
    fn proxy_url_for(&self, pool_id: &str) -> Option<String>;
}

/// Where a resolved proxy URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxySource {
    /// The identity's own `proxy_url`.
    Direct,
    /// A proxy pool entry referenced by `proxy_pool_id`.
    Pool,
    /// Nothing configured; the global proxy or a direct connection applies.
    None,
}

/// Outcome of resolving an identity's proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProxyInfo {
    /// Effective URL, unmasked. Empty when nothing resolved.
    pub raw_url: String,
    pub source: ProxySource,
    pub warning: Option<&'static str>,
}

impl ResolvedProxyInfo {
    /// Whether a URL was found.
    pub fn is_resolved(&self) -> bool {
        !self.raw_url.is_empty()
    }

    /// The resolved URL with its password replaced.
    pub fn masked_url(&self) -> String {
        mask_proxy_url(&self.raw_url)
    }

    /// The resolved URL as a reqwest proxy, `None` when nothing resolved.
    pub fn to_reqwest_proxy(&self) -> Option<Result<reqwest::Proxy, reqwest::Error>> {
        self.is_resolved().then(|| reqwest::Proxy::all(&self.raw_url))
    }
}

/// Resolve the effective proxy URL for `identity`.
///
/// A direct `proxy_url` wins over `proxy_pool_id`. A dangling pool reference
/// yields an empty URL and a warning rather than an error.
pub fn resolve<P: PoolLookup + ?Sized>(identity: &AuthIdentity, pool: &P) -> ResolvedProxyInfo {
    if !identity.proxy_url.is_empty() {
        return ResolvedProxyInfo {
            raw_url: identity.proxy_url.clone(),
            source: ProxySource::Direct,
            warning: None,
        };
    }

    if !identity.proxy_pool_id.is_empty() {
        return match pool.proxy_url_for(&identity.proxy_pool_id) {
            Some(url) => ResolvedProxyInfo {
                raw_url: url,
                source: ProxySource::Pool,
                warning: None,
            },
            None => ResolvedProxyInfo {
                raw_url: String::new(),
                source: ProxySource::Pool,
                warning: Some(POOL_ID_NOT_FOUND),
            },
        };
    }

    ResolvedProxyInfo {
        raw_url: String::new(),
        source: ProxySource::None,
        warning: None,
    }
}

/// `(auth type, account)` of `identity`. An empty account should be omitted
/// from responses.
pub fn describe_account(identity: &AuthIdentity) -> (String, String) {
    identity.account_info()
}
