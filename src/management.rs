//! Management operations over the proxy pool and auth proxy assignments.
//!
//! Each method maps to one route of the management API and returns either a
//! serializable body or a [`RegistryError`] that carries its HTTP status. The
//! routing framework itself is left to the embedding application.

use crate::auth::{AuthIdentity, AuthStatus, AuthStore};
use crate::error::{RegistryError, Result};
use crate::pool::ProxyPoolStore;
use crate::proxy::{ProxyPoolEntry, ProxyPoolPatch};
use crate::resolver::{self, ProxySource};

use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;

/// Shown when an identity has no proxy of its own.
pub const NO_PROXY_INFO: &str = "no proxy configured (using global proxy or direct connection)";

/// Body of `GET /v0/management/proxy-pool`. URLs are masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolListing {
    pub proxy_pool: Vec<ProxyPoolEntry>,
}

/// Body of `DELETE /v0/management/proxy-pool/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteConfirmation {
    pub status: &'static str,
    pub id: String,
}

/// Body of `GET /v0/management/auth/:id/proxy`. URLs are not masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthProxyInfo {
    pub auth_id: String,
    pub provider: String,
    pub proxy_pool_id: String,
    pub proxy_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_proxy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub proxy_info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

/// One row of `GET /v0/management/auth/proxy-list`. URLs are masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthProxySummary {
    pub auth_id: String,
    pub provider: String,
    pub proxy_pool_id: String,
    pub status: AuthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_proxy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Body of `GET /v0/management/auth/proxy-list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthProxyList {
    pub auths: Vec<AuthProxySummary>,
    pub total: usize,
}

/// Management API over a proxy pool and, optionally, an auth store.
#[derive(Clone)]
pub struct ManagementApi {
    /// The proxy pool.
    pool: Arc<ProxyPoolStore>,
    /// Auth manager. Auth routes answer 500 while it is missing.
    auths: Option<Arc<dyn AuthStore>>,
}

impl ManagementApi {
    /// Create the API over `pool` with no auth manager attached.
    pub fn new(pool: Arc<ProxyPoolStore>) -> Self {
        Self { pool, auths: None }
    }

    /// Attach the auth manager used by the auth proxy routes.
    pub fn with_auth_store(mut self, auths: Arc<dyn AuthStore>) -> Self {
        self.auths = Some(auths);
        self
    }

    /// The proxy pool behind the API.
    pub fn pool(&self) -> &Arc<ProxyPoolStore> {
        &self.pool
    }

    /// `GET /v0/management/proxy-pool`
    pub fn list_pool(&self) -> PoolListing {
        PoolListing {
            proxy_pool: self.pool.list().iter().map(ProxyPoolEntry::masked).collect(),
        }
    }

    /// `GET /v0/management/proxy-pool/:id`
    pub fn get_pool_entry(&self, id: &str) -> Result<ProxyPoolEntry> {
        let id = required_proxy_id(id)?;
        self.pool
            .get(id)
            .ok_or_else(|| RegistryError::proxy_not_found(id))
    }

    /// `POST /v0/management/proxy-pool`. Answer 201 on success.
    pub fn create_pool_entry(&self, entry: ProxyPoolEntry) -> Result<ProxyPoolEntry> {
        self.pool.insert(entry)
    }

    /// `PUT /v0/management/proxy-pool/:id`
    pub fn update_pool_entry(&self, id: &str, patch: ProxyPoolPatch) -> Result<ProxyPoolEntry> {
        let id = required_proxy_id(id)?;
        self.pool.update(id, patch)
    }

    /// `DELETE /v0/management/proxy-pool/:id`
    pub fn delete_pool_entry(&self, id: &str) -> Result<DeleteConfirmation> {
        let id = required_proxy_id(id)?;
        let removed = self.pool.delete(id)?;
        Ok(DeleteConfirmation {
            status: "deleted",
            id: removed.id,
        })
    }

    /// `GET /v0/management/auth/:id/proxy`
    pub fn auth_proxy_info(&self, auth_id: &str) -> Result<AuthProxyInfo> {
        let auth_id = auth_id.trim();
        if auth_id.is_empty() {
            return Err(RegistryError::validation("auth ID is required"));
        }
        let auths = self.auth_store()?;
        let auth = auths
            .get_by_id(auth_id)
            .ok_or_else(|| RegistryError::NotFound {
                kind: "auth",
                id: auth_id.to_string(),
            })?;

        let resolved = resolver::resolve(&auth, self.pool.as_ref());
        if let Some(warning) = resolved.warning {
            warn!("Auth {} references proxy pool {}: {}", auth.id, auth.proxy_pool_id, warning);
        }
        // A pool reference always reports the key, empty when the id is unknown.
        let resolved_proxy_url = match resolved.source {
            ProxySource::None => None,
            ProxySource::Direct | ProxySource::Pool => Some(resolved.raw_url.clone()),
        };
        debug!("Auth {} proxy source: {:?}", auth.id, resolved.source);

        let proxy_info = match auth.proxy_info() {
            info if info.is_empty() => NO_PROXY_INFO.to_string(),
            info => info,
        };
        let (auth_type, account) = account_fields(&auth);

        Ok(AuthProxyInfo {
            auth_id: auth.id,
            provider: auth.provider,
            proxy_pool_id: auth.proxy_pool_id,
            proxy_url: auth.proxy_url,
            resolved_proxy_url,
            warning: resolved.warning.map(str::to_string),
            proxy_info,
            auth_type,
            account,
        })
    }

    /// `GET /v0/management/auth/proxy-list`
    pub fn list_auth_proxies(&self) -> Result<AuthProxyList> {
        let auths = self.auth_store()?;

        let summaries: Vec<AuthProxySummary> = auths
            .list()
            .into_iter()
            .map(|auth| {
                let resolved = resolver::resolve(&auth, self.pool.as_ref());
                let proxy_info = Some(auth.proxy_info()).filter(|info| !info.is_empty());
                let (auth_type, account) = account_fields(&auth);

                AuthProxySummary {
                    resolved_proxy_url: resolved.is_resolved().then(|| resolved.masked_url()),
                    warning: resolved.warning.map(str::to_string),
                    auth_id: auth.id,
                    provider: auth.provider,
                    proxy_pool_id: auth.proxy_pool_id,
                    status: auth.status,
                    auth_type,
                    account,
                    proxy_info,
                }
            })
            .collect();

        debug!("Listed proxy settings for {} auths", summaries.len());
        Ok(AuthProxyList {
            total: summaries.len(),
            auths: summaries,
        })
    }

    fn auth_store(&self) -> Result<&Arc<dyn AuthStore>> {
        self.auths
            .as_ref()
            .ok_or(RegistryError::DependencyUnavailable("auth manager"))
    }
}

fn required_proxy_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(RegistryError::validation("proxy ID is required"));
    }
    Ok(id)
}

fn account_fields(auth: &AuthIdentity) -> (Option<String>, Option<String>) {
    let (auth_type, account) = resolver::describe_account(auth);
    if account.is_empty() {
        (None, None)
    } else {
        (Some(auth_type), Some(account))
    }
}
