//! Auth identities as seen by the proxy registry.
//!
//! The registry never owns auth entries. It reads them through [`AuthStore`],
//! which the embedding application implements on top of its own auth manager.

use crate::utils::mask_proxy_url;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state reported by the auth manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Active,
    Disabled,
    Refreshing,
    Pending,
    Error,
    #[default]
    Unknown,
}

impl AuthStatus {
    /// Lowercase name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::Refreshing => "refreshing",
            Self::Pending => "pending",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated account and the proxy settings attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub id: String,
    pub provider: String,
    #[serde(default)]
    pub status: AuthStatus,
    /// Reference to a pool entry id. Empty when unset.
    #[serde(default)]
    pub proxy_pool_id: String,
    /// Direct proxy override. Takes precedence over `proxy_pool_id`.
    #[serde(default)]
    pub proxy_url: String,
    /// Kind of credential, e.g. "oauth" or "api_key".
    #[serde(default)]
    pub account_type: String,
    /// Account label, e.g. an email address. Empty when unknown.
    #[serde(default)]
    pub account: String,
}

impl AuthIdentity {
    /// Create an identity with no proxy settings.
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            ..Self::default()
        }
    }

    /// Set the lifecycle state.
    pub fn with_status(mut self, status: AuthStatus) -> Self {
        self.status = status;
        self
    }

    /// Reference a proxy pool entry.
    pub fn with_proxy_pool_id(mut self, pool_id: impl Into<String>) -> Self {
        self.proxy_pool_id = pool_id.into();
        self
    }

    /// Set a direct proxy override.
    pub fn with_proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = proxy_url.into();
        self
    }

    /// Set the auth type and account label.
    pub fn with_account(mut self, account_type: impl Into<String>, account: impl Into<String>) -> Self {
        self.account_type = account_type.into();
        self.account = account.into();
        self
    }

    /// One-line summary of the proxy settings, empty when none are set.
    /// Direct URLs are masked.
    pub fn proxy_info(&self) -> String {
        if !self.proxy_url.is_empty() {
            format!("direct proxy: {}", mask_proxy_url(&self.proxy_url))
        } else if !self.proxy_pool_id.is_empty() {
            format!("proxy pool: {}", self.proxy_pool_id)
        } else {
            String::new()
        }
    }

    /// `(auth type, account)` pair.
    pub fn account_info(&self) -> (String, String) {
        (self.account_type.clone(), self.account.clone())
    }
}

/// Read access to the auth manager.
pub trait AuthStore: Send + Sync {
    /// Look up an identity by id.
    fn get_by_id(&self, id: &str) -> Option<AuthIdentity>;
    /// All identities, in the store's order.
    fn list(&self) -> Vec<AuthIdentity>;
}

/// Simple auth store holding identities in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuthStore {
    identities: RwLock<Vec<AuthIdentity>>,
}

impl InMemoryAuthStore {
    /// Create a store seeded with `identities`.
    pub fn new(identities: Vec<AuthIdentity>) -> Self {
        Self {
            identities: RwLock::new(identities),
        }
    }

    /// Insert `identity`, replacing any identity with the same id.
    pub fn upsert(&self, identity: AuthIdentity) {
        let mut identities = self.identities.write();
        match identities.iter_mut().find(|a| a.id == identity.id) {
            Some(existing) => *existing = identity,
            None => identities.push(identity),
        }
    }

    /// Remove the identity with `id`, returning it.
    pub fn remove(&self, id: &str) -> Option<AuthIdentity> {
        let mut identities = self.identities.write();
        let idx = identities.iter().position(|a| a.id == id)?;
        Some(identities.remove(idx))
    }
}

impl AuthStore for InMemoryAuthStore {
    fn get_by_id(&self, id: &str) -> Option<AuthIdentity> {
        self.identities.read().iter().find(|a| a.id == id).cloned()
    }

    fn list(&self) -> Vec<AuthIdentity> {
        self.identities.read().clone()
    }
}
