//! # proxy-pool-registry
//!
//! A registry of outbound proxies and the per-auth proxy resolution built on it.
//!
//! This library keeps an ordered pool of named proxy endpoints, persists it to the
//! `proxy-pool` section of a YAML configuration file, resolves which proxy an
//! authenticated account should use, and masks proxy passwords before URLs are shown.

pub mod auth;
pub mod config;
pub mod error;
pub mod management;
pub mod persist;
pub mod pool;
pub mod proxy;
pub mod resolver;
mod utils;

pub use auth::{AuthIdentity, AuthStatus, AuthStore, InMemoryAuthStore};
pub use config::{RegistryConfig, RegistryConfigBuilder};
pub use error::{ErrorBody, PersistError, RegistryError, Result};
pub use management::{
    AuthProxyInfo, AuthProxyList, AuthProxySummary, DeleteConfirmation, ManagementApi, PoolListing,
};
pub use persist::{MemoryPersister, Persister, YamlFilePersister};
pub use pool::ProxyPoolStore;
pub use proxy::{ProxyPoolEntry, ProxyPoolPatch};
pub use resolver::{describe_account, resolve, PoolLookup, ProxySource, ResolvedProxyInfo};
pub use utils::mask_proxy_url;
