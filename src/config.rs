//! Configuration for the proxy pool registry.

use std::path::PathBuf;

/// Schemes accepted by strict URL validation unless overridden.
pub const DEFAULT_ALLOWED_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];

/// Configuration for the proxy pool registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// YAML configuration file the pool is loaded from and persisted to.
    /// `None` keeps the pool in memory only.
    pub config_path: Option<PathBuf>,
    /// Parse proxy URLs and check scheme and host before accepting them.
    pub strict_url_validation: bool,
    /// Schemes accepted when strict validation is on.
    pub allowed_schemes: Vec<String>,
}

impl RegistryConfig {
    /// Create a new configuration builder.
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder::new()
    }

    /// Whether `scheme` is on the allow list. Comparison is case-insensitive.
    pub fn allows_scheme(&self, scheme: &str) -> bool {
        self.allowed_schemes
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(scheme))
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfigBuilder::new().build()
    }
}

/// Builder for `RegistryConfig`.
pub struct RegistryConfigBuilder {
    config_path: Option<PathBuf>,
    strict_url_validation: Option<bool>,
    allowed_schemes: Option<Vec<String>>,
}

impl RegistryConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config_path: None,
            strict_url_validation: None,
            allowed_schemes: None,
        }
    }

    /// Set the YAML file the pool is persisted to.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Enable or disable strict proxy URL validation.
    pub fn strict_url_validation(mut self, strict: bool) -> Self {
        self.strict_url_validation = Some(strict);
        self
    }

    /// Set the schemes accepted by strict validation.
    pub fn allowed_schemes(mut self, schemes: Vec<impl Into<String>>) -> Self {
        self.allowed_schemes = Some(schemes.into_iter().map(Into::into).collect());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RegistryConfig {
        RegistryConfig {
            config_path: self.config_path,
            strict_url_validation: self.strict_url_validation.unwrap_or(false),
            allowed_schemes: self.allowed_schemes.unwrap_or_else(|| {
                DEFAULT_ALLOWED_SCHEMES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
        }
    }
}

impl Default for RegistryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
