//! Session configuration.
//!
//! ```rust
//! use ad_directory::cache::CachePolicy;
//! use ad_directory::session::SessionConfig;
//!
//! let config = SessionConfig::from_json(r#"{
//!     "server": "dc1.example.com",
//!     "page_size": 500,
//!     "cache_policy": { "kind": "lru", "capacity": 64 }
//! }"#)?;
//! assert_eq!(config.port, 389);
//! assert_eq!(config.cache_policy, CachePolicy::Lru { capacity: 64 });
//! # Ok::<(), ad_directory::DirectoryError>(())
//! ```

use crate::cache::CachePolicy;
use crate::error::{DirectoryError, DirectoryResult};
use crate::query::PAGE_SIZE;
use crate::transport::{Credentials, LDAP_PORT};
use serde::{Deserialize, Serialize};

/// Site used when none is configured.
pub const DEFAULT_FIRST_SITE_NAME: &str = "Default-First-Site-Name";

/// How to reach and query the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Explicit server host. Skips site lookup when set.
    pub server: Option<String>,
    pub port: u16,
    /// `None` binds with the caller's logon credentials.
    pub credentials: Option<Credentials>,
    /// Site to pick a server from.
    pub site_name: Option<String>,
    /// DNS domain for the site lookup; the joined domain when absent.
    pub domain_name: Option<String>,
    /// Base DN for default queries; the naming context when absent.
    pub base_dn: Option<String>,
    pub page_size: u32,
    pub cache_policy: CachePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server: None,
            port: LDAP_PORT,
            credentials: None,
            site_name: Some(DEFAULT_FIRST_SITE_NAME.to_string()),
            domain_name: None,
            base_dn: None,
            page_size: PAGE_SIZE,
            cache_policy: CachePolicy::Unbounded,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> DirectoryResult<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// `None` disables site lookup.
    pub fn with_site_name(mut self, site_name: Option<&str>) -> Self {
        self.site_name = site_name.map(str::to_string);
        self
    }

    pub fn with_domain_name(mut self, domain_name: impl Into<String>) -> Self {
        self.domain_name = Some(domain_name.into());
        self
    }

    pub fn with_base_dn(mut self, base_dn: impl Into<String>) -> Self {
        self.base_dn = Some(base_dn.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    /// Reject settings no session can work with.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.page_size == 0 {
            return Err(DirectoryError::Configuration {
                message: "page_size must be at least 1".to_string(),
            });
        }
        if self.port == 0 {
            return Err(DirectoryError::Configuration {
                message: "port must not be 0".to_string(),
            });
        }
        Ok(())
    }
}
