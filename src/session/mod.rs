//! Directory session facade.
//!
//! A [`DirectorySession`] owns one bound transport, the default query
//! configuration and the [`QueryCache`]. Lookups consult the cache when asked
//! to and fall back to a paged search; results are wrapped into
//! [`DirectoryObject`]s. Entry-level writes go straight to the transport and
//! never touch the cache.
//!
//! # Example
//!
//! ```rust
//! use ad_directory::session::{DirectorySession, SessionConfig};
//! use ad_directory::transport::{InMemoryConnector, InMemoryTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connector = InMemoryConnector::new(InMemoryTransport::new("DC=example,DC=com"));
//! let config = SessionConfig::new().with_server("dc1.example.com");
//! let mut session = DirectorySession::connect(config, &connector).await?;
//!
//! assert_eq!(session.domain_name().await?.as_deref(), Some("example.com"));
//! let users = session.get_users(false).await?;
//! assert!(users.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod config;
mod operations;
pub mod resolver;

pub use config::{SessionConfig, DEFAULT_FIRST_SITE_NAME};
pub use resolver::resolve_server;

use crate::attributes::{AttributeCollection, AttributeValue, DISTINGUISHED_NAME};
use crate::cache::{CacheStats, QueryCache};
use crate::error::{DirectoryError, DirectoryResult};
use crate::object::DirectoryObject;
use crate::query::filter;
use crate::query::{QueryConfig, SearchScope};
use crate::transport::{DirectoryConnector, DirectoryTransport, ServerEndpoint};
use crate::validation::require_non_empty;
use chrono::{DateTime, Utc};
use log::{debug, info, trace};
use uuid::Uuid;

/// A session against one directory server.
#[derive(Debug)]
pub struct DirectorySession<T: DirectoryTransport> {
    transport: T,
    server: String,
    naming_context: String,
    query_config: QueryConfig,
    cache: QueryCache,
}

impl<T: DirectoryTransport> DirectorySession<T> {
    /// Resolve a server, bind to it and read its naming context.
    pub async fn connect<C>(config: SessionConfig, connector: &C) -> DirectoryResult<Self>
    where
        C: DirectoryConnector<Transport = T>,
    {
        config.validate()?;
        let host = resolve_server(&config, connector).await?;
        let endpoint = ServerEndpoint {
            host: host.clone(),
            port: config.port,
            credentials: config.credentials.clone(),
        };
        let transport = connector
            .connect(&endpoint)
            .await
            .map_err(|e| DirectoryError::Connection {
                server: Some(endpoint.to_string()),
                message: e.to_string(),
            })?;
        info!("Connected to directory server {}", endpoint);
        Self::with_transport(transport, host, &config).await
    }

    /// Wrap an already bound transport.
    pub async fn with_transport(
        transport: T,
        server: impl Into<String>,
        config: &SessionConfig,
    ) -> DirectoryResult<Self> {
        let server = server.into();
        let naming_context = transport
            .default_naming_context()
            .await
            .map_err(|e| DirectoryError::Connection {
                server: Some(server.clone()),
                message: e.to_string(),
            })?;
        let base_dn = crate::validation::trim_or_none(config.base_dn.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| naming_context.clone());
        let query_config = QueryConfig::new(base_dn).with_page_size(config.page_size);
        debug!(
            "Session on '{}' with naming context '{}' and base '{}'",
            server, naming_context, query_config.base_dn
        );

        Ok(Self {
            transport,
            server,
            naming_context,
            query_config,
            cache: QueryCache::new(config.cache_policy),
        })
    }

    /// Host name of the bound server.
    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Configuration used when a lookup does not supply one.
    pub fn query_config(&self) -> &QueryConfig {
        &self.query_config
    }

    /// Base distinguished name of the domain.
    pub fn distinguished_name(&self) -> &str {
        &self.naming_context
    }

    // ---------------------------------------------------------------------
    // Entry primitives

    /// Paged search; every page concatenated in server order.
    pub async fn entry_get(
        &self,
        filter: Option<&str>,
        config: &QueryConfig,
    ) -> DirectoryResult<Vec<AttributeCollection>> {
        self.transport
            .entry_get(filter, config)
            .await
            .map_err(|e| DirectoryError::search(filter, e))
    }

    /// Create an entry.
    pub async fn entry_add(
        &self,
        distinguished_name: &str,
        attributes: Vec<(String, AttributeValue)>,
    ) -> DirectoryResult<()> {
        self.transport
            .entry_add(distinguished_name, attributes)
            .await
            .map_err(|e| DirectoryError::modify(distinguished_name, None, e))?;
        info!("Added entry '{}'", distinguished_name);
        Ok(())
    }

    /// Delete an entry; `Ok(false)` when it does not exist.
    pub async fn entry_delete(&self, distinguished_name: &str) -> DirectoryResult<bool> {
        let deleted = self
            .transport
            .entry_delete(distinguished_name)
            .await
            .map_err(|e| DirectoryError::modify(distinguished_name, None, e))?;
        if deleted {
            info!("Deleted entry '{}'", distinguished_name);
        }
        Ok(deleted)
    }

    /// Move and/or rename an entry.
    pub async fn entry_move_rename(
        &self,
        distinguished_name: &str,
        new_parent_dn: &str,
        new_common_name: &str,
    ) -> DirectoryResult<()> {
        self.transport
            .entry_move_rename(distinguished_name, new_parent_dn, new_common_name)
            .await
            .map_err(|e| DirectoryError::modify(distinguished_name, None, e))?;
        info!(
            "Moved entry '{}' to CN={} under '{}'",
            distinguished_name, new_common_name, new_parent_dn
        );
        Ok(())
    }

    /// Replace every value of one attribute.
    pub async fn attribute_save(
        &self,
        distinguished_name: &str,
        attribute: &str,
        values: Vec<AttributeValue>,
    ) -> DirectoryResult<bool> {
        let count = values.len();
        let saved = self
            .transport
            .attribute_save(distinguished_name, attribute, values)
            .await
            .map_err(|e| DirectoryError::modify(distinguished_name, Some(attribute), e))?;
        info!(
            "Saved {} value(s) of '{}' on '{}'",
            count, attribute, distinguished_name
        );
        Ok(saved)
    }

    /// Extended account handle for an entry, if it is an account.
    pub async fn account_handle(&self, distinguished_name: &str) -> DirectoryResult<Option<T::Account>> {
        self.transport
            .account_handle(distinguished_name)
            .await
            .map_err(|e| DirectoryError::modify(distinguished_name, None, e))
    }

    // ---------------------------------------------------------------------
    // Lookups

    /// Objects matching `filter` under the default configuration.
    pub async fn get_objects(
        &mut self,
        filter: Option<&str>,
        use_cache: bool,
    ) -> DirectoryResult<Vec<DirectoryObject>> {
        let config = self.query_config.clone();
        self.get_objects_with(filter, &config, use_cache).await
    }

    /// Objects matching `filter` under `config`.
    ///
    /// With `use_cache` a cached result for exactly this (filter, config) is
    /// returned without I/O. Fresh results are always stored in the cache.
    pub async fn get_objects_with(
        &mut self,
        filter: Option<&str>,
        config: &QueryConfig,
        use_cache: bool,
    ) -> DirectoryResult<Vec<DirectoryObject>> {
        if use_cache {
            if let Some(objects) = self.cache.get(filter, config) {
                trace!(
                    "Using cache of [{}] objects for query: {}",
                    objects.len(),
                    filter.unwrap_or("<all>")
                );
                return Ok(objects);
            }
        }

        let collections = self.entry_get(filter, config).await?;
        debug!(
            "Query filter[{}] retrieved {} objects",
            filter.unwrap_or("<all>"),
            collections.len()
        );
        let objects: Vec<DirectoryObject> = collections.into_iter().map(DirectoryObject::new).collect();
        self.cache.add(filter, objects.clone(), config);
        Ok(objects)
    }

    /// Objects whose attribute equals `value`.
    ///
    /// Both arguments are trimmed and must not be empty. The value is escaped,
    /// so `*` matches literally.
    pub async fn get_objects_by_attribute(
        &mut self,
        attribute: &str,
        value: &str,
        use_cache: bool,
    ) -> DirectoryResult<Vec<DirectoryObject>> {
        let attribute = require_non_empty("attribute", attribute)?;
        let value = require_non_empty("value", value)?;
        let filter = filter::equals(attribute, value);
        self.get_objects(Some(&filter), use_cache).await
    }

    pub async fn get_object_by_distinguished_name(
        &mut self,
        distinguished_name: &str,
        use_cache: bool,
    ) -> DirectoryResult<Option<DirectoryObject>> {
        let found = self
            .get_objects_by_attribute(DISTINGUISHED_NAME, distinguished_name, use_cache)
            .await?;
        Ok(found.into_iter().next())
    }

    pub async fn get_object_by_sam_account_name(
        &mut self,
        sam_account_name: &str,
        use_cache: bool,
    ) -> DirectoryResult<Option<DirectoryObject>> {
        let found = self
            .get_objects_by_attribute("sAMAccountName", sam_account_name, use_cache)
            .await?;
        Ok(found.into_iter().next())
    }

    pub async fn get_object_by_object_guid(
        &mut self,
        object_guid: Uuid,
        use_cache: bool,
    ) -> DirectoryResult<Option<DirectoryObject>> {
        let filter = filter::object_guid_equals(object_guid);
        let found = self.get_objects(Some(&filter), use_cache).await?;
        Ok(found.into_iter().next())
    }

    // ---------------------------------------------------------------------
    // Named queries

    /// Every entry under the base DN.
    pub async fn get_all(&mut self, use_cache: bool) -> DirectoryResult<Vec<DirectoryObject>> {
        self.get_objects(None, use_cache).await
    }

    pub async fn get_users(&mut self, use_cache: bool) -> DirectoryResult<Vec<DirectoryObject>> {
        self.get_objects(Some(filter::USERS), use_cache).await
    }

    /// Users whose `whenChanged` lies within `[start, end]`.
    pub async fn get_users_by_modified(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        use_cache: bool,
    ) -> DirectoryResult<Vec<DirectoryObject>> {
        let filter = filter::users_modified_between(start, end);
        self.get_objects(Some(&filter), use_cache).await
    }

    /// Users whose `lastLogonTimestamp` lies within `[start, end]`.
    pub async fn get_users_by_last_logon_timestamp(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        use_cache: bool,
    ) -> DirectoryResult<Vec<DirectoryObject>> {
        let filter = filter::users_last_logon_between(start, end);
        self.get_objects(Some(&filter), use_cache).await
    }

    pub async fn get_users_without_last_logon_timestamp(
        &mut self,
        use_cache: bool,
    ) -> DirectoryResult<Vec<DirectoryObject>> {
        self.get_objects(Some(filter::USERS_WITHOUT_LAST_LOGON_TIMESTAMP), use_cache)
            .await
    }

    pub async fn get_computers(&mut self, use_cache: bool) -> DirectoryResult<Vec<DirectoryObject>> {
        self.get_objects(Some(filter::COMPUTERS), use_cache).await
    }

    pub async fn get_groups(&mut self, use_cache: bool) -> DirectoryResult<Vec<DirectoryObject>> {
        self.get_objects(Some(filter::GROUPS), use_cache).await
    }

    /// Groups without any `member` value.
    pub async fn get_groups_empty(&mut self, use_cache: bool) -> DirectoryResult<Vec<DirectoryObject>> {
        self.get_objects(Some(filter::GROUPS_EMPTY), use_cache).await
    }

    // ---------------------------------------------------------------------
    // Domain information

    async fn domain_attribute(&self, attribute: &str) -> DirectoryResult<Option<String>> {
        let config = QueryConfig::new(self.naming_context.clone())
            .with_scope(SearchScope::Base)
            .with_attributes([attribute]);
        let filter = filter::equals(DISTINGUISHED_NAME, &self.naming_context);
        let found = self.entry_get(Some(&filter), &config).await?;
        Ok(found.first().and_then(|entry| entry.get_string(attribute)))
    }

    /// DNS name of the domain, e.g. `example.com`.
    pub async fn domain_name(&self) -> DirectoryResult<Option<String>> {
        Ok(self
            .domain_attribute("canonicalName")
            .await?
            .map(|name| name.replace('/', "")))
    }

    /// NT-style domain name, e.g. `EXAMPLE`.
    pub async fn nt_name(&self) -> DirectoryResult<Option<String>> {
        Ok(self
            .domain_attribute("msDS-PrincipalName")
            .await?
            .map(|name| name.replace('\\', "")))
    }

    pub fn administrators_group_dn(&self) -> String {
        format!("CN=Administrators,CN=Builtin,{}", self.naming_context)
    }

    pub fn domain_admins_group_dn(&self) -> String {
        format!("CN=Domain Admins,CN=Users,{}", self.naming_context)
    }

    pub fn domain_users_group_dn(&self) -> String {
        format!("CN=Domain Users,CN=Users,{}", self.naming_context)
    }

    pub fn enterprise_admins_group_dn(&self) -> String {
        format!("CN=Enterprise Admins,CN=Users,{}", self.naming_context)
    }

    /// Append the domain's DN to a path relative to the root.
    ///
    /// A whitespace-only path yields the domain's DN, `None` yields `None`.
    pub fn append_distinguished_name(&self, relative: Option<&str>) -> Option<String> {
        let relative = relative?;
        if relative.trim().is_empty() {
            Some(self.naming_context.clone())
        } else {
            Some(format!("{},{}", relative, self.naming_context))
        }
    }

    // ---------------------------------------------------------------------
    // Cache control

    /// Drop every cached query result.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        debug!("Cleared query cache");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
