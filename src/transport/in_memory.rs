//! In-memory directory transport.
//!
//! A thread-safe directory held in memory, for tests and for developing against
//! a fake domain. It behaves like a small Active Directory:
//!
//! * filters are evaluated with [`Filter`], honouring base DN, scope,
//!   requested attributes and page size
//! * entries are returned in insertion order
//! * writes replace snapshots; `member` changes maintain `memberOf` on the
//!   targets, and deletes and renames fix up references
//! * `pwdLastSet = -1` is stored as the current time
//! * new users, computers and groups get `objectCategory`, and accounts an
//!   initial `userAccountControl` and `pwdLastSet`, unless supplied
//! * every request is counted so tests can assert how often the directory was hit
//!
//! # Example
//!
//! ```rust
//! use ad_directory::attributes::AttributeCollection;
//! use ad_directory::query::QueryConfig;
//! use ad_directory::transport::{DirectoryTransport, InMemoryTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = InMemoryTransport::new("DC=example,DC=com");
//! directory
//!     .insert(
//!         AttributeCollection::builder("CN=jdoe,DC=example,DC=com")
//!             .attribute("sAMAccountName", "jdoe")
//!             .build(),
//!     )
//!     .await;
//!
//! let found = directory
//!     .entry_get(Some("(sAMAccountName=jdoe)"), &QueryConfig::new("DC=example,DC=com"))
//!     .await?;
//! assert_eq!(found.len(), 1);
//! assert_eq!(directory.stats().await.searches, 1);
//! # Ok(())
//! # }
//! ```

use crate::attributes::time::datetime_to_filetime;
use crate::attributes::{AttributeCollection, AttributeValue, OBJECT_GUID};
use crate::dn;
use crate::query::filter::Filter;
use crate::query::{QueryConfig, SearchScope};
use crate::transport::{
    AccountHandle, DirectoryConnector, DirectoryTransport, ServerEndpoint, TransportError,
    TransportResult,
};
use chrono::{DateTime, Utc};
use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Request counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InMemoryTransportStats {
    pub searches: usize,
    pub pages: usize,
    pub adds: usize,
    pub deletes: usize,
    pub moves: usize,
    pub attribute_saves: usize,
    pub account_handles: usize,
}

/// Extended account state of one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountState {
    pub disabled: Option<bool>,
    pub locked: Option<bool>,
    pub password_expiration_date: Option<DateTime<Utc>>,
    pub user_cannot_change_password: Option<bool>,
    pub password: Option<String>,
    pub password_expired_now: bool,
    /// Make every read through the handle fail.
    pub fail_reads: bool,
}

#[derive(Debug, Default)]
struct DirectoryState {
    naming_context: String,
    entries: Vec<AttributeCollection>,
    // keyed by lowercased DN
    accounts: HashMap<String, AccountState>,
    stats: InMemoryTransportStats,
    offline: bool,
}

impl DirectoryState {
    fn position(&self, distinguished_name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| dn::equals(e.distinguished_name(), distinguished_name))
    }

    fn exists(&self, distinguished_name: &str) -> bool {
        dn::equals(distinguished_name, &self.naming_context) || self.position(distinguished_name).is_some()
    }

    fn check_online(&self) -> TransportResult<()> {
        if self.offline {
            return Err(TransportError::Connection {
                message: "directory is offline".to_string(),
            });
        }
        Ok(())
    }

    fn replace(&mut self, index: usize, entry: AttributeCollection) {
        self.entries[index] = entry;
    }

    /// Add or drop `group_dn` in the `memberOf` of each target.
    fn sync_member_of(&mut self, group_dn: &str, added: &[String], removed: &[String]) {
        for target in added {
            if let Some(index) = self.position(target) {
                let entry = &self.entries[index];
                let mut member_of = entry.get_strings("memberOf");
                if !member_of.iter().any(|m| dn::equals(m, group_dn)) {
                    member_of.push(group_dn.to_string());
                    let updated = entry.with_attribute("memberOf", member_of.into());
                    self.replace(index, updated);
                }
            }
        }
        for target in removed {
            if let Some(index) = self.position(target) {
                let entry = &self.entries[index];
                let member_of: Vec<String> = entry
                    .get_strings("memberOf")
                    .into_iter()
                    .filter(|m| !dn::equals(m, group_dn))
                    .collect();
                let updated = entry.with_attribute("memberOf", member_of.into());
                self.replace(index, updated);
            }
        }
    }

    /// Rewrite every `member`/`memberOf` value equal to `old` (None drops it).
    fn rewrite_references(&mut self, old: &str, new: Option<&str>) {
        for index in 0..self.entries.len() {
            let mut entry = self.entries[index].clone();
            for attribute in ["member", "memberOf"] {
                let values = entry.get_strings(attribute);
                if !values.iter().any(|v| dn::equals(v, old)) {
                    continue;
                }
                let rewritten: Vec<String> = values
                    .into_iter()
                    .filter_map(|v| {
                        if dn::equals(&v, old) {
                            new.map(str::to_string)
                        } else {
                            Some(v)
                        }
                    })
                    .collect();
                entry = entry.with_attribute(attribute, rewritten.into());
            }
            self.entries[index] = entry;
        }
    }
}

/// Thread-safe in-memory directory.
#[derive(Debug, Clone)]
pub struct InMemoryTransport {
    state: Arc<RwLock<DirectoryState>>,
}

impl InMemoryTransport {
    /// An empty directory whose domain root is `naming_context`.
    ///
    /// The root entry carries `canonicalName` and `msDS-PrincipalName` derived
    /// from the DC components, so `DC=example,DC=com` is `example.com/` and
    /// `EXAMPLE\`.
    pub fn new(naming_context: impl Into<String>) -> Self {
        let naming_context = naming_context.into();
        let dc_labels: Vec<&str> = dn::components(&naming_context)
            .into_iter()
            .filter(|(t, _)| t.eq_ignore_ascii_case("DC"))
            .map(|(_, v)| v)
            .collect();
        let canonical = format!("{}/", dc_labels.join("."));
        let principal = format!(
            "{}\\",
            dc_labels.first().map(|l| l.to_ascii_uppercase()).unwrap_or_default()
        );
        let root = AttributeCollection::builder(naming_context.clone())
            .object_guid(Uuid::new_v4())
            .attribute("objectClass", vec!["top", "domain", "domainDNS"])
            .attribute("canonicalName", canonical)
            .attribute("msDS-PrincipalName", principal)
            .build();

        Self {
            state: Arc::new(RwLock::new(DirectoryState {
                naming_context,
                entries: vec![root],
                ..DirectoryState::default()
            })),
        }
    }

    /// Insert a snapshot as-is, replacing an entry with the same DN.
    ///
    /// No back-links are maintained; seed `memberOf` explicitly when needed.
    pub async fn insert(&self, entry: AttributeCollection) {
        let mut state = self.state.write().await;
        match state.position(entry.distinguished_name()) {
            Some(index) => state.replace(index, entry),
            None => state.entries.push(entry),
        }
    }

    /// Current snapshot of an entry, bypassing counters.
    pub async fn entry(&self, distinguished_name: &str) -> Option<AttributeCollection> {
        let state = self.state.read().await;
        state
            .position(distinguished_name)
            .map(|index| state.entries[index].clone())
    }

    /// Seed or replace the extended account state of an entry.
    pub async fn set_account(&self, distinguished_name: &str, account: AccountState) {
        let mut state = self.state.write().await;
        state
            .accounts
            .insert(distinguished_name.to_ascii_lowercase(), account);
    }

    /// Extended account state of an entry.
    pub async fn account(&self, distinguished_name: &str) -> Option<AccountState> {
        let state = self.state.read().await;
        state
            .accounts
            .get(&distinguished_name.to_ascii_lowercase())
            .cloned()
    }

    /// While offline every request fails with a connection error.
    pub async fn set_offline(&self, offline: bool) {
        self.state.write().await.offline = offline;
    }

    pub async fn stats(&self) -> InMemoryTransportStats {
        self.state.read().await.stats
    }

    pub async fn reset_stats(&self) {
        self.state.write().await.stats = InMemoryTransportStats::default();
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

fn in_scope(entry_dn: &str, config: &QueryConfig) -> bool {
    match config.scope {
        SearchScope::Base => dn::equals(entry_dn, &config.base_dn),
        SearchScope::OneLevel => dn::is_child_of(entry_dn, &config.base_dn),
        SearchScope::Subtree => dn::is_within(entry_dn, &config.base_dn),
    }
}

// Attributes a domain controller assigns to a new entry of a known class.
fn server_defaults(
    naming_context: &str,
    requested: &[(String, AttributeValue)],
) -> Vec<(&'static str, AttributeValue)> {
    let has = |name: &str| requested.iter().any(|(n, _)| n.eq_ignore_ascii_case(name));
    let class = requested
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("objectClass"))
        .map(|(_, v)| {
            v.values()
                .iter()
                .filter_map(AttributeValue::to_text)
                .map(|c| c.to_ascii_lowercase())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let (category, account_control) = if class.iter().any(|c| c == "computer") {
        ("Computer", Some("4096"))
    } else if class.iter().any(|c| c == "user") {
        // disabled, password not required, normal account
        ("Person", Some("546"))
    } else if class.iter().any(|c| c == "group") {
        ("Group", None)
    } else {
        return Vec::new();
    };

    let mut defaults = Vec::new();
    if !has("objectCategory") {
        defaults.push((
            "objectCategory",
            AttributeValue::from(format!("CN={category},CN=Schema,CN=Configuration,{naming_context}")),
        ));
    }
    if let Some(control) = account_control {
        if !has("userAccountControl") {
            defaults.push(("userAccountControl", AttributeValue::from(control)));
        }
        if !has("pwdLastSet") {
            defaults.push(("pwdLastSet", AttributeValue::from("0")));
        }
    }
    defaults
}

impl DirectoryTransport for InMemoryTransport {
    type Account = InMemoryAccount;

    async fn default_naming_context(&self) -> TransportResult<String> {
        let state = self.state.read().await;
        state.check_online()?;
        Ok(state.naming_context.clone())
    }

    async fn entry_get(
        &self,
        filter: Option<&str>,
        config: &QueryConfig,
    ) -> TransportResult<Vec<AttributeCollection>> {
        let parsed = filter
            .map(Filter::parse)
            .transpose()
            .map_err(|e| TransportError::Search {
                message: e.to_string(),
            })?;

        let mut state = self.state.write().await;
        state.check_online()?;

        let found: Vec<AttributeCollection> = state
            .entries
            .iter()
            .filter(|e| in_scope(e.distinguished_name(), config))
            .filter(|e| parsed.as_ref().is_none_or(|f| f.matches(e)))
            .map(|e| e.project(&config.attributes))
            .collect();

        let page_size = config.page_size.max(1) as usize;
        let pages = found.len().div_ceil(page_size).max(1);
        state.stats.searches += 1;
        state.stats.pages += pages;
        trace!(
            "In-memory search {:?} under '{}' matched {} entries in {} pages",
            filter, config.base_dn, found.len(), pages
        );
        Ok(found)
    }

    async fn entry_add(
        &self,
        distinguished_name: &str,
        attributes: Vec<(String, AttributeValue)>,
    ) -> TransportResult<()> {
        let mut state = self.state.write().await;
        state.check_online()?;
        state.stats.adds += 1;

        if state.position(distinguished_name).is_some() {
            return Err(TransportError::AlreadyExists {
                distinguished_name: distinguished_name.to_string(),
            });
        }
        let parent = dn::parent(distinguished_name).unwrap_or_default();
        if !state.exists(parent) {
            return Err(TransportError::NotFound {
                distinguished_name: parent.to_string(),
            });
        }

        let now = Utc::now();
        let mut builder = AttributeCollection::builder(distinguished_name);
        if !attributes.iter().any(|(n, _)| n.eq_ignore_ascii_case(OBJECT_GUID)) {
            builder = builder.object_guid(Uuid::new_v4());
        }
        if let Some(cn) = dn::rdn_value(distinguished_name).map(dn::unescape_rdn_value) {
            builder = builder.attribute("cn", cn.as_str()).attribute("name", cn);
        }
        builder = builder
            .attribute("whenCreated", now)
            .attribute("whenChanged", now);
        for (name, value) in server_defaults(&state.naming_context, &attributes) {
            builder = builder.attribute(name, value);
        }
        for (name, value) in attributes {
            builder = builder.attribute(name, value);
        }
        let entry = builder.build();
        let members = entry.get_strings("member");
        state.entries.push(entry);
        state.sync_member_of(distinguished_name, &members, &[]);

        debug!("In-memory directory added '{}'", distinguished_name);
        Ok(())
    }

    async fn entry_delete(&self, distinguished_name: &str) -> TransportResult<bool> {
        let mut state = self.state.write().await;
        state.check_online()?;
        state.stats.deletes += 1;

        let Some(index) = state.position(distinguished_name) else {
            return Ok(false);
        };
        state.entries.remove(index);
        state.accounts.remove(&distinguished_name.to_ascii_lowercase());
        state.rewrite_references(distinguished_name, None);
        debug!("In-memory directory deleted '{}'", distinguished_name);
        Ok(true)
    }

    async fn entry_move_rename(
        &self,
        distinguished_name: &str,
        new_parent_dn: &str,
        new_common_name: &str,
    ) -> TransportResult<()> {
        let mut state = self.state.write().await;
        state.check_online()?;
        state.stats.moves += 1;

        let index = state
            .position(distinguished_name)
            .ok_or_else(|| TransportError::NotFound {
                distinguished_name: distinguished_name.to_string(),
            })?;
        if !state.exists(new_parent_dn) {
            return Err(TransportError::NotFound {
                distinguished_name: new_parent_dn.to_string(),
            });
        }
        let rdn_type = dn::rdn_type(distinguished_name).unwrap_or("CN");
        let new_dn = format!(
            "{}={},{}",
            rdn_type,
            dn::escape_rdn_value(new_common_name),
            new_parent_dn
        );
        if !dn::equals(&new_dn, distinguished_name) && state.position(&new_dn).is_some() {
            return Err(TransportError::AlreadyExists {
                distinguished_name: new_dn,
            });
        }

        let old_dn = state.entries[index].distinguished_name().to_string();
        let moved = state.entries[index]
            .with_distinguished_name(&new_dn)
            .with_attribute("cn", new_common_name.into())
            .with_attribute("name", new_common_name.into());
        state.replace(index, moved);

        // descendants follow their container
        let old_suffix = format!(",{}", old_dn.to_ascii_lowercase());
        let mut renamed = vec![(old_dn.clone(), new_dn.clone())];
        for i in 0..state.entries.len() {
            let child_dn = state.entries[i].distinguished_name().to_string();
            if child_dn.to_ascii_lowercase().ends_with(&old_suffix) {
                let prefix = &child_dn[..child_dn.len() - old_suffix.len()];
                let child_new = format!("{prefix},{new_dn}");
                let child = state.entries[i].with_distinguished_name(&child_new);
                state.replace(i, child);
                renamed.push((child_dn, child_new));
            }
        }
        for (old, new) in &renamed {
            state.rewrite_references(old, Some(new.as_str()));
            if let Some(account) = state.accounts.remove(&old.to_ascii_lowercase()) {
                state.accounts.insert(new.to_ascii_lowercase(), account);
            }
        }

        debug!("In-memory directory moved '{}' to '{}'", old_dn, new_dn);
        Ok(())
    }

    async fn attribute_save(
        &self,
        distinguished_name: &str,
        attribute: &str,
        values: Vec<AttributeValue>,
    ) -> TransportResult<bool> {
        let mut state = self.state.write().await;
        state.check_online()?;
        state.stats.attribute_saves += 1;

        let index = state
            .position(distinguished_name)
            .ok_or_else(|| TransportError::NotFound {
                distinguished_name: distinguished_name.to_string(),
            })?;

        let values: Vec<AttributeValue> = if attribute.eq_ignore_ascii_case("pwdLastSet") {
            values
                .into_iter()
                .map(|v| match v.to_text().as_deref() {
                    Some("-1") => AttributeValue::Integer(datetime_to_filetime(Utc::now())),
                    _ => v,
                })
                .collect()
        } else {
            values
        };

        let entry = &state.entries[index];
        let group_dn = entry.distinguished_name().to_string();
        let before: HashSet<String> = if attribute.eq_ignore_ascii_case("member") {
            entry
                .get_strings("member")
                .into_iter()
                .map(|m| m.to_ascii_lowercase())
                .collect()
        } else {
            HashSet::new()
        };

        let value = match values.len() {
            1 => values.into_iter().next().unwrap_or(AttributeValue::Multi(Vec::new())),
            _ => AttributeValue::Multi(values),
        };
        let updated = entry
            .with_attribute(attribute, value)
            .with_attribute("whenChanged", Utc::now().into());
        let after = updated.get_strings(attribute);
        state.replace(index, updated);

        if attribute.eq_ignore_ascii_case("member") {
            let after_lower: HashSet<String> = after.iter().map(|m| m.to_ascii_lowercase()).collect();
            let added: Vec<String> = after
                .iter()
                .filter(|m| !before.contains(&m.to_ascii_lowercase()))
                .cloned()
                .collect();
            let removed: Vec<String> = before
                .iter()
                .filter(|m| !after_lower.contains(*m))
                .cloned()
                .collect();
            state.sync_member_of(&group_dn, &added, &removed);
        }

        trace!("In-memory directory saved '{}' on '{}'", attribute, group_dn);
        Ok(true)
    }

    async fn account_handle(&self, distinguished_name: &str) -> TransportResult<Option<InMemoryAccount>> {
        let mut state = self.state.write().await;
        state.check_online()?;
        state.stats.account_handles += 1;

        let Some(index) = state.position(distinguished_name) else {
            return Ok(None);
        };
        let is_account = state.entries[index]
            .get_strings("objectClass")
            .iter()
            .any(|c| c.eq_ignore_ascii_case("user") || c.eq_ignore_ascii_case("computer"));
        if !is_account {
            return Ok(None);
        }
        let key = distinguished_name.to_ascii_lowercase();
        state.accounts.entry(key.clone()).or_default();
        Ok(Some(InMemoryAccount {
            state: Arc::clone(&self.state),
            key,
        }))
    }
}

/// Extended account handle into an [`InMemoryTransport`].
#[derive(Debug, Clone)]
pub struct InMemoryAccount {
    state: Arc<RwLock<DirectoryState>>,
    key: String,
}

impl InMemoryAccount {
    async fn read<T>(&self, read: impl FnOnce(&AccountState) -> T) -> TransportResult<T> {
        let state = self.state.read().await;
        state.check_online()?;
        let account = state.accounts.get(&self.key).ok_or_else(|| TransportError::NotFound {
            distinguished_name: self.key.clone(),
        })?;
        if account.fail_reads {
            return Err(TransportError::Internal {
                message: "account property unavailable".to_string(),
            });
        }
        Ok(read(account))
    }

    async fn write(&self, write: impl FnOnce(&mut AccountState)) -> TransportResult<()> {
        let mut state = self.state.write().await;
        state.check_online()?;
        let account = state
            .accounts
            .get_mut(&self.key)
            .ok_or_else(|| TransportError::NotFound {
                distinguished_name: self.key.clone(),
            })?;
        write(account);
        Ok(())
    }
}

impl AccountHandle for InMemoryAccount {
    async fn is_disabled(&self) -> TransportResult<Option<bool>> {
        self.read(|a| a.disabled).await
    }

    async fn is_locked(&self) -> TransportResult<Option<bool>> {
        self.read(|a| a.locked).await
    }

    async fn password_expiration_date(&self) -> TransportResult<Option<DateTime<Utc>>> {
        self.read(|a| a.password_expiration_date).await
    }

    async fn user_cannot_change_password(&self) -> TransportResult<Option<bool>> {
        self.read(|a| a.user_cannot_change_password).await
    }

    async fn set_disabled(&self, disabled: bool) -> TransportResult<()> {
        self.write(|a| a.disabled = Some(disabled)).await
    }

    async fn unlock(&self) -> TransportResult<()> {
        self.write(|a| a.locked = Some(false)).await
    }

    async fn set_user_cannot_change_password(&self, value: bool) -> TransportResult<()> {
        self.write(|a| a.user_cannot_change_password = Some(value)).await
    }

    async fn set_password(&self, password: &str) -> TransportResult<()> {
        let password = password.to_string();
        self.write(move |a| a.password = Some(password)).await
    }

    async fn expire_password_now(&self) -> TransportResult<()> {
        self.write(|a| a.password_expired_now = true).await
    }
}

/// Connector handing out clones of one [`InMemoryTransport`].
#[derive(Debug, Clone)]
pub struct InMemoryConnector {
    transport: InMemoryTransport,
    // keyed by (lowercased domain, lowercased site)
    sites: HashMap<(String, String), Vec<String>>,
    joined_domain: Option<String>,
    unreachable: HashSet<String>,
    connections: Arc<RwLock<Vec<ServerEndpoint>>>,
}

impl InMemoryConnector {
    pub fn new(transport: InMemoryTransport) -> Self {
        Self {
            transport,
            sites: HashMap::new(),
            joined_domain: None,
            unreachable: HashSet::new(),
            connections: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register the servers of a site.
    pub fn with_site<I, S>(mut self, domain: &str, site: &str, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sites.insert(
            (domain.to_ascii_lowercase(), site.to_ascii_lowercase()),
            servers.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn with_joined_domain(mut self, domain: impl Into<String>) -> Self {
        self.joined_domain = Some(domain.into());
        self
    }

    /// Make `connect` fail for `host`.
    pub fn with_unreachable(mut self, host: impl Into<String>) -> Self {
        self.unreachable.insert(host.into().to_ascii_lowercase());
        self
    }

    /// Endpoints connected to so far.
    pub async fn connections(&self) -> Vec<ServerEndpoint> {
        self.connections.read().await.clone()
    }
}

impl DirectoryConnector for InMemoryConnector {
    type Transport = InMemoryTransport;

    async fn servers_for_site(&self, domain: &str, site: &str) -> TransportResult<Vec<String>> {
        Ok(self
            .sites
            .get(&(domain.to_ascii_lowercase(), site.to_ascii_lowercase()))
            .cloned()
            .unwrap_or_default())
    }

    async fn joined_domain(&self) -> TransportResult<Option<String>> {
        Ok(self.joined_domain.clone())
    }

    async fn connect(&self, endpoint: &ServerEndpoint) -> TransportResult<InMemoryTransport> {
        if self.unreachable.contains(&endpoint.host.to_ascii_lowercase()) {
            return Err(TransportError::Connection {
                message: format!("{endpoint} is unreachable"),
            });
        }
        self.connections.write().await.push(endpoint.clone());
        Ok(self.transport.clone())
    }
}
