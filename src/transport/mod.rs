//! Boundary to the directory protocol.
//!
//! The session never speaks the wire protocol itself. It drives a
//! [`DirectoryTransport`] that is already bound to one server, and a
//! [`DirectoryConnector`] that knows how to find servers and open transports.
//! Bind, TLS, framing and paging control are the implementation's business.
//!
//! Like the rest of the crate, the traits are async: methods return futures and
//! implementations may use `async fn`. Each method corresponds to exactly one
//! logical request; the session never retries.
//!
//! [`in_memory`] provides a complete implementation backed by a map of
//! snapshots, used for tests and for developing against a fake directory.

pub mod in_memory;

pub use in_memory::{InMemoryAccount, InMemoryConnector, InMemoryTransport, InMemoryTransportStats};

use crate::attributes::{AttributeCollection, AttributeValue};
use crate::query::QueryConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// Default LDAP port.
pub const LDAP_PORT: u16 = 389;

/// Failures reported by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Search failed: {message}")]
    Search { message: String },

    #[error("Request rejected: {message}")]
    Rejected { message: String },

    #[error("No such entry: {distinguished_name}")]
    NotFound { distinguished_name: String },

    #[error("Entry already exists: {distinguished_name}")]
    AlreadyExists { distinguished_name: String },

    #[error("Internal transport error: {message}")]
    Internal { message: String },
}

/// Result type for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Bind credentials. `Debug` never shows the password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// NT domain for the bind, when it differs from the server's.
    #[serde(default)]
    pub domain: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

/// The server a session binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
    /// `None` binds with the caller's logon credentials.
    pub credentials: Option<Credentials>,
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Entry-level requests against one bound server.
pub trait DirectoryTransport: Send + Sync {
    /// Handle type of the extended account-management facility.
    type Account: AccountHandle;

    /// The server's default naming context (the domain's base DN).
    fn default_naming_context(&self) -> impl Future<Output = TransportResult<String>> + Send;

    /// Paged search; all pages concatenated in server order. `None` matches
    /// every entry in scope.
    fn entry_get(
        &self,
        filter: Option<&str>,
        config: &QueryConfig,
    ) -> impl Future<Output = TransportResult<Vec<AttributeCollection>>> + Send;

    /// Create an entry. Fails if the parent is missing or the entry exists.
    fn entry_add(
        &self,
        distinguished_name: &str,
        attributes: Vec<(String, AttributeValue)>,
    ) -> impl Future<Output = TransportResult<()>> + Send;

    /// Delete an entry; `Ok(false)` when it does not exist.
    fn entry_delete(&self, distinguished_name: &str) -> impl Future<Output = TransportResult<bool>> + Send;

    /// Move and/or rename an entry in one request. The GUID is preserved.
    /// `new_common_name` is the plain value; the transport escapes it.
    fn entry_move_rename(
        &self,
        distinguished_name: &str,
        new_parent_dn: &str,
        new_common_name: &str,
    ) -> impl Future<Output = TransportResult<()>> + Send;

    /// Replace every value of one attribute. An empty list clears it.
    fn attribute_save(
        &self,
        distinguished_name: &str,
        attribute: &str,
        values: Vec<AttributeValue>,
    ) -> impl Future<Output = TransportResult<bool>> + Send;

    /// Open the extended account facility for an entry; `None` when the entry
    /// is not an account.
    fn account_handle(
        &self,
        distinguished_name: &str,
    ) -> impl Future<Output = TransportResult<Option<Self::Account>>> + Send;
}

/// Extended account-management facility for one account.
///
/// These properties are expensive to read, so directory objects fetch them at
/// most once per refresh.
pub trait AccountHandle: Send + Sync {
    fn is_disabled(&self) -> impl Future<Output = TransportResult<Option<bool>>> + Send;

    fn is_locked(&self) -> impl Future<Output = TransportResult<Option<bool>>> + Send;

    fn password_expiration_date(
        &self,
    ) -> impl Future<Output = TransportResult<Option<DateTime<Utc>>>> + Send;

    fn user_cannot_change_password(&self) -> impl Future<Output = TransportResult<Option<bool>>> + Send;

    fn set_disabled(&self, disabled: bool) -> impl Future<Output = TransportResult<()>> + Send;

    /// Clear the lockout state.
    fn unlock(&self) -> impl Future<Output = TransportResult<()>> + Send;

    fn set_user_cannot_change_password(
        &self,
        value: bool,
    ) -> impl Future<Output = TransportResult<()>> + Send;

    fn set_password(&self, password: &str) -> impl Future<Output = TransportResult<()>> + Send;

    fn expire_password_now(&self) -> impl Future<Output = TransportResult<()>> + Send;
}

/// Locates servers and opens transports.
pub trait DirectoryConnector: Send + Sync {
    type Transport: DirectoryTransport;

    /// Servers serving `site` in `domain`; may be empty.
    fn servers_for_site(
        &self,
        domain: &str,
        site: &str,
    ) -> impl Future<Output = TransportResult<Vec<String>>> + Send;

    /// DNS name of the domain the local machine is joined to, if any.
    fn joined_domain(&self) -> impl Future<Output = TransportResult<Option<String>>> + Send;

    /// Bind to `endpoint`.
    fn connect(
        &self,
        endpoint: &ServerEndpoint,
    ) -> impl Future<Output = TransportResult<Self::Transport>> + Send;
}
