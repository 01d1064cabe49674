//! Directory objects.
//!
//! A [`DirectoryObject`] is a typed view over one [`AttributeCollection`]
//! snapshot. Derived properties are parsed from the raw attributes on every
//! access, with two exceptions that are memoized until [`DirectoryObject::refresh`]:
//!
//! * the decoded set of account-control flags
//! * the extended account state (lockout, disabled, password expiration),
//!   which costs an extra round trip and is only fetched on demand
//!
//! Objects never hold a reference to the session. Methods that need I/O take
//! the session explicitly. Every write replaces one attribute's full value list
//! and then re-fetches the entry by GUID.
//!
//! # Example
//!
//! ```rust
//! use ad_directory::attributes::AttributeCollection;
//! use ad_directory::session::{DirectorySession, SessionConfig};
//! use ad_directory::transport::InMemoryTransport;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = InMemoryTransport::new("DC=example,DC=com");
//! directory
//!     .insert(
//!         AttributeCollection::builder("CN=jdoe,DC=example,DC=com")
//!             .object_guid(uuid::Uuid::new_v4())
//!             .attribute("sAMAccountName", "jdoe")
//!             .build(),
//!     )
//!     .await;
//! let mut session =
//!     DirectorySession::with_transport(directory, "dc1", &SessionConfig::default()).await?;
//!
//! let mut user = session.get_object_by_sam_account_name("jdoe", true).await?.unwrap();
//! user.set_description(&mut session, Some("  Accounts payable ")).await?;
//! assert_eq!(user.description().as_deref(), Some("Accounts payable"));
//! # Ok(())
//! # }
//! ```

mod account;
mod membership;
mod properties;

pub use account::ExtendedAccountState;
pub use properties::{PropertyRow, PropertyValue, EXPENSIVE_PROPERTIES, SKIPPED};

use crate::attributes::{AttributeCollection, AttributeValue};
use crate::error::{DirectoryResult, ValidationError};
use crate::flags::UserAccountControlFlag;
use crate::graph::ObjectIdentity;
use crate::session::DirectorySession;
use crate::transport::DirectoryTransport;
use crate::validation::trim_or_none;
use log::warn;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

/// Typed, lazily evaluated view over one directory entry.
#[derive(Debug, Clone)]
pub struct DirectoryObject {
    attributes: AttributeCollection,
    // unset until first use, reset by refresh
    account_controls: OnceLock<BTreeSet<UserAccountControlFlag>>,
    // None until loaded, reset by refresh
    extended: Option<ExtendedAccountState>,
    dangling: bool,
}

impl DirectoryObject {
    pub fn new(attributes: AttributeCollection) -> Self {
        Self {
            attributes,
            account_controls: OnceLock::new(),
            extended: None,
            dangling: false,
        }
    }

    /// The current snapshot.
    pub fn attributes(&self) -> &AttributeCollection {
        &self.attributes
    }

    pub fn distinguished_name(&self) -> &str {
        self.attributes.distinguished_name()
    }

    pub fn object_guid(&self) -> Option<Uuid> {
        self.attributes.object_guid()
    }

    /// Stable key for this object: the GUID, else the lowercased DN.
    pub fn identity(&self) -> ObjectIdentity {
        ObjectIdentity::of(self)
    }

    /// Whether the last refresh found the entry gone.
    pub fn is_dangling(&self) -> bool {
        self.dangling
    }

    /// Compare by distinguished name, ignoring ASCII case.
    pub fn compare_distinguished_name(&self, other: &Self) -> Ordering {
        self.distinguished_name()
            .to_ascii_lowercase()
            .cmp(&other.distinguished_name().to_ascii_lowercase())
    }

    fn clear_memos(&mut self) {
        self.account_controls = OnceLock::new();
        self.extended = None;
    }

    /// Re-fetch this entry, bypassing the cache, and reset memoized state.
    ///
    /// Looks the entry up by GUID, or by DN when the snapshot has no GUID.
    /// Returns `Ok(false)` when the entry no longer exists; the object then
    /// keeps its last snapshot and reports [`is_dangling`](Self::is_dangling).
    pub async fn refresh<T: DirectoryTransport>(
        &mut self,
        session: &mut DirectorySession<T>,
    ) -> DirectoryResult<bool> {
        let fetched = match self.object_guid() {
            Some(guid) => session.get_object_by_object_guid(guid, false).await?,
            None => {
                let dn = self.distinguished_name().trim();
                if dn.is_empty() {
                    return Err(ValidationError::MissingIdentity.into());
                }
                session.get_object_by_distinguished_name(dn, false).await?
            }
        };

        self.clear_memos();
        match fetched {
            Some(fresh) => {
                self.attributes = fresh.attributes;
                self.dangling = false;
                Ok(true)
            }
            None => {
                warn!("Refresh of '{}' found no entry; object is dangling", self);
                self.dangling = true;
                Ok(false)
            }
        }
    }

    /// Replace every value of `attribute`, then refresh.
    pub async fn save_attribute<T: DirectoryTransport>(
        &mut self,
        session: &mut DirectorySession<T>,
        attribute: &str,
        values: Vec<AttributeValue>,
    ) -> DirectoryResult<bool> {
        let saved = session
            .attribute_save(self.distinguished_name(), attribute, values)
            .await?;
        self.refresh(session).await?;
        Ok(saved)
    }

    /// Write a single string value. The value is trimmed; empty or `None`
    /// clears the attribute.
    pub async fn set_string_property<T: DirectoryTransport>(
        &mut self,
        session: &mut DirectorySession<T>,
        attribute: &str,
        value: Option<&str>,
    ) -> DirectoryResult<bool> {
        let values = match trim_or_none(value) {
            Some(value) => vec![AttributeValue::from(value)],
            None => Vec::new(),
        };
        self.save_attribute(session, attribute, values).await
    }
}

impl PartialEq for DirectoryObject {
    /// Equal when both GUIDs are present and match; otherwise when the
    /// distinguished names match ignoring case.
    fn eq(&self, other: &Self) -> bool {
        match (self.object_guid(), other.object_guid()) {
            (Some(a), Some(b)) => a == b,
            _ => self
                .distinguished_name()
                .eq_ignore_ascii_case(other.distinguished_name()),
        }
    }
}

impl fmt::Display for DirectoryObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dn = self.distinguished_name();
        if !dn.is_empty() {
            return f.write_str(dn);
        }
        if let Some(cn) = self.cn() {
            return f.write_str(&cn);
        }
        if let Some(sam) = self.sam_account_name() {
            return f.write_str(&sam);
        }
        match self.object_guid() {
            Some(guid) => write!(f, "{guid}"),
            None => Ok(()),
        }
    }
}
