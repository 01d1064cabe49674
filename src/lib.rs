//! Active Directory object model for Rust.
//!
//! Wraps a directory connection in a [`DirectorySession`] that caches search
//! results, resolves well-known names, and creates, moves, renames and deletes
//! entries. Entries come back as [`DirectoryObject`] snapshots with typed
//! accessors, write-through attribute setters, account-control helpers and
//! membership traversal that terminates on cyclic group nesting.
//!
//! # Core Components
//!
//! - [`DirectorySession`] - Bound connection, query cache and entry actions
//! - [`DirectoryObject`] - Snapshot of one entry with typed accessors
//! - [`DirectoryTransport`] - Trait for the wire protocol behind a session
//! - [`QueryCache`] - Filter-keyed result cache with optional LRU bound
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ad_directory::{DirectorySession, SessionConfig};
//! use ad_directory::transport::{InMemoryConnector, InMemoryTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connector = InMemoryConnector::new(InMemoryTransport::new("DC=example,DC=com"));
//! let config = SessionConfig::default().with_server("dc1.example.com");
//! let mut session = DirectorySession::connect(config, &connector).await?;
//!
//! for user in session.get_users(true).await? {
//!     println!("{} {:?}", user, user.sam_account_name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod cache;
pub mod dn;
pub mod error;
pub mod flags;
pub mod graph;
pub mod object;
pub mod query;
pub mod session;
pub mod transport;
pub mod validation;

// Re-export commonly used types for convenience
pub use attributes::{AttributeCollection, AttributeValue};
pub use cache::{CachePolicy, CacheStats, QueryCache};
pub use error::{DirectoryError, DirectoryResult, ValidationError, ValidationResult};
pub use flags::{GroupType, UserAccountControlFlag};
pub use graph::{MembershipDirection, ObjectIdentity};
pub use object::{DirectoryObject, ExtendedAccountState, PropertyRow, PropertyValue};
pub use query::{QueryConfig, SearchScope};
pub use session::{DirectorySession, SessionConfig};
pub use transport::{AccountHandle, Credentials, DirectoryConnector, DirectoryTransport, TransportError};
