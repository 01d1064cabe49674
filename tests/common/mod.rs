//! Common test utilities for directory session testing.
//!
//! Provides a seeded in-memory domain, entry builders and a session factory so
//! every suite starts from the same small directory:
//!
//! ```text
//! DC=example,DC=com
//! ├── OU=Staff
//! │   ├── CN=Alice Smith   (user, asmith, member of Engineering)
//! │   ├── CN=Bob Jones     (user, bjones, member of Engineering and Admins)
//! │   └── CN=Carol White   (user, cwhite, disabled, never logged on)
//! ├── OU=Groups
//! │   ├── CN=Engineering   (global security, contains Alice, Bob and Admins)
//! │   ├── CN=Admins        (global security, contains Bob and Engineering)
//! │   └── CN=Empty         (global distribution, no members)
//! ├── OU=Computers
//! │   └── CN=WS01          (computer)
//! └── OU=Archive
//! ```


use ad_directory::transport::InMemoryTransport;
use ad_directory::{DirectorySession, SessionConfig};

pub const NAMING_CONTEXT: &str = "DC=example,DC=com";
pub const STAFF: &str = "OU=Staff,DC=example,DC=com";
pub const GROUPS: &str = "OU=Groups,DC=example,DC=com";
pub const COMPUTERS: &str = "OU=Computers,DC=example,DC=com";
pub const ARCHIVE: &str = "OU=Archive,DC=example,DC=com";

pub const ALICE: &str = "CN=Alice Smith,OU=Staff,DC=example,DC=com";
pub const BOB: &str = "CN=Bob Jones,OU=Staff,DC=example,DC=com";
pub const CAROL: &str = "CN=Carol White,OU=Staff,DC=example,DC=com";
pub const ENGINEERING: &str = "CN=Engineering,OU=Groups,DC=example,DC=com";
pub const ADMINS: &str = "CN=Admins,OU=Groups,DC=example,DC=com";
pub const EMPTY: &str = "CN=Empty,OU=Groups,DC=example,DC=com";
pub const WS01: &str = "CN=WS01,OU=Computers,DC=example,DC=com";

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A fresh in-memory domain seeded with the tree above.
pub async fn seeded_directory() -> InMemoryTransport {
    init_logging();
    let directory = InMemoryTransport::new(NAMING_CONTEXT);
    for entry in fixtures::seed_entries() {
        directory.insert(entry).await;
    }
    directory
}

/// A session over a fresh seeded directory, plus a handle to the directory.
pub async fn seeded_session() -> (DirectorySession<InMemoryTransport>, InMemoryTransport) {
    seeded_session_with(SessionConfig::default()).await
}

pub async fn seeded_session_with(
    config: SessionConfig,
) -> (DirectorySession<InMemoryTransport>, InMemoryTransport) {
    let directory = seeded_directory().await;
    let session = DirectorySession::with_transport(directory.clone(), "dc1.example.com", &config)
        .await
        .expect("session over the in-memory directory");
    (session, directory)
}

/// Common names of `objects`, in order.
pub fn common_names(objects: &[ad_directory::DirectoryObject]) -> Vec<String> {
    objects.iter().filter_map(|o| o.cn()).collect()
}
