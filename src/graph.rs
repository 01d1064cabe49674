//! Breadth-first traversal over membership edges.
//!
//! Edges are distinguished-name strings resolved on demand through the
//! session, so the graph is never held in memory. A visited set keyed by
//! [`ObjectIdentity`] guarantees that each directory object is expanded at
//! most once, which makes cyclic nesting (A contains B contains A) safe.

use crate::error::DirectoryResult;
use crate::object::DirectoryObject;
use crate::session::DirectorySession;
use crate::transport::DirectoryTransport;
use log::{debug, trace};
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

/// Which edge attribute to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipDirection {
    /// A group's `member` values.
    Members,
    /// An object's `memberOf` values.
    MemberOf,
}

impl MembershipDirection {
    pub fn attribute(self) -> &'static str {
        match self {
            MembershipDirection::Members => "member",
            MembershipDirection::MemberOf => "memberOf",
        }
    }
}

/// Stable identity of a directory object.
///
/// The GUID survives moves and renames, so it is preferred; the lowercased
/// DN is used only when a snapshot carries no GUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectIdentity {
    Guid(Uuid),
    DistinguishedName(String),
}

impl ObjectIdentity {
    pub fn of(object: &DirectoryObject) -> Self {
        match object.object_guid() {
            Some(guid) => ObjectIdentity::Guid(guid),
            None => ObjectIdentity::DistinguishedName(object.distinguished_name().to_ascii_lowercase()),
        }
    }
}

/// Objects reachable from `start` along `direction`, in discovery order.
///
/// Non-recursive traversal resolves every direct edge only. Recursive
/// traversal computes the transitive closure. Edges that no longer resolve
/// are skipped. `start` itself is included only when it is reachable from
/// one of its own neighbours.
pub async fn traverse<T: DirectoryTransport>(
    session: &mut DirectorySession<T>,
    start: &DirectoryObject,
    direction: MembershipDirection,
    recursive: bool,
) -> DirectoryResult<Vec<DirectoryObject>> {
    let mut visited: HashSet<ObjectIdentity> = HashSet::new();
    let mut found = Vec::new();
    let mut queue = VecDeque::from([start.clone()]);

    while let Some(current) = queue.pop_front() {
        let edges = current.attributes().get_strings(direction.attribute());
        trace!(
            "Expanding {} {} edge(s) of '{}'",
            edges.len(),
            direction.attribute(),
            current
        );
        for edge in edges {
            if edge.trim().is_empty() {
                continue;
            }
            let Some(target) = session.get_object_by_distinguished_name(&edge, true).await? else {
                trace!("Skipping dangling edge '{}'", edge);
                continue;
            };
            if visited.insert(target.identity()) {
                if recursive {
                    queue.push_back(target.clone());
                }
                found.push(target);
            }
        }
    }

    debug!(
        "Traversal of {} from '{}' (recursive: {}) found {} object(s)",
        direction.attribute(),
        start,
        recursive,
        found.len()
    );
    Ok(found)
}
