//! Membership mutation and traversal entry points.

use super::DirectoryObject;
use crate::attributes::AttributeValue;
use crate::error::DirectoryResult;
use crate::graph::{self, MembershipDirection};
use crate::session::DirectorySession;
use crate::transport::DirectoryTransport;
use crate::validation::require_non_empty;
use log::debug;

impl DirectoryObject {
    /// Add `distinguished_name` to `member`. `Ok(false)` when it is already
    /// present, compared ignoring case.
    pub async fn add_member<T: DirectoryTransport>(
        &mut self,
        session: &mut DirectorySession<T>,
        distinguished_name: &str,
    ) -> DirectoryResult<bool> {
        let distinguished_name = require_non_empty("distinguished_name", distinguished_name)?;
        let mut members = self.member();
        if members
            .iter()
            .any(|m| m.eq_ignore_ascii_case(distinguished_name))
        {
            debug!("'{}' already contains '{}'", self, distinguished_name);
            return Ok(false);
        }
        members.push(distinguished_name.to_string());
        let values = members.into_iter().map(AttributeValue::from).collect();
        self.save_attribute(session, "member", values).await
    }

    /// Remove `distinguished_name` from `member`. `Ok(false)` when it is not
    /// present.
    pub async fn remove_member<T: DirectoryTransport>(
        &mut self,
        session: &mut DirectorySession<T>,
        distinguished_name: &str,
    ) -> DirectoryResult<bool> {
        let distinguished_name = require_non_empty("distinguished_name", distinguished_name)?;
        let members = self.member();
        let remaining: Vec<AttributeValue> = members
            .iter()
            .filter(|m| !m.eq_ignore_ascii_case(distinguished_name))
            .cloned()
            .map(AttributeValue::from)
            .collect();
        if remaining.len() == members.len() {
            debug!("'{}' does not contain '{}'", self, distinguished_name);
            return Ok(false);
        }
        self.save_attribute(session, "member", remaining).await
    }

    /// [`add_member`](Self::add_member), then refresh `target` so its
    /// `memberOf` is current.
    pub async fn add_member_object<T: DirectoryTransport>(
        &mut self,
        session: &mut DirectorySession<T>,
        target: &mut DirectoryObject,
    ) -> DirectoryResult<bool> {
        let dn = target.distinguished_name().to_string();
        let added = self.add_member(session, &dn).await?;
        target.refresh(session).await?;
        Ok(added)
    }

    /// [`remove_member`](Self::remove_member), then refresh `target`.
    pub async fn remove_member_object<T: DirectoryTransport>(
        &mut self,
        session: &mut DirectorySession<T>,
        target: &mut DirectoryObject,
    ) -> DirectoryResult<bool> {
        let dn = target.distinguished_name().to_string();
        let removed = self.remove_member(session, &dn).await?;
        target.refresh(session).await?;
        Ok(removed)
    }

    /// Members of this group; transitive when `recursive`.
    pub async fn members<T: DirectoryTransport>(
        &self,
        session: &mut DirectorySession<T>,
        recursive: bool,
    ) -> DirectoryResult<Vec<DirectoryObject>> {
        graph::traverse(session, self, MembershipDirection::Members, recursive).await
    }

    /// Groups this object belongs to; transitive when `recursive`.
    pub async fn member_of_objects<T: DirectoryTransport>(
        &self,
        session: &mut DirectorySession<T>,
        recursive: bool,
    ) -> DirectoryResult<Vec<DirectoryObject>> {
        graph::traverse(session, self, MembershipDirection::MemberOf, recursive).await
    }
}
