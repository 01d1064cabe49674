//! Entry actions: create, delete, move and rename objects.

use super::DirectorySession;
use crate::attributes::AttributeValue;
use crate::dn;
use crate::error::{DirectoryError, DirectoryResult, ValidationError};
use crate::flags::GroupType;
use crate::object::DirectoryObject;
use crate::transport::DirectoryTransport;
use crate::validation::{require_non_empty, GroupName};
use log::info;

impl<T: DirectoryTransport> DirectorySession<T> {
    /// Create a user `CN=<sam>` in `ou_dn` and return it.
    ///
    /// `userPrincipalName` is `sam@<domain>` when the domain name is known.
    pub async fn add_user(&mut self, sam_account_name: &str, ou_dn: &str) -> DirectoryResult<DirectoryObject> {
        let sam = require_non_empty("sam_account_name", sam_account_name)?;
        let ou = require_non_empty("ou_distinguished_name", ou_dn)?;
        self.require_container(ou).await?;

        let mut attributes = vec![
            ("sAMAccountName".to_string(), AttributeValue::from(sam)),
            ("objectClass".to_string(), AttributeValue::from("user")),
        ];
        if let Some(domain) = self.domain_name().await? {
            attributes.push((
                "userPrincipalName".to_string(),
                AttributeValue::from(format!("{sam}@{domain}")),
            ));
        }
        self.add_object(sam, ou, attributes).await
    }

    /// Create a group `CN=<sam>` in `ou_dn` and return it.
    ///
    /// The name is validated before anything is sent to the directory.
    pub async fn add_group(
        &mut self,
        sam_account_name: &str,
        ou_dn: &str,
        group_type: GroupType,
    ) -> DirectoryResult<DirectoryObject> {
        let sam = require_non_empty("sam_account_name", sam_account_name)?;
        let ou = require_non_empty("ou_distinguished_name", ou_dn)?;
        let name = GroupName::new(sam)?;
        self.require_container(ou).await?;

        let attributes = vec![
            ("sAMAccountName".to_string(), AttributeValue::from(name.as_str())),
            ("objectClass".to_string(), AttributeValue::from("group")),
            (
                "groupType".to_string(),
                AttributeValue::from(group_type.value().to_string()),
            ),
        ];
        self.add_object(name.as_str(), ou, attributes).await
    }

    async fn require_container(&mut self, ou: &str) -> DirectoryResult<()> {
        if self.get_object_by_distinguished_name(ou, true).await?.is_none() {
            return Err(DirectoryError::Modify {
                distinguished_name: ou.to_string(),
                attribute: None,
                message: "the container does not exist".to_string(),
            });
        }
        Ok(())
    }

    async fn add_object(
        &mut self,
        common_name: &str,
        ou: &str,
        attributes: Vec<(String, AttributeValue)>,
    ) -> DirectoryResult<DirectoryObject> {
        let distinguished_name = format!("CN={},{}", dn::escape_rdn_value(common_name), ou);
        self.entry_add(&distinguished_name, attributes).await?;
        self.get_object_by_distinguished_name(&distinguished_name, false)
            .await?
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                kind: "entry".to_string(),
                name: distinguished_name,
            })
    }

    /// Delete the object's entry; `Ok(false)` when it was already gone.
    pub async fn delete_object(&self, object: &DirectoryObject) -> DirectoryResult<bool> {
        self.entry_delete(object.distinguished_name()).await
    }

    /// Move the object under `new_parent_dn` and return it re-fetched.
    pub async fn move_object(
        &mut self,
        object: &DirectoryObject,
        new_parent_dn: &str,
    ) -> DirectoryResult<Option<DirectoryObject>> {
        let parent = require_non_empty("new_parent_dn", new_parent_dn)?;
        let common_name = object
            .cn()
            .or_else(|| dn::rdn_value(object.distinguished_name()).map(dn::unescape_rdn_value))
            .ok_or(ValidationError::MissingIdentity)?;
        self.entry_move_rename(object.distinguished_name(), parent, &common_name)
            .await?;
        self.refetch(object, &format!("CN={},{}", dn::escape_rdn_value(&common_name), parent))
            .await
    }

    /// Rename the object in place and return it re-fetched.
    pub async fn rename_object(
        &mut self,
        object: &DirectoryObject,
        new_common_name: &str,
    ) -> DirectoryResult<Option<DirectoryObject>> {
        let common_name = require_non_empty("new_common_name", new_common_name)?;
        let parent = object
            .organizational_unit()
            .ok_or(ValidationError::MissingIdentity)?;
        self.entry_move_rename(object.distinguished_name(), &parent, common_name)
            .await?;
        self.refetch(object, &format!("CN={},{}", dn::escape_rdn_value(common_name), parent))
            .await
    }

    // By GUID when known, else by the expected new DN.
    async fn refetch(
        &mut self,
        object: &DirectoryObject,
        new_distinguished_name: &str,
    ) -> DirectoryResult<Option<DirectoryObject>> {
        match object.object_guid() {
            Some(guid) => self.get_object_by_object_guid(guid, false).await,
            None => {
                self.get_object_by_distinguished_name(new_distinguished_name, false)
                    .await
            }
        }
    }

    /// Add the user with `sam_account_name` to the group with
    /// `group_sam_account_name`. `Ok(false)` when already a member.
    pub async fn add_user_to_group(
        &mut self,
        sam_account_name: &str,
        group_sam_account_name: &str,
    ) -> DirectoryResult<bool> {
        let mut user = self
            .get_object_by_sam_account_name(sam_account_name, false)
            .await?
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                kind: "user".to_string(),
                name: sam_account_name.trim().to_string(),
            })?;
        let mut group = self
            .get_object_by_sam_account_name(group_sam_account_name, false)
            .await?
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                kind: "group".to_string(),
                name: group_sam_account_name.trim().to_string(),
            })?;
        let added = group.add_member_object(self, &mut user).await?;
        if added {
            info!("Added '{}' to '{}'", user, group);
        }
        Ok(added)
    }

    /// Delete the user with `sam_account_name`.
    pub async fn remove_user(&mut self, sam_account_name: &str) -> DirectoryResult<bool> {
        let user = self
            .get_object_by_sam_account_name(sam_account_name, false)
            .await?
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                kind: "user".to_string(),
                name: sam_account_name.trim().to_string(),
            })?;
        self.delete_object(&user).await
    }
}
