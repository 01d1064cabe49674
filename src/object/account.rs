//! Account-control flags and password/lockout state.

use super::DirectoryObject;
use crate::attributes::AttributeValue;
use crate::error::{DirectoryError, DirectoryResult, ValidationError};
use crate::flags::UserAccountControlFlag;
use crate::session::DirectorySession;
use crate::transport::{AccountHandle, DirectoryTransport, TransportResult};
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info, warn};
use std::collections::BTreeSet;

/// State read from the extended account facility. `None` fields could not
/// be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedAccountState {
    pub is_disabled: Option<bool>,
    pub is_locked: Option<bool>,
    pub password_expiration_date: Option<DateTime<Utc>>,
    pub user_cannot_change_password: Option<bool>,
}

impl ExtendedAccountState {
    fn disables(&self) -> bool {
        self.is_disabled == Some(true) || self.is_locked == Some(true)
    }
}

// A pwdLastSet before this means the password was never set.
fn password_never_set_threshold() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1800, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn degrade<V>(distinguished_name: &str, property: &str, result: TransportResult<Option<V>>) -> Option<V> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Could not read {} of '{}': {}", property, distinguished_name, e);
            None
        }
    }
}

impl DirectoryObject {
    /// Decoded `userAccountControl` flags, memoized until refresh.
    pub fn account_controls(&self) -> &BTreeSet<UserAccountControlFlag> {
        self.account_controls.get_or_init(|| {
            self.user_account_control()
                .map(|value| UserAccountControlFlag::decode(value).collect())
                .unwrap_or_default()
        })
    }

    pub fn has_flag(&self, flag: UserAccountControlFlag) -> bool {
        self.account_controls().contains(&flag)
    }

    /// Set `flag`. `Ok(false)` when it is already set or the entry has no
    /// `userAccountControl`.
    pub async fn add_flag<T: DirectoryTransport>(
        &mut self,
        session: &mut DirectorySession<T>,
        flag: UserAccountControlFlag,
    ) -> DirectoryResult<bool> {
        self.change_flag(session, flag, true).await
    }

    /// Clear `flag`. `Ok(false)` when it is already clear or the entry has no
    /// `userAccountControl`.
    pub async fn remove_flag<T: DirectoryTransport>(
        &mut self,
        session: &mut DirectorySession<T>,
        flag: UserAccountControlFlag,
    ) -> DirectoryResult<bool> {
        self.change_flag(session, flag, false).await
    }

    async fn change_flag<T: DirectoryTransport>(
        &mut self,
        session: &mut DirectorySession<T>,
        flag: UserAccountControlFlag,
        set: bool,
    ) -> DirectoryResult<bool> {
        let Some(current) = self.user_account_control() else {
            debug!("'{}' has no userAccountControl", self.distinguished_name());
            return Ok(false);
        };
        if self.has_flag(flag) == set {
            return Ok(false);
        }
        let updated = if set {
            current | flag.bit()
        } else {
            current & !flag.bit()
        };
        debug!(
            "{} {} on '{}' ({} -> {})",
            if set { "Setting" } else { "Clearing" },
            flag,
            self.distinguished_name(),
            current,
            updated
        );
        self.save_attribute(
            session,
            "userAccountControl",
            vec![AttributeValue::from(updated.to_string())],
        )
        .await
    }

    /// Whether the password has expired.
    ///
    /// First match wins:
    /// 1. the computed account control has the password-expired bit
    /// 2. the raw account control has the never-expires bit (not expired)
    /// 3. `pwdLastSet` is before 1800, i.e. never set
    /// 4. otherwise not expired
    pub fn password_expired(&self) -> bool {
        if self
            .user_account_control_computed()
            .is_some_and(|v| UserAccountControlFlag::PasswordExpired.is_set_in(v))
        {
            return true;
        }
        if self
            .user_account_control()
            .is_some_and(|v| UserAccountControlFlag::DoNotExpirePassword.is_set_in(v))
        {
            return false;
        }
        if self
            .pwd_last_set()
            .is_some_and(|set| set < password_never_set_threshold())
        {
            return true;
        }
        false
    }

    /// Expire the password (`pwdLastSet = 0`, then expire-now on the account
    /// handle) or un-expire it (`pwdLastSet = -1`).
    pub async fn set_password_expired<T: DirectoryTransport>(
        &mut self,
        session: &mut DirectorySession<T>,
        expired: bool,
    ) -> DirectoryResult<bool> {
        if !expired {
            return self
                .save_attribute(session, "pwdLastSet", vec![AttributeValue::from("-1")])
                .await;
        }
        let saved = self
            .save_attribute(session, "pwdLastSet", vec![AttributeValue::from("0")])
            .await?;
        if let Some(handle) = session.account_handle(self.distinguished_name()).await? {
            handle
                .expire_password_now()
                .await
                .map_err(|e| DirectoryError::modify(self.distinguished_name(), None, e))?;
        }
        self.extended = None;
        info!("Expired password of '{}'", self);
        Ok(saved)
    }

    /// The extended state, if it has been loaded since the last refresh.
    pub fn extended_state(&self) -> Option<&ExtendedAccountState> {
        self.extended.as_ref()
    }

    /// Load the extended account state once per refresh.
    ///
    /// Read failures are logged and leave the affected field `None`.
    pub async fn load_extended<T: DirectoryTransport>(
        &mut self,
        session: &DirectorySession<T>,
    ) -> &ExtendedAccountState {
        if self.extended.is_none() {
            let state = self.read_extended(session).await;
            self.extended = Some(state);
        }
        self.extended.get_or_insert_with(ExtendedAccountState::default)
    }

    async fn read_extended<T: DirectoryTransport>(
        &self,
        session: &DirectorySession<T>,
    ) -> ExtendedAccountState {
        let dn = self.distinguished_name();
        let handle = match session.account_handle(dn).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                debug!("'{}' has no extended account state", dn);
                return ExtendedAccountState::default();
            }
            Err(e) => {
                warn!("Could not open account handle for '{}': {}", dn, e);
                return ExtendedAccountState::default();
            }
        };
        ExtendedAccountState {
            is_disabled: degrade(dn, "disabled state", handle.is_disabled().await),
            is_locked: degrade(dn, "lockout state", handle.is_locked().await),
            password_expiration_date: degrade(
                dn,
                "password expiration date",
                handle.password_expiration_date().await,
            ),
            user_cannot_change_password: degrade(
                dn,
                "user-cannot-change-password",
                handle.user_cannot_change_password().await,
            ),
        }
    }

    // Disabled per the flag, or per already loaded extended state.
    pub(super) fn is_disabled_loaded(&self) -> bool {
        self.has_flag(UserAccountControlFlag::AccountDisable)
            || self.extended.as_ref().is_some_and(ExtendedAccountState::disables)
    }

    /// Disabled by flag, or disabled or locked out per the extended facility.
    pub async fn is_disabled<T: DirectoryTransport>(&mut self, session: &DirectorySession<T>) -> bool {
        if self.has_flag(UserAccountControlFlag::AccountDisable) {
            return true;
        }
        self.load_extended(session).await.disables()
    }

    pub async fn is_locked<T: DirectoryTransport>(&mut self, session: &DirectorySession<T>) -> Option<bool> {
        self.load_extended(session).await.is_locked
    }

    pub async fn password_expiration_date<T: DirectoryTransport>(
        &mut self,
        session: &DirectorySession<T>,
    ) -> Option<DateTime<Utc>> {
        self.load_extended(session).await.password_expiration_date
    }

    /// `false` when the state cannot be read.
    pub async fn user_cannot_change_password<T: DirectoryTransport>(
        &mut self,
        session: &DirectorySession<T>,
    ) -> bool {
        self.load_extended(session)
            .await
            .user_cannot_change_password
            .unwrap_or(false)
    }

    /// Disable or enable the account.
    ///
    /// Writes the disable flag, then mirrors the state onto the extended
    /// account handle. Enabling also unlocks. Returns whether the flag changed.
    pub async fn set_disabled<T: DirectoryTransport>(
        &mut self,
        session: &mut DirectorySession<T>,
        disabled: bool,
    ) -> DirectoryResult<bool> {
        let changed = if disabled {
            self.add_flag(session, UserAccountControlFlag::AccountDisable).await?
        } else {
            self.remove_flag(session, UserAccountControlFlag::AccountDisable)
                .await?
        };
        let dn = self.distinguished_name();
        if let Some(handle) = session.account_handle(dn).await? {
            handle
                .set_disabled(disabled)
                .await
                .map_err(|e| DirectoryError::modify(dn, None, e))?;
            if !disabled {
                handle
                    .unlock()
                    .await
                    .map_err(|e| DirectoryError::modify(dn, None, e))?;
            }
        }
        self.extended = None;
        Ok(changed)
    }

    /// Set a new password and clear any lockout. `Ok(false)` when the entry
    /// is not an account.
    pub async fn set_password<T: DirectoryTransport>(
        &mut self,
        session: &DirectorySession<T>,
        password: &str,
    ) -> DirectoryResult<bool> {
        if password.is_empty() {
            return Err(ValidationError::EmptyValue {
                parameter: "password".to_string(),
            }
            .into());
        }
        let dn = self.distinguished_name();
        let Some(handle) = session.account_handle(dn).await? else {
            return Ok(false);
        };
        handle
            .set_password(password)
            .await
            .map_err(|e| DirectoryError::modify(dn, None, e))?;
        handle
            .unlock()
            .await
            .map_err(|e| DirectoryError::modify(dn, None, e))?;
        info!("Set password of '{}'", dn);
        self.extended = None;
        Ok(true)
    }

    /// `Ok(false)` when the entry is not an account.
    pub async fn set_user_cannot_change_password<T: DirectoryTransport>(
        &mut self,
        session: &DirectorySession<T>,
        value: bool,
    ) -> DirectoryResult<bool> {
        let dn = self.distinguished_name();
        let Some(handle) = session.account_handle(dn).await? else {
            return Ok(false);
        };
        handle
            .set_user_cannot_change_password(value)
            .await
            .map_err(|e| DirectoryError::modify(dn, None, e))?;
        self.extended = None;
        Ok(true)
    }
}
