//! Account-control flags, password expiry and the extended account state.

use crate::common::fixtures::utc;
use crate::common::{self, ALICE, BOB, CAROL, ENGINEERING, STAFF};
use ad_directory::attributes::time::datetime_to_filetime;
use ad_directory::transport::in_memory::AccountState;
use ad_directory::{AttributeCollection, DirectoryObject, UserAccountControlFlag};
use chrono::Utc;
use uuid::Uuid;

fn account(uac: Option<i32>, computed: Option<i32>, pwd_last_set: Option<i64>) -> DirectoryObject {
    let mut builder = AttributeCollection::builder("CN=test,DC=example,DC=com");
    if let Some(uac) = uac {
        builder = builder.attribute("userAccountControl", uac);
    }
    if let Some(computed) = computed {
        builder = builder.attribute("msDS-User-Account-Control-Computed", computed);
    }
    if let Some(pwd_last_set) = pwd_last_set {
        builder = builder.attribute("pwdLastSet", pwd_last_set);
    }
    DirectoryObject::new(builder.build())
}

#[test]
fn test_password_expired_rules() {
    let expired_bit = UserAccountControlFlag::PasswordExpired.bit();
    let never_expires = UserAccountControlFlag::DoNotExpirePassword.bit();
    let recent = datetime_to_filetime(utc(2024, 1, 15));

    // computed expired bit wins over never-expires
    assert!(account(Some(0x200 | never_expires), Some(expired_bit), Some(recent)).password_expired());
    // never-expires wins over an unset password
    assert!(!account(Some(0x200 | never_expires), Some(0), Some(0)).password_expired());
    // zero pwdLastSet is before 1800
    assert!(account(Some(0x200), None, Some(0)).password_expired());
    assert!(!account(Some(0x200), Some(0), Some(recent)).password_expired());
    // nothing known
    assert!(!account(None, None, None).password_expired());
}

#[test]
fn test_account_controls_are_decoded() {
    let object = account(Some(0x202 | 0x10000), None, None);
    assert!(object.has_flag(UserAccountControlFlag::AccountDisable));
    assert!(object.has_flag(UserAccountControlFlag::NormalAccount));
    assert!(object.has_flag(UserAccountControlFlag::DoNotExpirePassword));
    assert!(!object.has_flag(UserAccountControlFlag::Lockout));
    assert_eq!(object.account_controls().len(), 3);
}

#[tokio::test]
async fn test_add_and_remove_flag() {
    let (mut session, directory) = common::seeded_session().await;
    let mut bob = session.get_object_by_distinguished_name(BOB, false).await.unwrap().unwrap();

    assert!(bob.add_flag(&mut session, UserAccountControlFlag::AccountDisable).await.unwrap());
    assert!(bob.has_flag(UserAccountControlFlag::AccountDisable));
    assert_eq!(bob.user_account_control(), Some(0x202));
    assert!(!bob.add_flag(&mut session, UserAccountControlFlag::AccountDisable).await.unwrap());

    assert!(bob.remove_flag(&mut session, UserAccountControlFlag::AccountDisable).await.unwrap());
    assert_eq!(bob.user_account_control(), Some(0x200));
    assert!(!bob.remove_flag(&mut session, UserAccountControlFlag::AccountDisable).await.unwrap());

    let stored = directory.entry(BOB).await.unwrap();
    assert_eq!(stored.get_int("userAccountControl"), Some(0x200));
    assert_eq!(directory.stats().await.attribute_saves, 2);
}

#[tokio::test]
async fn test_flag_change_without_account_control_is_noop() {
    let (mut session, directory) = common::seeded_session().await;
    let no_uac = format!("CN=NoUac,{STAFF}");
    directory
        .insert(
            AttributeCollection::builder(no_uac.as_str())
                .object_guid(Uuid::new_v4())
                .attribute("objectClass", vec!["top", "person", "user"])
                .attribute("sAMAccountName", "nouac")
                .build(),
        )
        .await;
    directory
        .set_account(
            &no_uac,
            AccountState {
                locked: Some(true),
                ..AccountState::default()
            },
        )
        .await;
    let mut account = session
        .get_object_by_distinguished_name(&no_uac, false)
        .await
        .unwrap()
        .unwrap();
    directory.reset_stats().await;

    assert!(!account.remove_flag(&mut session, UserAccountControlFlag::AccountDisable).await.unwrap());
    assert!(!account.add_flag(&mut session, UserAccountControlFlag::AccountDisable).await.unwrap());
    assert_eq!(directory.stats().await.attribute_saves, 0);

    // enabling still reaches the unlock step
    assert!(!account.set_disabled(&mut session, false).await.unwrap());
    assert_eq!(directory.account(&no_uac).await.unwrap().locked, Some(false));
    assert_eq!(directory.stats().await.attribute_saves, 0);
}

#[tokio::test]
async fn test_enable_clears_flag_and_unlocks() {
    let (mut session, directory) = common::seeded_session().await;
    directory
        .set_account(
            CAROL,
            AccountState {
                locked: Some(true),
                ..AccountState::default()
            },
        )
        .await;
    let mut carol = session.get_object_by_distinguished_name(CAROL, false).await.unwrap().unwrap();
    assert!(carol.is_disabled(&session).await);

    assert!(carol.set_disabled(&mut session, false).await.unwrap());
    assert!(!carol.has_flag(UserAccountControlFlag::AccountDisable));
    assert_eq!(directory.account(CAROL).await.unwrap().locked, Some(false));
    assert!(!carol.is_disabled(&session).await);

    assert!(carol.set_disabled(&mut session, true).await.unwrap());
    assert!(carol.is_disabled(&session).await);
}

#[tokio::test]
async fn test_extended_state_is_loaded_once_per_refresh() {
    let (mut session, directory) = common::seeded_session().await;
    let expires = utc(2025, 3, 1);
    directory
        .set_account(
            ALICE,
            AccountState {
                locked: Some(true),
                password_expiration_date: Some(expires),
                user_cannot_change_password: Some(true),
                ..AccountState::default()
            },
        )
        .await;
    let mut alice = session.get_object_by_distinguished_name(ALICE, false).await.unwrap().unwrap();
    directory.reset_stats().await;

    assert!(alice.extended_state().is_none());
    assert_eq!(alice.is_locked(&session).await, Some(true));
    assert!(alice.is_disabled(&session).await);
    assert_eq!(alice.password_expiration_date(&session).await, Some(expires));
    assert!(alice.user_cannot_change_password(&session).await);
    assert_eq!(directory.stats().await.account_handles, 1);

    alice.refresh(&mut session).await.unwrap();
    assert!(alice.extended_state().is_none());
    alice.is_locked(&session).await;
    assert_eq!(directory.stats().await.account_handles, 2);
}

#[tokio::test]
async fn test_unreadable_extended_state_degrades() {
    let (mut session, directory) = common::seeded_session().await;
    directory
        .set_account(
            ALICE,
            AccountState {
                locked: Some(true),
                fail_reads: true,
                ..AccountState::default()
            },
        )
        .await;
    let mut alice = session.get_object_by_distinguished_name(ALICE, false).await.unwrap().unwrap();

    assert_eq!(alice.is_locked(&session).await, None);
    assert!(!alice.is_disabled(&session).await);
    assert!(!alice.user_cannot_change_password(&session).await);
    assert_eq!(alice.password_expiration_date(&session).await, None);
}

#[tokio::test]
async fn test_non_accounts_have_no_extended_state() {
    let (mut session, directory) = common::seeded_session().await;
    let mut engineering = session
        .get_object_by_distinguished_name(ENGINEERING, false)
        .await
        .unwrap()
        .unwrap();

    assert!(!engineering.is_disabled(&session).await);
    assert_eq!(engineering.is_locked(&session).await, None);
    assert!(!engineering.set_password(&session, "Secret1!").await.unwrap());
    assert!(directory.account(ENGINEERING).await.is_none());
}

#[tokio::test]
async fn test_set_password() {
    let (mut session, directory) = common::seeded_session().await;
    directory
        .set_account(
            BOB,
            AccountState {
                locked: Some(true),
                ..AccountState::default()
            },
        )
        .await;
    let mut bob = session.get_object_by_distinguished_name(BOB, false).await.unwrap().unwrap();

    let err = bob.set_password(&session, "").await.unwrap_err();
    assert!(err.is_validation());

    assert!(bob.set_password(&session, "Secret1!").await.unwrap());
    let state = directory.account(BOB).await.unwrap();
    assert_eq!(state.password.as_deref(), Some("Secret1!"));
    assert_eq!(state.locked, Some(false));
}

#[tokio::test]
async fn test_set_password_expired() {
    let (mut session, directory) = common::seeded_session().await;
    let mut bob = session.get_object_by_distinguished_name(BOB, false).await.unwrap().unwrap();
    assert!(!bob.password_expired());

    bob.set_password_expired(&mut session, true).await.unwrap();
    assert!(bob.password_expired());
    assert!(directory.account(BOB).await.unwrap().password_expired_now);

    let before = Utc::now() - chrono::Duration::seconds(5);
    bob.set_password_expired(&mut session, false).await.unwrap();
    assert!(!bob.password_expired());
    assert!(bob.pwd_last_set().unwrap() >= before);
}

#[tokio::test]
async fn test_user_cannot_change_password_round_trip() {
    let (mut session, directory) = common::seeded_session().await;
    let mut alice = session.get_object_by_distinguished_name(ALICE, false).await.unwrap().unwrap();

    assert!(!alice.user_cannot_change_password(&session).await);
    assert!(alice.set_user_cannot_change_password(&session, true).await.unwrap());
    assert!(alice.user_cannot_change_password(&session).await);
    assert_eq!(
        directory.account(ALICE).await.unwrap().user_cannot_change_password,
        Some(true)
    );
}
