//! Property listings and table rows.

use crate::common::{self, ALICE, BOB, ENGINEERING};
use ad_directory::object::{EXPENSIVE_PROPERTIES, SKIPPED};
use ad_directory::transport::in_memory::AccountState;
use ad_directory::{DirectoryObject, PropertyValue};

#[tokio::test]
async fn test_expensive_properties_are_skipped_until_loaded() {
    let (mut session, directory) = common::seeded_session().await;
    directory
        .set_account(
            ALICE,
            AccountState {
                locked: Some(false),
                user_cannot_change_password: Some(true),
                ..AccountState::default()
            },
        )
        .await;
    let mut alice = session.get_object_by_distinguished_name(ALICE, false).await.unwrap().unwrap();

    let cheap = alice.properties(true);
    for name in EXPENSIVE_PROPERTIES {
        assert_eq!(cheap[name], PropertyValue::Skipped, "{name}");
    }
    assert_eq!(cheap["sam_account_name"], PropertyValue::Text("asmith".to_string()));
    assert_eq!(directory.stats().await.account_handles, 0);

    alice.load_extended(&session).await;
    let full = alice.properties(true);
    assert_eq!(full["is_locked"], PropertyValue::Boolean(false));
    assert_eq!(full["is_disabled"], PropertyValue::Boolean(false));
    assert_eq!(full["user_cannot_change_password"], PropertyValue::Boolean(true));
    assert_eq!(full["password_expiration_date"], PropertyValue::Null);

    let without = alice.properties(false);
    assert_eq!(without["is_locked"], PropertyValue::Skipped);
}

#[tokio::test]
async fn test_property_rows() {
    let (mut session, _) = common::seeded_session().await;
    let bob = session.get_object_by_distinguished_name(BOB, false).await.unwrap().unwrap();
    let engineering = session
        .get_object_by_distinguished_name(ENGINEERING, false)
        .await
        .unwrap()
        .unwrap();

    let rows = DirectoryObject::property_rows([&bob, &engineering], false);

    let member_of: Vec<(usize, &str)> = rows
        .iter()
        .filter(|r| r.distinguished_name == BOB && r.name == "member_of")
        .map(|r| (r.index, r.value.as_str()))
        .collect();
    assert_eq!(member_of, vec![(0, ENGINEERING), (1, common::ADMINS)]);

    let guid = bob.object_guid().unwrap().to_string();
    assert!(rows
        .iter()
        .filter(|r| r.distinguished_name == BOB)
        .all(|r| r.object_guid == guid));

    assert!(rows
        .iter()
        .any(|r| r.distinguished_name == BOB && r.name == "is_locked" && r.value == SKIPPED));

    // absent values produce no rows
    assert!(!rows
        .iter()
        .any(|r| r.distinguished_name == ENGINEERING && r.name == "user_principal_name"));

    let object_guid_rows: Vec<&str> = rows
        .iter()
        .filter(|r| r.distinguished_name == ENGINEERING && r.name == "object_guid")
        .map(|r| r.value.as_str())
        .collect();
    assert_eq!(object_guid_rows.len(), 1);
}

#[tokio::test]
async fn test_binary_values_render_as_hex() {
    let (mut session, directory) = common::seeded_session().await;
    let mut bob = session.get_object_by_distinguished_name(BOB, false).await.unwrap().unwrap();
    bob.save_attribute(
        &mut session,
        "objectSid",
        vec![vec![0x01u8, 0x05, 0x00, 0xAB].into()],
    )
    .await
    .unwrap();

    assert_eq!(bob.object_sid(), Some(&[0x01u8, 0x05, 0x00, 0xAB][..]));
    let rows = DirectoryObject::property_rows([&bob], false);
    let sid = rows.iter().find(|r| r.name == "object_sid").unwrap();
    assert_eq!(sid.value, "0x010500AB");
    assert!(directory.entry(BOB).await.unwrap().contains("objectSid"));
}
