//! Creating, editing, moving, renaming, refreshing and deleting entries.

use crate::common::{self, ALICE, ARCHIVE, BOB, ENGINEERING, STAFF};
use ad_directory::{DirectoryError, GroupType, UserAccountControlFlag, ValidationError};

#[tokio::test]
async fn test_add_user() {
    let (mut session, directory) = common::seeded_session().await;

    let user = session.add_user("dmiller", STAFF).await.unwrap();

    assert_eq!(user.distinguished_name(), "CN=dmiller,OU=Staff,DC=example,DC=com");
    assert_eq!(user.sam_account_name().as_deref(), Some("dmiller"));
    assert_eq!(user.user_principal_name().as_deref(), Some("dmiller@example.com"));
    assert!(user.is_user());
    assert!(user.has_flag(UserAccountControlFlag::AccountDisable));
    assert!(user.password_expired());
    assert_eq!(directory.stats().await.adds, 1);

    let users = session.get_users(false).await.unwrap();
    assert!(users.contains(&user));
}

#[tokio::test]
async fn test_add_user_escapes_the_common_name() {
    let (mut session, _) = common::seeded_session().await;

    let user = session.add_user("smith,j", STAFF).await.unwrap();
    assert_eq!(user.distinguished_name(), "CN=smith\\,j,OU=Staff,DC=example,DC=com");
    assert_eq!(user.sam_account_name().as_deref(), Some("smith,j"));
    assert_eq!(user.cn().as_deref(), Some("smith,j"));
    assert_eq!(user.name().as_deref(), Some("smith,j"));
}

#[tokio::test]
async fn test_move_and_rename_with_escaped_common_name() {
    let (mut session, _) = common::seeded_session().await;
    let user = session.add_user("smith,j", STAFF).await.unwrap();

    let moved = session.move_object(&user, ARCHIVE).await.unwrap().unwrap();
    assert_eq!(moved.distinguished_name(), "CN=smith\\,j,OU=Archive,DC=example,DC=com");
    assert_eq!(moved.cn().as_deref(), Some("smith,j"));
    assert_eq!(moved.organizational_unit().as_deref(), Some(ARCHIVE));

    let renamed = session.rename_object(&moved, "jones, k").await.unwrap().unwrap();
    assert_eq!(renamed.distinguished_name(), "CN=jones\\, k,OU=Archive,DC=example,DC=com");
    assert_eq!(renamed.cn().as_deref(), Some("jones, k"));
    assert_eq!(renamed, user);
}

#[tokio::test]
async fn test_add_group() {
    let (mut session, _) = common::seeded_session().await;

    let group = session
        .add_group("Sales", common::GROUPS, GroupType::DomainLocalSecurity)
        .await
        .unwrap();

    assert!(group.is_group());
    assert_eq!(group.group_type_flags(), Some(GroupType::DomainLocalSecurity));
    assert_eq!(
        group.group_type().as_deref(),
        Some(GroupType::DomainLocalSecurity.value().to_string().as_str())
    );
    assert_eq!(session.get_groups_empty(false).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_group_names_are_rejected_locally() {
    let (mut session, directory) = common::seeded_session().await;
    directory.reset_stats().await;

    let too_long = "x".repeat(64);
    for name in ["12345", ".hidden", "1.2 3", too_long.as_str()] {
        let err = session
            .add_group(name, common::GROUPS, GroupType::GlobalSecurity)
            .await
            .unwrap_err();
        assert!(
            matches!(err, DirectoryError::Validation(ValidationError::InvalidGroupName { .. })),
            "{name} should be rejected"
        );
    }
    let err = session.add_user("  ", STAFF).await.unwrap_err();
    assert!(err.is_validation());

    assert_eq!(directory.stats().await, Default::default());
}

#[tokio::test]
async fn test_move_keeps_identity() {
    let (mut session, directory) = common::seeded_session().await;
    let alice = session.get_object_by_distinguished_name(ALICE, false).await.unwrap().unwrap();

    let moved = session.move_object(&alice, ARCHIVE).await.unwrap().unwrap();

    assert_eq!(moved.distinguished_name(), "CN=Alice Smith,OU=Archive,DC=example,DC=com");
    assert_eq!(moved, alice);
    assert_eq!(moved.organizational_unit().as_deref(), Some(ARCHIVE));
    assert!(directory.entry(ALICE).await.is_none());

    // group references follow the move
    let engineering = directory.entry(ENGINEERING).await.unwrap();
    assert!(engineering
        .get_strings("member")
        .contains(&"CN=Alice Smith,OU=Archive,DC=example,DC=com".to_string()));
}

#[tokio::test]
async fn test_rename_keeps_identity() {
    let (mut session, _) = common::seeded_session().await;
    let bob = session.get_object_by_distinguished_name(BOB, false).await.unwrap().unwrap();

    let renamed = session.rename_object(&bob, "Robert Jones").await.unwrap().unwrap();

    assert_eq!(renamed.distinguished_name(), "CN=Robert Jones,OU=Staff,DC=example,DC=com");
    assert_eq!(renamed.cn().as_deref(), Some("Robert Jones"));
    assert_eq!(renamed.object_guid(), bob.object_guid());
    assert_eq!(renamed, bob);
    assert_eq!(renamed.member_of(), bob.member_of());
}

#[tokio::test]
async fn test_refresh_picks_up_external_changes() {
    let (mut session, directory) = common::seeded_session().await;
    let mut alice = session.get_object_by_distinguished_name(ALICE, true).await.unwrap().unwrap();
    let mut other_view = session.get_object_by_distinguished_name(ALICE, false).await.unwrap().unwrap();

    other_view
        .set_department(&mut session, Some("  Research "))
        .await
        .unwrap();
    assert_eq!(other_view.department().as_deref(), Some("Research"));
    assert_eq!(alice.department(), None);

    assert!(alice.refresh(&mut session).await.unwrap());
    assert_eq!(alice.department().as_deref(), Some("Research"));
    assert_eq!(
        directory.entry(ALICE).await.unwrap().get_string("department").as_deref(),
        Some("Research")
    );
}

#[tokio::test]
async fn test_refresh_after_move_follows_the_guid() {
    let (mut session, _) = common::seeded_session().await;
    let mut alice = session.get_object_by_distinguished_name(ALICE, false).await.unwrap().unwrap();

    session.move_object(&alice, ARCHIVE).await.unwrap();
    assert!(alice.refresh(&mut session).await.unwrap());

    assert_eq!(alice.distinguished_name(), "CN=Alice Smith,OU=Archive,DC=example,DC=com");
    assert!(!alice.is_dangling());
}

#[tokio::test]
async fn test_refresh_of_deleted_entry_leaves_dangling_snapshot() {
    let (mut session, _) = common::seeded_session().await;
    let mut alice = session.get_object_by_distinguished_name(ALICE, false).await.unwrap().unwrap();

    assert!(session.delete_object(&alice).await.unwrap());
    assert!(!alice.refresh(&mut session).await.unwrap());

    assert!(alice.is_dangling());
    assert_eq!(alice.distinguished_name(), ALICE);
    assert_eq!(alice.sam_account_name().as_deref(), Some("asmith"));

    assert!(!session.delete_object(&alice).await.unwrap());
}

#[tokio::test]
async fn test_string_properties_trim_and_clear() {
    let (mut session, directory) = common::seeded_session().await;
    let mut bob = session.get_object_by_distinguished_name(BOB, false).await.unwrap().unwrap();

    bob.set_first_name(&mut session, Some(" Robert ")).await.unwrap();
    bob.set_office(&mut session, Some("B-12")).await.unwrap();
    assert_eq!(bob.given_name().as_deref(), Some("Robert"));
    assert_eq!(bob.first_name().as_deref(), Some("Robert"));
    assert_eq!(bob.physical_delivery_office_name().as_deref(), Some("B-12"));

    bob.set_office(&mut session, Some("   ")).await.unwrap();
    assert_eq!(bob.office(), None);
    bob.set_first_name(&mut session, None).await.unwrap();
    assert_eq!(bob.first_name(), None);

    let stored = directory.entry(BOB).await.unwrap();
    assert!(!stored.contains("givenName"));
    assert!(!stored.contains("physicalDeliveryOfficeName"));
}

#[tokio::test]
async fn test_write_to_missing_entry_names_the_attribute() {
    let (mut session, _) = common::seeded_session().await;
    let mut alice = session.get_object_by_distinguished_name(ALICE, false).await.unwrap().unwrap();
    session.delete_object(&alice).await.unwrap();

    let err = alice.set_mail(&mut session, Some("alice@example.com")).await.unwrap_err();
    match err {
        DirectoryError::Modify {
            distinguished_name,
            attribute,
            ..
        } => {
            assert_eq!(distinguished_name, ALICE);
            assert_eq!(attribute.as_deref(), Some("mail"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_remove_user() {
    let (mut session, directory) = common::seeded_session().await;

    assert!(session.remove_user("bjones").await.unwrap());
    assert!(directory.entry(BOB).await.is_none());
    assert!(session
        .get_object_by_sam_account_name("bjones", false)
        .await
        .unwrap()
        .is_none());
}
