//! Member mutation and membership traversal.

use crate::common::fixtures::{GLOBAL_SECURITY, group};
use crate::common::{self, ADMINS, ALICE, BOB, CAROL, EMPTY, ENGINEERING, GROUPS, common_names};
use ad_directory::DirectoryError;
use ad_directory::graph::{self, MembershipDirection};

#[tokio::test]
async fn test_direct_members() {
    let (mut session, _) = common::seeded_session().await;
    let engineering = session
        .get_object_by_distinguished_name(ENGINEERING, true)
        .await
        .unwrap()
        .unwrap();

    let members = engineering.members(&mut session, false).await.unwrap();
    assert_eq!(common_names(&members), vec!["Alice Smith", "Bob Jones", "Admins"]);
}

#[tokio::test]
async fn test_recursive_members_terminate_on_cycles() {
    let (mut session, _) = common::seeded_session().await;
    let engineering = session
        .get_object_by_distinguished_name(ENGINEERING, true)
        .await
        .unwrap()
        .unwrap();

    // Engineering contains Admins, which contains Engineering again
    let members = engineering.members(&mut session, true).await.unwrap();
    assert_eq!(
        common_names(&members),
        vec!["Alice Smith", "Bob Jones", "Admins", "Engineering"]
    );
}

#[tokio::test]
async fn test_recursive_member_of() {
    let (mut session, _) = common::seeded_session().await;
    let alice = session
        .get_object_by_distinguished_name(ALICE, true)
        .await
        .unwrap()
        .unwrap();

    let direct = alice.member_of_objects(&mut session, false).await.unwrap();
    assert_eq!(common_names(&direct), vec!["Engineering"]);

    let all = alice.member_of_objects(&mut session, true).await.unwrap();
    assert_eq!(common_names(&all), vec!["Engineering", "Admins"]);
}

#[tokio::test]
async fn test_traversal_reuses_cached_lookups() {
    let (mut session, directory) = common::seeded_session().await;
    let bob = session
        .get_object_by_distinguished_name(BOB, true)
        .await
        .unwrap()
        .unwrap();

    graph::traverse(&mut session, &bob, MembershipDirection::MemberOf, true)
        .await
        .unwrap();
    directory.reset_stats().await;

    let again = graph::traverse(&mut session, &bob, MembershipDirection::MemberOf, true)
        .await
        .unwrap();
    assert_eq!(common_names(&again), vec!["Engineering", "Admins"]);
    assert_eq!(directory.stats().await.searches, 0);
}

#[tokio::test]
async fn test_dangling_member_is_skipped() {
    let (mut session, directory) = common::seeded_session().await;
    let stale = format!("CN=Stale,{GROUPS}");
    directory
        .insert(group(
            &stale,
            GLOBAL_SECURITY,
            &["CN=Gone,OU=Staff,DC=example,DC=com", CAROL],
            &[],
        ))
        .await;
    let stale = session
        .get_object_by_distinguished_name(&stale, true)
        .await
        .unwrap()
        .unwrap();

    let members = stale.members(&mut session, true).await.unwrap();
    assert_eq!(common_names(&members), vec!["Carol White"]);
}

#[tokio::test]
async fn test_add_member_is_idempotent() {
    let (mut session, directory) = common::seeded_session().await;
    let mut empty = session
        .get_object_by_distinguished_name(EMPTY, true)
        .await
        .unwrap()
        .unwrap();
    directory.reset_stats().await;

    assert!(empty.add_member(&mut session, CAROL).await.unwrap());
    assert!(!empty.add_member(&mut session, &CAROL.to_uppercase()).await.unwrap());

    assert_eq!(empty.member(), vec![CAROL]);
    assert_eq!(directory.stats().await.attribute_saves, 1);
}

#[tokio::test]
async fn test_add_user_to_group_updates_both_sides() {
    let (mut session, _) = common::seeded_session().await;

    assert!(session.add_user_to_group("cwhite", "Empty").await.unwrap());
    assert!(!session.add_user_to_group("CWHITE", "empty").await.unwrap());

    let carol = session
        .get_object_by_sam_account_name("cwhite", false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(carol.member_of(), vec![EMPTY]);
    assert!(session.get_groups_empty(false).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_user_to_missing_group() {
    let (mut session, _) = common::seeded_session().await;

    let err = session.add_user_to_group("cwhite", "Nobody").await.unwrap_err();
    match err {
        DirectoryError::ObjectNotFound { kind, name } => {
            assert_eq!(kind, "group");
            assert_eq!(name, "Nobody");
        }
        other => panic!("unexpected error {other:?}"),
    }

    let err = session.add_user_to_group("nobody", "Empty").await.unwrap_err();
    assert!(matches!(err, DirectoryError::ObjectNotFound { kind, .. } if kind == "user"));
}

#[tokio::test]
async fn test_remove_member_object_refreshes_target() {
    let (mut session, _) = common::seeded_session().await;
    let mut admins = session
        .get_object_by_distinguished_name(ADMINS, false)
        .await
        .unwrap()
        .unwrap();
    let mut bob = session
        .get_object_by_distinguished_name(BOB, false)
        .await
        .unwrap()
        .unwrap();

    assert!(admins.remove_member_object(&mut session, &mut bob).await.unwrap());
    assert_eq!(admins.member(), vec![ENGINEERING]);
    assert_eq!(bob.member_of(), vec![ENGINEERING]);
    assert!(!admins.remove_member_object(&mut session, &mut bob).await.unwrap());
}

#[tokio::test]
async fn test_deleted_member_disappears_from_groups() {
    let (mut session, _) = common::seeded_session().await;
    let alice = session
        .get_object_by_distinguished_name(ALICE, false)
        .await
        .unwrap()
        .unwrap();
    let mut engineering = session
        .get_object_by_distinguished_name(ENGINEERING, false)
        .await
        .unwrap()
        .unwrap();

    assert!(session.delete_object(&alice).await.unwrap());
    engineering.refresh(&mut session).await.unwrap();

    assert_eq!(engineering.member(), vec![BOB, ADMINS]);
}
