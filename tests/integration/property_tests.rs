//! Property-based tests for membership mutation and traversal.
//!
//! Uses proptest to generate random nesting graphs and random sequences of
//! member changes, checking them against a simple model.

use crate::common::{self, NAMING_CONTEXT};
use ad_directory::graph::{self, MembershipDirection};
use ad_directory::transport::InMemoryTransport;
use ad_directory::{AttributeCollection, DirectorySession, SessionConfig};
use proptest::prelude::*;
use std::collections::{BTreeSet, VecDeque};
use uuid::Uuid;

fn group_dn(index: usize) -> String {
    format!("CN=G{index},{NAMING_CONTEXT}")
}

async fn graph_session(
    nodes: usize,
    edges: &[(usize, usize)],
) -> (DirectorySession<InMemoryTransport>, InMemoryTransport) {
    common::init_logging();
    let directory = InMemoryTransport::new(NAMING_CONTEXT);
    for node in 0..nodes {
        let members: Vec<String> = edges
            .iter()
            .filter(|(from, _)| *from == node)
            .map(|(_, to)| group_dn(*to))
            .collect();
        let mut builder = AttributeCollection::builder(group_dn(node))
            .object_guid(Uuid::new_v4())
            .attribute("cn", format!("G{node}"))
            .attribute("objectClass", "group");
        if !members.is_empty() {
            builder = builder.attribute("member", members);
        }
        directory.insert(builder.build()).await;
    }
    let session = DirectorySession::with_transport(directory.clone(), "dc1", &SessionConfig::default())
        .await
        .unwrap();
    (session, directory)
}

/// Nodes reachable from `start` over one or more edges.
fn reachable(start: usize, edges: &[(usize, usize)]) -> BTreeSet<usize> {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        for (_, to) in edges.iter().filter(|(from, _)| *from == node) {
            if seen.insert(*to) {
                queue.push_back(*to);
            }
        }
    }
    seen
}

prop_compose! {
    fn graph_strategy()
        (nodes in 1usize..8)
        (edges in prop::collection::vec((0..nodes, 0..nodes), 0..20), nodes in Just(nodes))
        -> (usize, Vec<(usize, usize)>) {
        (nodes, edges)
    }
}

#[derive(Debug, Clone)]
enum MemberChange {
    Add(usize, bool),
    Remove(usize, bool),
}

fn change_strategy() -> impl Strategy<Value = MemberChange> {
    prop_oneof![
        (0usize..5, any::<bool>()).prop_map(|(i, upper)| MemberChange::Add(i, upper)),
        (0usize..5, any::<bool>()).prop_map(|(i, upper)| MemberChange::Remove(i, upper)),
    ]
}

fn member_dn(index: usize, upper: bool) -> String {
    let dn = format!("CN=U{index},{NAMING_CONTEXT}");
    if upper { dn.to_uppercase() } else { dn }
}

proptest! {
    #[test]
    fn test_recursive_traversal_matches_reachability((nodes, edges) in graph_strategy()) {
        tokio_test::block_on(async {
            let (mut session, _) = graph_session(nodes, &edges).await;
            let start = session
                .get_object_by_distinguished_name(&group_dn(0), true)
                .await
                .unwrap()
                .unwrap();

            let found = graph::traverse(&mut session, &start, MembershipDirection::Members, true)
                .await
                .unwrap();

            let names: Vec<String> = found.iter().filter_map(|o| o.cn()).collect();
            let unique: BTreeSet<&String> = names.iter().collect();
            assert_eq!(unique.len(), names.len(), "duplicates in {names:?}");

            let expected: BTreeSet<String> = reachable(0, &edges)
                .into_iter()
                .map(|n| format!("G{n}"))
                .collect();
            let actual: BTreeSet<String> = names.into_iter().collect();
            assert_eq!(actual, expected);
        });
    }
}

proptest! {
    #[test]
    fn test_member_changes_match_model(changes in prop::collection::vec(change_strategy(), 1..12)) {
        tokio_test::block_on(async {
            let (mut session, directory) = graph_session(1, &[]).await;
            let mut group = session
                .get_object_by_distinguished_name(&group_dn(0), false)
                .await
                .unwrap()
                .unwrap();
            directory.reset_stats().await;

            let mut model: BTreeSet<usize> = BTreeSet::new();
            let mut effective = 0;
            for change in &changes {
                match change {
                    MemberChange::Add(index, upper) => {
                        let changed = group.add_member(&mut session, &member_dn(*index, *upper)).await.unwrap();
                        assert_eq!(changed, model.insert(*index));
                        effective += usize::from(changed);
                    }
                    MemberChange::Remove(index, upper) => {
                        let changed = group.remove_member(&mut session, &member_dn(*index, *upper)).await.unwrap();
                        assert_eq!(changed, model.remove(index));
                        effective += usize::from(changed);
                    }
                }
            }

            assert_eq!(group.member().len(), model.len());
            assert_eq!(directory.stats().await.attribute_saves, effective);
        });
    }
}
