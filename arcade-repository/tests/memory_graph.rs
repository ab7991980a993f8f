//! Integration tests for the in-memory graph repository.
//!
//! Run with: `cargo test -p arcade-repository --test memory_graph`

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as LeaseDuration;

use arcade_repository::{
    AuditRepository, IdentityRepository, InMemoryGraph, ProvenanceRepository, RepositoryError,
    WatermarkRepository,
};
use arcade_shared::types::{
    AccessEvent, CatalogId, DataPayload, DataSourceSpec, DedupePolicy, ImportProgress,
    NewCosObject, NewDataNode, Provenance, UnCompliance,
};
use chrono::{Duration, Utc};
use tokio::task::JoinSet;

fn norad(id: &str) -> CatalogId {
    CatalogId::norad(id).unwrap()
}

fn cospar(id: &str) -> CatalogId {
    CatalogId::cospar(id).unwrap()
}

fn compliance(is_compliant: bool) -> DataPayload {
    DataPayload::Compliance(UnCompliance {
        is_compliant,
        calc_time: "2020-11-24T00:00:00".to_string(),
    })
}

async fn seeded(policy: DedupePolicy) -> (InMemoryGraph, Provenance) {
    let graph = InMemoryGraph::new();
    let object = graph
        .upsert_space_object(&[norad("25544")], Some("ISS (ZARYA)"))
        .await
        .unwrap()
        .value;
    let source = graph
        .register_data_source(&DataSourceSpec::new("UN - Compliance").dedupe(policy))
        .await
        .unwrap()
        .value;
    (
        graph,
        Provenance {
            space_object: object.id,
            data_source: source.id,
        },
    )
}

// ============================================================================
// Space Object Identity Tests
// ============================================================================

#[tokio::test]
async fn test_overlapping_identifiers_resolve_to_same_object() {
    let graph = InMemoryGraph::new();

    let first = graph
        .upsert_space_object(&[norad("25544")], None)
        .await
        .unwrap();
    assert!(first.created);

    let second = graph
        .upsert_space_object(&[norad("025544"), cospar("1998-067a")], Some("ISS"))
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(first.value.id, second.value.id);
    assert_eq!(second.value.identifiers.len(), 2);
    assert_eq!(second.value.name.as_deref(), Some("ISS"));

    let found = graph
        .find_space_object_by_catalog_id(&cospar("1998-067A"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first.value.id);
}

#[tokio::test]
async fn test_disjoint_identifiers_create_distinct_objects() {
    let graph = InMemoryGraph::new();
    let a = graph.upsert_space_object(&[norad("1")], None).await.unwrap();
    let b = graph.upsert_space_object(&[norad("2")], None).await.unwrap();
    assert!(a.created && b.created);
    assert_ne!(a.value.id, b.value.id);
    assert_eq!(graph.list_space_objects().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_identifiers_spanning_two_objects_conflict() {
    let graph = InMemoryGraph::new();
    let a = graph.upsert_space_object(&[norad("1")], None).await.unwrap().value;
    let b = graph.upsert_space_object(&[cospar("2000-001A")], None).await.unwrap().value;

    let result = graph
        .upsert_space_object(&[norad("1"), cospar("2000-001A"), norad("3")], None)
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::IdentityConflict { matches: 2, .. })
    ));

    // nothing merged, nothing created
    assert!(graph.find_space_object_by_catalog_id(&norad("3")).await.unwrap().is_none());
    assert_eq!(graph.get_space_object(a.id).await.unwrap().unwrap().identifiers.len(), 1);
    assert_eq!(graph.get_space_object(b.id).await.unwrap().unwrap().identifiers.len(), 1);
}

#[tokio::test]
async fn test_name_is_only_set_once() {
    let graph = InMemoryGraph::new();
    graph.upsert_space_object(&[norad("5")], Some("VANGUARD 1")).await.unwrap();
    let again = graph.upsert_space_object(&[norad("5")], Some("renamed")).await.unwrap();
    assert_eq!(again.value.name.as_deref(), Some("VANGUARD 1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_of_a_new_identifier_create_one_object() {
    let graph = Arc::new(InMemoryGraph::new());
    let mut tasks = JoinSet::new();
    for worker in 0..8 {
        let graph = graph.clone();
        tasks.spawn(async move {
            // half the writers know the object by a second identifier
            let identifiers = if worker % 2 == 0 {
                vec![norad("44713")]
            } else {
                vec![norad("44713"), cospar("2019-074A")]
            };
            graph.upsert_space_object(&identifiers, None).await
        });
    }

    let mut ids = HashSet::new();
    let mut created = 0;
    while let Some(joined) = tasks.join_next().await {
        let upserted = joined.unwrap().unwrap();
        created += usize::from(upserted.created);
        ids.insert(upserted.value.id);
    }
    assert_eq!(created, 1);
    assert_eq!(ids.len(), 1);
    assert_eq!(graph.list_space_objects().await.unwrap().len(), 1);
}

// ============================================================================
// Data Source and Artifact Tests
// ============================================================================

#[tokio::test]
async fn test_register_data_source_merges_on_name() {
    let graph = InMemoryGraph::new();
    let first = graph
        .register_data_source(&DataSourceSpec::new("UT - OEM"))
        .await
        .unwrap();
    let second = graph
        .register_data_source(&DataSourceSpec::new("UT - OEM").public(true))
        .await
        .unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.value.id, second.value.id);
    assert!(!second.value.public);

    let updated = graph.set_data_source_public(first.value.id, true).await.unwrap();
    assert!(updated.public);
    let found = graph.find_data_source_by_name("UT - OEM").await.unwrap().unwrap();
    assert!(found.public);
}

#[tokio::test]
async fn test_cos_objects_merge_on_content() {
    let graph = InMemoryGraph::new();
    let object = NewCosObject {
        bucket: "archive".to_string(),
        key: "tle/catalog.txt".to_string(),
        content_hash: "aa".to_string(),
        size: 10,
    };
    let first = graph.merge_cos_object(&object).await.unwrap();
    let again = graph.merge_cos_object(&object).await.unwrap();
    assert!(first.created);
    assert!(!again.created);
    assert_eq!(first.value.id, again.value.id);

    let changed = NewCosObject {
        content_hash: "bb".to_string(),
        ..object
    };
    let second = graph.merge_cos_object(&changed).await.unwrap();
    assert!(second.created);
    assert_ne!(second.value.id, first.value.id);
    assert_eq!(graph.cos_object_count().unwrap(), 2);
}

// ============================================================================
// Data Node Dedupe Tests
// ============================================================================

#[tokio::test]
async fn test_exact_key_returns_existing_node() {
    let (graph, provenance) = seeded(DedupePolicy::ExactKey).await;
    let node = NewDataNode::new(provenance, "aso-1", compliance(true)).unwrap();

    let first = graph.insert_data_node(&node, DedupePolicy::ExactKey).await.unwrap();
    let second = graph.insert_data_node(&node, DedupePolicy::ExactKey).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.value.id, second.value.id);
    assert_eq!(graph.data_node_count().unwrap(), 1);
}

#[tokio::test]
async fn test_always_new_keeps_older_versions() {
    let (graph, provenance) = seeded(DedupePolicy::AlwaysNew).await;

    let v1 = graph
        .insert_data_node(
            &NewDataNode::new(provenance, "aso-1", compliance(false)).unwrap(),
            DedupePolicy::AlwaysNew,
        )
        .await
        .unwrap();
    let v2 = graph
        .insert_data_node(
            &NewDataNode::new(provenance, "aso-1", compliance(true)).unwrap(),
            DedupePolicy::AlwaysNew,
        )
        .await
        .unwrap();

    assert!(v1.created && v2.created);
    assert_eq!(v1.value.version, 1);
    assert_eq!(v2.value.version, 2);

    let nodes = graph
        .data_nodes_for_space_object(provenance.space_object)
        .await
        .unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].payload, compliance(false));
    assert_eq!(nodes[1].payload, compliance(true));
}

#[tokio::test]
async fn test_ingest_key_replay_writes_nothing_under_always_new() {
    let (graph, provenance) = seeded(DedupePolicy::AlwaysNew).await;
    let node = NewDataNode::new(provenance, "aso-1", compliance(true))
        .unwrap()
        .with_ingest_key("compliance.csv@m1#0");

    let first = graph.insert_data_node(&node, DedupePolicy::AlwaysNew).await.unwrap();
    let replay = graph.insert_data_node(&node, DedupePolicy::AlwaysNew).await.unwrap();

    assert!(first.created);
    assert!(!replay.created);
    assert_eq!(first.value.id, replay.value.id);
    assert_eq!(graph.data_node_count().unwrap(), 1);
}

#[tokio::test]
async fn test_insert_requires_existing_provenance() {
    let (graph, provenance) = seeded(DedupePolicy::ExactKey).await;
    let dangling = Provenance {
        space_object: arcade_shared::types::SpaceObjectId::new(),
        ..provenance
    };
    let node = NewDataNode::new(dangling, "aso-1", compliance(true)).unwrap();
    assert!(matches!(
        graph.insert_data_node(&node, DedupePolicy::ExactKey).await,
        Err(RepositoryError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_removed_source_leaves_orphaned_nodes() {
    let (graph, provenance) = seeded(DedupePolicy::ExactKey).await;
    let node = graph
        .insert_data_node(
            &NewDataNode::new(provenance, "aso-1", compliance(true)).unwrap(),
            DedupePolicy::ExactKey,
        )
        .await
        .unwrap()
        .value;

    graph.remove_data_source(provenance.data_source).unwrap();

    let stored = graph.get_data_node(node.id).await.unwrap().unwrap();
    assert_eq!(stored.provided_by, Some(provenance.data_source));
    assert!(graph
        .get_data_source(provenance.data_source)
        .await
        .unwrap()
        .is_none());
}

// ============================================================================
// Identity and Audit Tests
// ============================================================================

#[tokio::test]
async fn test_grants_are_idempotent() {
    let (graph, provenance) = seeded(DedupePolicy::ExactKey).await;
    let user = graph.create_user("Analyst@Example.com").await.unwrap();
    assert_eq!(graph.create_user("analyst@example.com").await.unwrap().id, user.id);

    assert!(!graph.has_access(user.id, provenance.data_source).await.unwrap());
    graph.grant_access(user.id, provenance.data_source).await.unwrap();
    graph.grant_access(user.id, provenance.data_source).await.unwrap();
    assert!(graph.has_access(user.id, provenance.data_source).await.unwrap());
    assert_eq!(graph.grants_for_user(user.id).await.unwrap().len(), 1);

    graph.revoke_access(user.id, provenance.data_source).await.unwrap();
    graph.revoke_access(user.id, provenance.data_source).await.unwrap();
    assert!(!graph.has_access(user.id, provenance.data_source).await.unwrap());
}

#[tokio::test]
async fn test_history_is_chronological() {
    let (graph, provenance) = seeded(DedupePolicy::ExactKey).await;
    let node = graph
        .insert_data_node(
            &NewDataNode::new(provenance, "aso-1", compliance(true)).unwrap(),
            DedupePolicy::ExactKey,
        )
        .await
        .unwrap()
        .value;
    let alice = graph.create_user("alice@example.com").await.unwrap();
    let bob = graph.create_user("bob@example.com").await.unwrap();

    let now = Utc::now();
    let mut late = AccessEvent::now(alice.id, node.id, "/ephemeris");
    late.accessed_at = now + Duration::seconds(10);
    let mut early = AccessEvent::now(bob.id, node.id, "/compliance");
    early.accessed_at = now;
    let mut middle = AccessEvent::now(alice.id, node.id, "/compliance");
    middle.accessed_at = now + Duration::seconds(5);

    for event in [&late, &early, &middle] {
        graph.append_access(event).await.unwrap();
    }

    let history = graph.history_for_data_node(node.id).await.unwrap();
    assert_eq!(history, vec![early.clone(), middle.clone(), late.clone()]);

    let alice_history = graph.history_for_user(alice.id).await.unwrap();
    assert_eq!(alice_history, vec![middle, late]);

    let counts = graph.access_counts().await.unwrap();
    assert_eq!(counts.len(), 2);
    assert_eq!(counts[0].email, "alice@example.com");
    assert_eq!(counts[0].access_count, 2);
    assert_eq!(counts[1].access_count, 1);
}

#[tokio::test]
async fn test_append_access_rejects_unknown_nodes() {
    let graph = InMemoryGraph::new();
    let user = graph.create_user("alice@example.com").await.unwrap();
    let event = AccessEvent::now(user.id, arcade_shared::types::DataNodeId::new(), "/x");
    assert!(matches!(
        graph.append_access(&event).await,
        Err(RepositoryError::NotFound(_))
    ));
}

// ============================================================================
// Watermark Tests
// ============================================================================

#[tokio::test]
async fn test_progress_is_kept_per_source_and_entry() {
    let graph = InMemoryGraph::new();
    let mut a = ImportProgress::new("UT - OEM", "block_01/25544.oem", "m1");
    a.committed_records = 1;
    let b = ImportProgress::new("UT - OEM", "block_01/43013.oem", "m1");
    let other = ImportProgress::new("UN - Compliance", "compliance.csv", "m1");

    graph.save_progress(&a).await.unwrap();
    graph.save_progress(&b).await.unwrap();
    graph.save_progress(&other).await.unwrap();

    a.complete = true;
    graph.save_progress(&a).await.unwrap();

    let loaded = graph.load_progress("UT - OEM").await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert!(loaded.iter().any(|p| p.entry == a.entry && p.complete));
    assert!(graph.load_progress("CelesTrak - TLE").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_source_lock_excludes_other_holders_until_released() {
    let graph = InMemoryGraph::new();
    let lease = LeaseDuration::from_secs(60);

    assert!(graph.try_lock_source("UT - OEM", "a", lease).await.unwrap());
    assert!(!graph.try_lock_source("UT - OEM", "b", lease).await.unwrap());
    // the holder renews its own lease
    assert!(graph.try_lock_source("UT - OEM", "a", lease).await.unwrap());
    assert!(graph.try_lock_source("UN - Compliance", "b", lease).await.unwrap());

    graph.release_source("UT - OEM", "b").await.unwrap();
    assert!(!graph.try_lock_source("UT - OEM", "b", lease).await.unwrap());

    graph.release_source("UT - OEM", "a").await.unwrap();
    assert!(graph.try_lock_source("UT - OEM", "b", lease).await.unwrap());
}

#[tokio::test]
async fn test_expired_source_lock_is_taken_over() {
    let graph = InMemoryGraph::new();

    assert!(graph.try_lock_source("UT - OEM", "crashed", LeaseDuration::ZERO).await.unwrap());
    assert!(graph
        .try_lock_source("UT - OEM", "b", LeaseDuration::from_secs(60))
        .await
        .unwrap());
    assert!(!graph
        .try_lock_source("UT - OEM", "crashed", LeaseDuration::from_secs(60))
        .await
        .unwrap());
}
