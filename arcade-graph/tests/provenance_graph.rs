//! Integration tests for the provenance graph service.
//!
//! Run with: `cargo test -p arcade-graph --test provenance_graph`

use std::sync::Arc;

use arcade_graph::{GraphError, ProvenanceGraph};
use arcade_repository::InMemoryGraph;
use arcade_shared::types::{
    CatalogId, DataNodeKind, DataPayload, DataSourceId, DataSourceSpec, DedupePolicy,
    NewCosObject, NewDataNode, Provenance, TwoLineElementSet, UnCompliance,
};
use chrono::Utc;

fn norad(id: &str) -> CatalogId {
    CatalogId::norad(id).unwrap()
}

fn tle(epoch_day: &str) -> DataPayload {
    DataPayload::TwoLineElements(TwoLineElementSet {
        name: Some("ISS (ZARYA)".to_string()),
        line1: format!("1 25544U 98067A   {}  .00001264  00000-0  29621-4 0  9993", epoch_day),
        line2: "2 25544  51.6442 208.9163 0006317  69.9862  25.2905 15.49560532  1234".to_string(),
        epoch: Utc::now(),
    })
}

fn graph() -> ProvenanceGraph {
    ProvenanceGraph::new(Arc::new(InMemoryGraph::new()))
}

#[tokio::test]
async fn test_find_space_object_reports_not_found() {
    let graph = graph();
    let result = graph.find_space_object(&norad("99999")).await;
    assert!(matches!(result, Err(GraphError::SpaceObjectNotFound(_))));

    let created = graph.upsert_space_object(&[norad("99999")], None).await.unwrap();
    let found = graph.find_space_object(&norad("099999")).await.unwrap();
    assert_eq!(found.id, created.value.id);
}

#[tokio::test]
async fn test_identity_conflict_is_surfaced() {
    let graph = graph();
    graph.upsert_space_object(&[norad("1")], None).await.unwrap();
    graph.upsert_space_object(&[norad("2")], None).await.unwrap();

    let result = graph.upsert_space_object(&[norad("1"), norad("2")], None).await;
    assert!(matches!(
        result,
        Err(GraphError::IdentityConflict { matches: 2, .. })
    ));
}

#[tokio::test]
async fn test_attach_uses_source_dedupe_policy() {
    let graph = graph();
    let object = graph.upsert_space_object(&[norad("25544")], None).await.unwrap().value;
    let exact = graph
        .register_data_source(&DataSourceSpec::new("exact").dedupe(DedupePolicy::ExactKey))
        .await
        .unwrap()
        .value;
    let versioned = graph
        .register_data_source(&DataSourceSpec::new("versioned").dedupe(DedupePolicy::AlwaysNew))
        .await
        .unwrap()
        .value;

    for source in [&exact, &versioned] {
        let node = NewDataNode::new(
            Provenance {
                space_object: object.id,
                data_source: source.id,
            },
            "25544:20329.5",
            tle("20329.50000000"),
        )
        .unwrap();
        graph.attach_data_node(&node).await.unwrap();
        let second = graph.attach_data_node(&node).await.unwrap();
        assert_eq!(second.created, source.dedupe == DedupePolicy::AlwaysNew);
    }

    assert_eq!(graph.data_nodes(object.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_attach_rejects_unknown_source() {
    let graph = graph();
    let object = graph.upsert_space_object(&[norad("25544")], None).await.unwrap().value;
    let unknown = DataSourceId::new();
    let node = NewDataNode::new(
        Provenance {
            space_object: object.id,
            data_source: unknown,
        },
        "k",
        tle("20329.50000000"),
    )
    .unwrap();
    assert!(matches!(
        graph.attach_data_node(&node).await,
        Err(GraphError::UnknownDataSource(id)) if id == unknown
    ));
}

#[tokio::test]
async fn test_latest_data_nodes_per_source() {
    let graph = graph();
    let object = graph.upsert_space_object(&[norad("25544")], None).await.unwrap().value;
    let a = graph
        .register_data_source(&DataSourceSpec::new("a").dedupe(DedupePolicy::AlwaysNew))
        .await
        .unwrap()
        .value;
    let b = graph
        .register_data_source(&DataSourceSpec::new("b"))
        .await
        .unwrap()
        .value;

    let provenance = |source| Provenance {
        space_object: object.id,
        data_source: source,
    };
    graph
        .attach_data_node(&NewDataNode::new(provenance(a.id), "k", tle("20329.1")).unwrap())
        .await
        .unwrap();
    let newest_a = graph
        .attach_data_node(&NewDataNode::new(provenance(a.id), "k", tle("20329.2")).unwrap())
        .await
        .unwrap()
        .value;
    let only_b = graph
        .attach_data_node(&NewDataNode::new(provenance(b.id), "k", tle("20329.3")).unwrap())
        .await
        .unwrap()
        .value;
    graph
        .attach_data_node(
            &NewDataNode::new(
                provenance(b.id),
                "c",
                DataPayload::Compliance(UnCompliance {
                    is_compliant: true,
                    calc_time: "t".to_string(),
                }),
            )
            .unwrap(),
        )
        .await
        .unwrap();

    let latest = graph
        .latest_data_nodes(object.id, DataNodeKind::TwoLineElements)
        .await
        .unwrap();
    let mut ids: Vec<_> = latest.iter().map(|n| n.id).collect();
    ids.sort();
    let mut expected = vec![newest_a.id, only_b.id];
    expected.sort();
    assert_eq!(ids, expected);
    assert_eq!(newest_a.version, 2);
}

#[tokio::test]
async fn test_record_artifact_is_idempotent() {
    let graph = graph();
    let object = NewCosObject {
        bucket: "starlink-oem".to_string(),
        key: "MEME_44713_STARLINK-1007_3281640_Operational_1312716720_UNCLASSIFIED.zip".to_string(),
        content_hash: "ab".to_string(),
        size: 1,
    };
    let first = graph.record_artifact(&object).await.unwrap();
    let second = graph.record_artifact(&object).await.unwrap();
    assert!(first.created);
    assert!(!second.created);
}
