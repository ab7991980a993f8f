//! Integration tests for the access-control gate and the audit trail.
//!
//! Run with: `cargo test -p arcade-graph --test access_gate`

use std::sync::Arc;

use arcade_graph::{AccessGate, AuditRecorder, AuditTrail, Decision, DenyReason, IdentityStore};
use arcade_repository::{
    AuditRepository, InMemoryGraph, ProvenanceRepository, RepositoryError,
};
use arcade_shared::types::{
    AccessEvent, CatalogId, DataNode, DataNodeId, DataPayload, DataSource, DataSourceSpec,
    DedupePolicy, NewDataNode, Provenance, UnCompliance, UserAccessCount, UserId,
};

struct Fixture {
    graph: Arc<InMemoryGraph>,
    gate: AccessGate,
    recorder: AuditRecorder,
    identity: IdentityStore,
    trail: AuditTrail,
    source: DataSource,
    node: DataNode,
}

async fn fixture(public: bool) -> Fixture {
    let graph = Arc::new(InMemoryGraph::new());
    let recorder = AuditRecorder::spawn(graph.clone());
    fixture_with(graph, recorder, public).await
}

async fn fixture_with(graph: Arc<InMemoryGraph>, recorder: AuditRecorder, public: bool) -> Fixture {
    let object = graph
        .upsert_space_object(&[CatalogId::norad("25544").unwrap()], None)
        .await
        .unwrap()
        .value;
    let source = graph
        .register_data_source(&DataSourceSpec::new("Partner - Radar").public(public))
        .await
        .unwrap()
        .value;
    let node = graph
        .insert_data_node(
            &NewDataNode::new(
                Provenance {
                    space_object: object.id,
                    data_source: source.id,
                },
                "25544:2020-11-24",
                DataPayload::Compliance(UnCompliance {
                    is_compliant: true,
                    calc_time: "2020-11-24".to_string(),
                }),
            )
            .unwrap(),
            DedupePolicy::ExactKey,
        )
        .await
        .unwrap()
        .value;

    Fixture {
        gate: AccessGate::new(graph.clone(), graph.clone(), recorder.clone()),
        identity: IdentityStore::new(graph.clone()),
        trail: AuditTrail::new(graph.clone()),
        graph,
        recorder,
        source,
        node,
    }
}

// ============================================================================
// Decision Tests
// ============================================================================

#[tokio::test]
async fn test_private_source_requires_grant() {
    let f = fixture(false).await;
    let user = f.identity.create_user("analyst@example.com").await.unwrap();

    let decision = f.gate.authorize(user.id, f.node.id, "/compliance").await.unwrap();
    assert_eq!(decision, Decision::Deny(DenyReason::NoGrant));

    f.identity.grant_access(user.id, f.source.id).await.unwrap();
    let decision = f.gate.authorize(user.id, f.node.id, "/compliance").await.unwrap();
    assert_eq!(decision, Decision::Allow);

    f.identity.revoke_access(user.id, f.source.id).await.unwrap();
    let decision = f.gate.authorize(user.id, f.node.id, "/compliance").await.unwrap();
    assert_eq!(decision, Decision::Deny(DenyReason::NoGrant));
}

#[tokio::test]
async fn test_public_flag_overrides_grants_and_can_be_reverted() {
    let f = fixture(false).await;
    let granted = f.identity.create_user("granted@example.com").await.unwrap();
    let other = f.identity.create_user("other@example.com").await.unwrap();
    f.identity.grant_access(granted.id, f.source.id).await.unwrap();

    f.graph.set_data_source_public(f.source.id, true).await.unwrap();
    for user in [&granted, &other] {
        let decision = f.gate.authorize(user.id, f.node.id, "/ephemeris").await.unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    f.graph.set_data_source_public(f.source.id, false).await.unwrap();
    assert_eq!(
        f.gate.authorize(granted.id, f.node.id, "/ephemeris").await.unwrap(),
        Decision::Allow
    );
    assert_eq!(
        f.gate.authorize(other.id, f.node.id, "/ephemeris").await.unwrap(),
        Decision::Deny(DenyReason::NoGrant)
    );
}

#[tokio::test]
async fn test_orphaned_node_is_denied_for_everyone() {
    let f = fixture(true).await;
    let granted = f.identity.create_user("granted@example.com").await.unwrap();
    f.identity.grant_access(granted.id, f.source.id).await.unwrap();

    f.graph.remove_data_source(f.source.id).unwrap();

    for user in [granted.id, UserId::new()] {
        let decision = f.gate.authorize(user, f.node.id, "/ephemeris").await.unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::OrphanedData));
    }

    f.recorder.flush().await;
    assert!(f.trail.history_for_data_node(f.node.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_user_and_node_are_denied() {
    let f = fixture(true).await;
    let user = f.identity.create_user("analyst@example.com").await.unwrap();

    assert_eq!(
        f.gate.authorize(UserId::new(), f.node.id, "/x").await.unwrap(),
        Decision::Deny(DenyReason::UnknownUser)
    );
    assert_eq!(
        f.gate.authorize(user.id, DataNodeId::new(), "/x").await.unwrap(),
        Decision::Deny(DenyReason::UnknownDataNode)
    );
}

// ============================================================================
// Audit Tests
// ============================================================================

#[tokio::test]
async fn test_each_allow_appends_one_event_in_order() {
    let f = fixture(true).await;
    let user = f.identity.create_user("analyst@example.com").await.unwrap();
    let endpoints = ["/ephemeris", "/compliance", "/ephemeris", "/tle", "/ephemeris"];

    for endpoint in endpoints {
        assert!(f.gate.authorize(user.id, f.node.id, endpoint).await.unwrap().is_allowed());
    }
    f.recorder.flush().await;

    let history = f.trail.history_for_data_node(f.node.id).await.unwrap();
    assert_eq!(history.len(), endpoints.len());
    assert!(history.windows(2).all(|w| w[0].accessed_at <= w[1].accessed_at));
    let recorded: Vec<&str> = history.iter().map(|e| e.endpoint.as_str()).collect();
    assert_eq!(recorded, endpoints);

    assert_eq!(f.trail.history_for_user(user.id).await.unwrap(), history);
}

#[tokio::test]
async fn test_denied_reads_are_not_audited() {
    let f = fixture(false).await;
    let user = f.identity.create_user("analyst@example.com").await.unwrap();

    f.gate.authorize(user.id, f.node.id, "/ephemeris").await.unwrap();
    f.recorder.flush().await;

    assert!(f.trail.history_for_user(user.id).await.unwrap().is_empty());
    let report = f.trail.access_report().await.unwrap();
    assert_eq!(
        report,
        vec![UserAccessCount {
            user: user.id,
            email: "analyst@example.com".to_string(),
            access_count: 0,
        }]
    );
}

/// Audit store that rejects every write.
struct FailingAudit;

#[async_trait::async_trait]
impl AuditRepository for FailingAudit {
    async fn append_access(&self, _event: &AccessEvent) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("audit store down".to_string()))
    }

    async fn history_for_data_node(
        &self,
        _data_node: DataNodeId,
    ) -> Result<Vec<AccessEvent>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn history_for_user(&self, _user: UserId) -> Result<Vec<AccessEvent>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn access_counts(&self) -> Result<Vec<UserAccessCount>, RepositoryError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_audit_failure_does_not_turn_allow_into_deny() {
    let graph = Arc::new(InMemoryGraph::new());
    let recorder = AuditRecorder::spawn(Arc::new(FailingAudit));
    let f = fixture_with(graph, recorder, true).await;
    let user = f.identity.create_user("analyst@example.com").await.unwrap();

    let decision = f.gate.authorize(user.id, f.node.id, "/ephemeris").await.unwrap();
    assert_eq!(decision, Decision::Allow);

    f.recorder.flush().await;
    assert!(f.graph.history_for_data_node(f.node.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_authorizations_are_all_recorded() {
    let f = fixture(true).await;
    let user = f.identity.create_user("analyst@example.com").await.unwrap();

    let user_id = user.id;
    let mut handles = Vec::new();
    for i in 0..16 {
        let gate = f.gate.clone();
        let node = f.node.id;
        handles.push(tokio::spawn(async move {
            gate.authorize(user_id, node, &format!("/ephemeris/{}", i)).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), Decision::Allow);
    }

    f.recorder.flush().await;
    assert_eq!(f.trail.history_for_data_node(f.node.id).await.unwrap().len(), 16);
}
