//! Dependency initialization and wiring for the arcade service.

use std::sync::Arc;

use arcade_graph::{AccessGate, AuditRecorder, AuditTrail, IdentityStore, ProvenanceGraph};
use arcade_importer::feeds::{
    compliance_feed, starlink_oem_feed, tle_feed, ut_oem_feed,
};
use arcade_importer::{Feed, FeedImporter, ImportScheduler, Importer, RunLocks};
use arcade_repository::{
    AuditRepository, IdentityRepository, InMemoryGraph, Neo4jGraph, ProvenanceRepository,
    WatermarkRepository,
};
use cos::{CosSource, FileSystemBucket, ObjectStore};
use tracing::{info, warn};

use crate::config::settings::{DEFAULT_ARCHIVE_BUCKET, Settings};
use crate::errors::ArcadeError;

/// One graph store seen through each repository seam.
struct Stores {
    provenance: Arc<dyn ProvenanceRepository>,
    identity: Arc<dyn IdentityRepository>,
    audit: Arc<dyn AuditRepository>,
    watermarks: Arc<dyn WatermarkRepository>,
}

impl Stores {
    fn new<S>(store: Arc<S>) -> Self
    where
        S: ProvenanceRepository
            + IdentityRepository
            + AuditRepository
            + WatermarkRepository
            + 'static,
    {
        Self {
            provenance: store.clone(),
            identity: store.clone(),
            audit: store.clone(),
            watermarks: store,
        }
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub provenance: ProvenanceGraph,
    pub identity: IdentityStore,
    pub gate: AccessGate,
    pub audit: AuditRecorder,
    pub trail: AuditTrail,
    pub scheduler: ImportScheduler,
}

impl Dependencies {
    /// Connects the graph store and the archive, and builds one importer per
    /// configured feed.
    ///
    /// Must be called inside a Tokio runtime: the audit writer task is
    /// spawned here.
    pub async fn new(settings: &Settings) -> Result<Self, ArcadeError> {
        let stores = match &settings.neo4j {
            Some(neo4j) => {
                let graph = Neo4jGraph::connect(&neo4j.uri, &neo4j.user, &neo4j.password)?;
                graph.ensure_constraints().await?;
                info!(uri = %neo4j.uri, user = %neo4j.user, "Connected to Neo4j");
                Stores::new(Arc::new(graph))
            }
            None => {
                warn!("NEO4J_URI is not set, using an in-memory graph");
                Stores::new(Arc::new(InMemoryGraph::new()))
            }
        };

        let archive = match &settings.cos {
            Some(cos) => {
                info!(endpoint = %cos.endpoint, bucket = %cos.bucket, "Using COS archive");
                CosSource::live(&cos.endpoint, &cos.bucket, cos.token.clone())
            }
            None => {
                warn!("COS_ENDPOINT is not set, archiving feed documents in memory");
                CosSource::mock(DEFAULT_ARCHIVE_BUCKET)
            }
        }
        .into_store();

        let provenance = ProvenanceGraph::new(stores.provenance.clone());
        let audit = AuditRecorder::spawn(stores.audit.clone());
        let gate = AccessGate::new(
            stores.provenance.clone(),
            stores.identity.clone(),
            audit.clone(),
        );

        let wiring = ImporterWiring {
            graph: provenance.clone(),
            watermarks: stores.watermarks.clone(),
            archive,
            locks: RunLocks::new(stores.watermarks.clone()),
        };
        let mut scheduler =
            ImportScheduler::new(settings.import_interval).with_run_deadline(settings.run_deadline);

        if let Some(tle) = &settings.tle {
            scheduler.add(wiring.importer(tle_feed(&tle.location, tle.dedupe)));
        }
        if let Some(ut) = &settings.ut_oem {
            let bucket = Arc::new(FileSystemBucket::new("ut-oem", ut.location.clone()));
            scheduler.add(wiring.importer(ut_oem_feed(bucket, ut.dedupe)?));
        }
        if let Some(starlink) = &settings.starlink_oem {
            let bucket = Arc::new(FileSystemBucket::new(
                "starlink-oem",
                starlink.location.clone(),
            ));
            scheduler.add(wiring.importer(starlink_oem_feed(bucket, starlink.dedupe)?));
        }
        if let Some(compliance) = &settings.compliance {
            let bucket = Arc::new(FileSystemBucket::new(
                "un-compliance",
                compliance.location.clone(),
            ));
            scheduler.add(wiring.importer(compliance_feed(bucket, compliance.dedupe)?));
        }

        if scheduler.is_empty() {
            warn!(
                "No feed is configured; set TLE_URL, UT_OEM_PATH, STARLINK_OEM_PATH or COMPLIANCE_PATH"
            );
        } else {
            info!(importers = scheduler.len(), "Importers configured");
        }

        Ok(Self {
            provenance,
            identity: IdentityStore::new(stores.identity),
            gate,
            audit,
            trail: AuditTrail::new(stores.audit),
            scheduler,
        })
    }
}

struct ImporterWiring {
    graph: ProvenanceGraph,
    watermarks: Arc<dyn WatermarkRepository>,
    archive: Arc<dyn ObjectStore>,
    locks: RunLocks,
}

impl ImporterWiring {
    fn importer<F: Feed + 'static>(&self, feed: F) -> Arc<dyn Importer> {
        Arc::new(FeedImporter::new(
            feed,
            self.graph.clone(),
            self.watermarks.clone(),
            self.archive.clone(),
            self.locks.clone(),
        ))
    }
}
