//! In-memory graph used by tests and by local runs without a Neo4j instance.
//!
//! All state sits behind one `RwLock`, so every repository call is atomic.
//! The lock is never held across an `.await`.
mod audit;
mod identity;
mod provenance;
mod watermark;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use arcade_shared::types::{
    AccessEvent, CatalogId, CosObject, DataNode, DataNodeId, DataSource, DataSourceId,
    ImportProgress, SpaceObject, SpaceObjectId, User, UserId,
};

use crate::errors::RepositoryError;
use watermark::SourceLease;

#[derive(Default)]
struct GraphState {
    space_objects: HashMap<SpaceObjectId, SpaceObject>,
    space_object_order: Vec<SpaceObjectId>,
    catalog: HashMap<CatalogId, SpaceObjectId>,

    sources: HashMap<DataSourceId, DataSource>,
    source_names: HashMap<String, DataSourceId>,

    /// Keyed by `CosObject::reference`.
    cos_objects: HashMap<String, CosObject>,

    data_nodes: HashMap<DataNodeId, DataNode>,
    node_order: Vec<DataNodeId>,
    ingest_keys: HashMap<(DataSourceId, String), DataNodeId>,
    /// Node ids per source and dedup key, in version order.
    versions: HashMap<(DataSourceId, String), Vec<DataNodeId>>,

    users: HashMap<UserId, User>,
    user_emails: HashMap<String, UserId>,
    grants: HashSet<(UserId, DataSourceId)>,

    accesses: Vec<AccessEvent>,

    progress: BTreeMap<(String, String), ImportProgress>,
    run_locks: HashMap<String, SourceLease>,
}

/// A graph store that keeps everything in process memory.
#[derive(Default)]
pub struct InMemoryGraph {
    state: RwLock<GraphState>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, GraphState>, RepositoryError> {
        self.state
            .read()
            .map_err(|_| RepositoryError::Unavailable("in-memory graph lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GraphState>, RepositoryError> {
        self.state
            .write()
            .map_err(|_| RepositoryError::Unavailable("in-memory graph lock poisoned".to_string()))
    }

    /// Removes a data source node while leaving the data nodes it provided
    /// in place.
    ///
    /// This is an administrative repair tool; the nodes it leaves behind are
    /// orphaned and can no longer be authorized.
    pub fn remove_data_source(
        &self,
        id: DataSourceId,
    ) -> Result<Option<DataSource>, RepositoryError> {
        let mut state = self.write()?;
        let removed = state.sources.remove(&id);
        if let Some(source) = &removed {
            state.source_names.remove(&source.name);
            state.grants.retain(|(_, granted)| *granted != id);
        }
        Ok(removed)
    }

    pub fn data_node_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.read()?.data_nodes.len())
    }

    pub fn cos_object_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.read()?.cos_objects.len())
    }
}
