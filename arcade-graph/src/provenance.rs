//! The provenance graph: space objects, data sources, artifacts and the data
//! nodes that link them.
use std::collections::HashMap;
use std::sync::Arc;

use arcade_repository::ProvenanceRepository;
use arcade_shared::types::{
    CatalogId, CosObject, DataNode, DataNodeId, DataNodeKind, DataSource, DataSourceId,
    DataSourceSpec, NewCosObject, NewDataNode, SpaceObject, SpaceObjectId, Upserted,
};
use tracing::{debug, error, info};

use crate::errors::GraphError;

/// Sole owner of the data node lifecycle.
///
/// Data nodes are only ever appended; how a re-ingested record is stored is
/// decided by the dedupe policy of the data source that provides it.
#[derive(Clone)]
pub struct ProvenanceGraph {
    repository: Arc<dyn ProvenanceRepository>,
}

impl ProvenanceGraph {
    pub fn new(repository: Arc<dyn ProvenanceRepository>) -> Self {
        Self { repository }
    }

    /// Resolves `identifiers` to one space object, creating it on first sight.
    ///
    /// # Errors
    ///
    /// `GraphError::IdentityConflict` when the identifiers already belong to
    /// two different space objects. The objects are never merged here.
    pub async fn upsert_space_object(
        &self,
        identifiers: &[CatalogId],
        name: Option<&str>,
    ) -> Result<Upserted<SpaceObject>, GraphError> {
        match self.repository.upsert_space_object(identifiers, name).await {
            Ok(upserted) => {
                if upserted.created {
                    debug!(space_object = %upserted.value.id, ?identifiers, "Created space object");
                }
                Ok(upserted)
            }
            Err(e) => {
                let e = GraphError::from(e);
                if let GraphError::IdentityConflict { matches, .. } = &e {
                    error!(?identifiers, matches, "Identity conflict between space objects");
                }
                Err(e)
            }
        }
    }

    /// Appends a data node under the dedupe policy of its data source.
    pub async fn attach_data_node(
        &self,
        node: &NewDataNode,
    ) -> Result<Upserted<DataNode>, GraphError> {
        let source = self
            .repository
            .get_data_source(node.provenance.data_source)
            .await?
            .ok_or(GraphError::UnknownDataSource(node.provenance.data_source))?;

        let upserted = self.repository.insert_data_node(node, source.dedupe).await?;
        if upserted.created {
            debug!(
                data_node = %upserted.value.id,
                source = %source.name,
                dedup_key = %node.dedup_key,
                version = upserted.value.version,
                "Attached data node"
            );
        }
        Ok(upserted)
    }

    pub async fn find_space_object(
        &self,
        identifier: &CatalogId,
    ) -> Result<SpaceObject, GraphError> {
        self.repository
            .find_space_object_by_catalog_id(identifier)
            .await?
            .ok_or_else(|| GraphError::SpaceObjectNotFound(identifier.clone()))
    }

    pub async fn space_object(&self, id: SpaceObjectId) -> Result<Option<SpaceObject>, GraphError> {
        Ok(self.repository.get_space_object(id).await?)
    }

    pub async fn list_space_objects(&self) -> Result<Vec<SpaceObject>, GraphError> {
        Ok(self.repository.list_space_objects().await?)
    }

    pub async fn register_data_source(
        &self,
        spec: &DataSourceSpec,
    ) -> Result<Upserted<DataSource>, GraphError> {
        let upserted = self.repository.register_data_source(spec).await?;
        if upserted.created {
            info!(
                source = %spec.name,
                public = spec.public,
                dedupe = %spec.dedupe,
                "Registered data source"
            );
        } else if upserted.value.dedupe != spec.dedupe {
            info!(
                source = %spec.name,
                stored = %upserted.value.dedupe,
                requested = %spec.dedupe,
                "Data source keeps its registered dedupe policy"
            );
        }
        Ok(upserted)
    }

    pub async fn data_source(&self, id: DataSourceId) -> Result<Option<DataSource>, GraphError> {
        Ok(self.repository.get_data_source(id).await?)
    }

    pub async fn find_data_source_by_name(
        &self,
        name: &str,
    ) -> Result<Option<DataSource>, GraphError> {
        Ok(self.repository.find_data_source_by_name(name).await?)
    }

    pub async fn set_data_source_public(
        &self,
        id: DataSourceId,
        public: bool,
    ) -> Result<DataSource, GraphError> {
        let source = self.repository.set_data_source_public(id, public).await?;
        info!(source = %source.name, public, "Changed data source visibility");
        Ok(source)
    }

    /// Records a stored artifact. Identical content is recorded once.
    pub async fn record_artifact(
        &self,
        object: &NewCosObject,
    ) -> Result<Upserted<CosObject>, GraphError> {
        Ok(self.repository.merge_cos_object(object).await?)
    }

    pub async fn data_node(&self, id: DataNodeId) -> Result<Option<DataNode>, GraphError> {
        Ok(self.repository.get_data_node(id).await?)
    }

    pub async fn data_nodes(
        &self,
        space_object: SpaceObjectId,
    ) -> Result<Vec<DataNode>, GraphError> {
        Ok(self.repository.data_nodes_for_space_object(space_object).await?)
    }

    /// Newest node of `kind` per data source for one space object.
    ///
    /// Orphaned nodes are left out.
    pub async fn latest_data_nodes(
        &self,
        space_object: SpaceObjectId,
        kind: DataNodeKind,
    ) -> Result<Vec<DataNode>, GraphError> {
        let nodes = self.repository.data_nodes_for_space_object(space_object).await?;

        let mut latest: HashMap<DataSourceId, DataNode> = HashMap::new();
        for node in nodes.into_iter().filter(|node| node.kind == kind) {
            let Some(source) = node.provided_by else {
                continue;
            };
            let newer = latest.get(&source).is_none_or(|current| {
                (node.created_at, node.version) > (current.created_at, current.version)
            });
            if newer {
                latest.insert(source, node);
            }
        }

        let mut latest: Vec<DataNode> = latest.into_values().collect();
        latest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(latest)
    }
}
