//! This module defines the `ProvenanceRepository` trait, the storage contract
//! for space objects, data sources, stored artifacts and data nodes.
use arcade_shared::types::{
    CatalogId, CosObject, DataNode, DataNodeId, DataSource, DataSourceId, DataSourceSpec,
    DedupePolicy, NewCosObject, NewDataNode, SpaceObject, SpaceObjectId, Upserted,
};

use crate::errors::RepositoryError;

/// A trait that defines the interface for the provenance part of the graph.
///
/// Every method is atomic on its own. No method deletes or rewrites a data
/// node: data nodes are only ever appended.
#[async_trait::async_trait]
pub trait ProvenanceRepository: Send + Sync {
    /// Resolves `identifiers` to a space object, creating it if no identifier
    /// is known yet.
    ///
    /// Unknown identifiers are merged into the matched object, and `name` is
    /// set when the object has none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::IdentityConflict` when the identifiers are
    /// already attached to more than one space object. Nothing is written in
    /// that case.
    async fn upsert_space_object(
        &self,
        identifiers: &[CatalogId],
        name: Option<&str>,
    ) -> Result<Upserted<SpaceObject>, RepositoryError>;

    async fn get_space_object(
        &self,
        id: SpaceObjectId,
    ) -> Result<Option<SpaceObject>, RepositoryError>;

    async fn find_space_object_by_catalog_id(
        &self,
        identifier: &CatalogId,
    ) -> Result<Option<SpaceObject>, RepositoryError>;

    async fn list_space_objects(&self) -> Result<Vec<SpaceObject>, RepositoryError>;

    /// Registers a data source, merging on its name.
    ///
    /// An already registered source keeps its stored `public` flag and dedupe
    /// policy.
    async fn register_data_source(
        &self,
        spec: &DataSourceSpec,
    ) -> Result<Upserted<DataSource>, RepositoryError>;

    async fn get_data_source(
        &self,
        id: DataSourceId,
    ) -> Result<Option<DataSource>, RepositoryError>;

    async fn find_data_source_by_name(
        &self,
        name: &str,
    ) -> Result<Option<DataSource>, RepositoryError>;

    async fn set_data_source_public(
        &self,
        id: DataSourceId,
        public: bool,
    ) -> Result<DataSource, RepositoryError>;

    /// Records a stored artifact, merging on bucket, key and content hash.
    async fn merge_cos_object(
        &self,
        object: &NewCosObject,
    ) -> Result<Upserted<CosObject>, RepositoryError>;

    /// Appends a data node.
    ///
    /// * a node from the same source with the same ingest key is returned as is;
    /// * under `DedupePolicy::ExactKey` the latest node with the same dedup key
    ///   is returned as is;
    /// * otherwise a new node is created at the next version of its dedup key.
    ///
    /// # Errors
    ///
    /// `RepositoryError::NotFound` when the space object or data source of the
    /// node's provenance does not exist.
    async fn insert_data_node(
        &self,
        node: &NewDataNode,
        policy: DedupePolicy,
    ) -> Result<Upserted<DataNode>, RepositoryError>;

    async fn get_data_node(&self, id: DataNodeId) -> Result<Option<DataNode>, RepositoryError>;

    /// All data nodes attached to a space object, oldest first.
    async fn data_nodes_for_space_object(
        &self,
        id: SpaceObjectId,
    ) -> Result<Vec<DataNode>, RepositoryError>;
}
