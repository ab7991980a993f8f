use std::collections::BTreeSet;

use arcade_shared::types::{
    CatalogId, CosObject, CosObjectId, DataNode, DataNodeId, DataSource, DataSourceId,
    DataSourceSpec, DedupePolicy, NewCosObject, NewDataNode, SpaceObject, SpaceObjectId,
    Upserted,
};
use chrono::Utc;

use super::InMemoryGraph;
use crate::errors::RepositoryError;
use crate::interfaces::ProvenanceRepository;

#[async_trait::async_trait]
impl ProvenanceRepository for InMemoryGraph {
    async fn upsert_space_object(
        &self,
        identifiers: &[CatalogId],
        name: Option<&str>,
    ) -> Result<Upserted<SpaceObject>, RepositoryError> {
        if identifiers.is_empty() {
            return Err(RepositoryError::InvalidData(
                "space object needs at least one catalog identifier".to_string(),
            ));
        }

        let mut state = self.write()?;
        let matches: BTreeSet<SpaceObjectId> = identifiers
            .iter()
            .filter_map(|id| state.catalog.get(id).copied())
            .collect();

        let mut matched = matches.iter();
        let (id, created) = match (matched.next(), matched.next()) {
            (None, _) => {
                let object = SpaceObject {
                    id: SpaceObjectId::new(),
                    identifiers: BTreeSet::new(),
                    name: None,
                    created_at: Utc::now(),
                };
                let id = object.id;
                state.space_objects.insert(id, object);
                state.space_object_order.push(id);
                (id, true)
            }
            (Some(id), None) => (*id, false),
            (Some(_), Some(_)) => {
                return Err(RepositoryError::IdentityConflict {
                    identifiers: identifiers.to_vec(),
                    matches: matches.len(),
                })
            }
        };

        for identifier in identifiers {
            state.catalog.insert(identifier.clone(), id);
        }
        let object = state
            .space_objects
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("space object {}", id)))?;
        object.identifiers.extend(identifiers.iter().cloned());
        if object.name.is_none() {
            object.name = name.map(str::to_string);
        }

        let object = object.clone();
        Ok(if created {
            Upserted::created(object)
        } else {
            Upserted::existing(object)
        })
    }

    async fn get_space_object(
        &self,
        id: SpaceObjectId,
    ) -> Result<Option<SpaceObject>, RepositoryError> {
        Ok(self.read()?.space_objects.get(&id).cloned())
    }

    async fn find_space_object_by_catalog_id(
        &self,
        identifier: &CatalogId,
    ) -> Result<Option<SpaceObject>, RepositoryError> {
        let state = self.read()?;
        Ok(state
            .catalog
            .get(identifier)
            .and_then(|id| state.space_objects.get(id))
            .cloned())
    }

    async fn list_space_objects(&self) -> Result<Vec<SpaceObject>, RepositoryError> {
        let state = self.read()?;
        Ok(state
            .space_object_order
            .iter()
            .filter_map(|id| state.space_objects.get(id))
            .cloned()
            .collect())
    }

    async fn register_data_source(
        &self,
        spec: &DataSourceSpec,
    ) -> Result<Upserted<DataSource>, RepositoryError> {
        let mut state = self.write()?;
        if let Some(existing) = state
            .source_names
            .get(&spec.name)
            .and_then(|id| state.sources.get(id))
        {
            return Ok(Upserted::existing(existing.clone()));
        }

        let source = DataSource {
            id: DataSourceId::new(),
            name: spec.name.clone(),
            public: spec.public,
            dedupe: spec.dedupe,
        };
        state.source_names.insert(source.name.clone(), source.id);
        state.sources.insert(source.id, source.clone());
        Ok(Upserted::created(source))
    }

    async fn get_data_source(
        &self,
        id: DataSourceId,
    ) -> Result<Option<DataSource>, RepositoryError> {
        Ok(self.read()?.sources.get(&id).cloned())
    }

    async fn find_data_source_by_name(
        &self,
        name: &str,
    ) -> Result<Option<DataSource>, RepositoryError> {
        let state = self.read()?;
        Ok(state
            .source_names
            .get(name)
            .and_then(|id| state.sources.get(id))
            .cloned())
    }

    async fn set_data_source_public(
        &self,
        id: DataSourceId,
        public: bool,
    ) -> Result<DataSource, RepositoryError> {
        let mut state = self.write()?;
        let source = state
            .sources
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("data source {}", id)))?;
        source.public = public;
        Ok(source.clone())
    }

    async fn merge_cos_object(
        &self,
        object: &NewCosObject,
    ) -> Result<Upserted<CosObject>, RepositoryError> {
        let mut state = self.write()?;
        let reference = object.reference();
        if let Some(existing) = state.cos_objects.get(&reference) {
            return Ok(Upserted::existing(existing.clone()));
        }

        let stored = CosObject {
            id: CosObjectId::new(),
            bucket: object.bucket.clone(),
            key: object.key.clone(),
            content_hash: object.content_hash.clone(),
            size: object.size,
            created_at: Utc::now(),
        };
        state.cos_objects.insert(reference, stored.clone());
        Ok(Upserted::created(stored))
    }

    async fn insert_data_node(
        &self,
        node: &NewDataNode,
        policy: DedupePolicy,
    ) -> Result<Upserted<DataNode>, RepositoryError> {
        let source = node.provenance.data_source;
        let mut state = self.write()?;

        if !state.space_objects.contains_key(&node.provenance.space_object) {
            return Err(RepositoryError::NotFound(format!(
                "space object {}",
                node.provenance.space_object
            )));
        }
        if !state.sources.contains_key(&source) {
            return Err(RepositoryError::NotFound(format!("data source {}", source)));
        }
        if let Some(artifact) = node.artifact {
            if !state.cos_objects.values().any(|o| o.id == artifact) {
                return Err(RepositoryError::NotFound(format!("cos object {}", artifact)));
            }
        }

        if let Some(ingest_key) = &node.ingest_key {
            if let Some(existing) = state
                .ingest_keys
                .get(&(source, ingest_key.clone()))
                .and_then(|id| state.data_nodes.get(id))
            {
                return Ok(Upserted::existing(existing.clone()));
            }
        }

        let version_key = (source, node.dedup_key.clone());
        let latest = state
            .versions
            .get(&version_key)
            .and_then(|ids| ids.last())
            .and_then(|id| state.data_nodes.get(id));

        if let (DedupePolicy::ExactKey, Some(existing)) = (policy, latest) {
            return Ok(Upserted::existing(existing.clone()));
        }

        let version = latest.map(|n| n.version + 1).unwrap_or(1);
        let stored = DataNode::from_new(node, version);
        let id: DataNodeId = stored.id;

        if let Some(ingest_key) = &node.ingest_key {
            state.ingest_keys.insert((source, ingest_key.clone()), id);
        }
        state.versions.entry(version_key).or_default().push(id);
        state.node_order.push(id);
        state.data_nodes.insert(id, stored.clone());
        Ok(Upserted::created(stored))
    }

    async fn get_data_node(&self, id: DataNodeId) -> Result<Option<DataNode>, RepositoryError> {
        Ok(self.read()?.data_nodes.get(&id).cloned())
    }

    async fn data_nodes_for_space_object(
        &self,
        id: SpaceObjectId,
    ) -> Result<Vec<DataNode>, RepositoryError> {
        let state = self.read()?;
        Ok(state
            .node_order
            .iter()
            .filter_map(|node| state.data_nodes.get(node))
            .filter(|node| node.space_object == id)
            .cloned()
            .collect())
    }
}
