use std::collections::BTreeSet;

use arcade_shared::types::{
    CatalogId, CosObject, CosObjectId, DataNode, DataNodeId, DataSource, DataSourceId,
    DataSourceSpec, DedupePolicy, NewCosObject, NewDataNode, SpaceObject, SpaceObjectId,
    Upserted,
};
use chrono::Utc;
use neo4rs::Query;

use super::rows::{self, timestamp};
use super::{txn_fetch_all, Neo4jGraph};
use crate::errors::RepositoryError;
use crate::interfaces::ProvenanceRepository;

const SPACE_OBJECT_RETURN: &str = "
    OPTIONAL MATCH (c:CatalogId)-[:identifies]->(o)
    RETURN o.id AS id, o.name AS name, o.created_at AS created_at, collect(c.key) AS identifiers";

const DATA_SOURCE_RETURN: &str =
    "RETURN s.id AS id, s.name AS name, s.public AS public, s.dedupe AS dedupe";

const DATA_NODE_RETURN: &str = "
    OPTIONAL MATCH (n)-[:provided_by]->(s:DataSource)
    OPTIONAL MATCH (n)-[:stored_in]->(c:COSObject)
    RETURN n.id AS id, o.id AS space_object, s.id AS provided_by, n.dedup_key AS dedup_key,
           n.ingest_key AS ingest_key, n.version AS version, n.payload AS payload,
           c.id AS artifact, n.created_at AS created_at";

impl Neo4jGraph {
    async fn space_object_by_id(
        &self,
        id: &str,
    ) -> Result<Option<SpaceObject>, RepositoryError> {
        let query = Query::new(format!(
            "MATCH (o:SpaceObject {{id: $id}}) {}",
            SPACE_OBJECT_RETURN
        ))
        .param("id", id.to_string());
        self.fetch_one(query)
            .await?
            .map(|row| rows::space_object(&row))
            .transpose()
    }

    async fn data_node_by_id(&self, id: &str) -> Result<Option<DataNode>, RepositoryError> {
        let query = Query::new(format!(
            "MATCH (n:DataNode {{id: $id}})-[:belongs_to]->(o:SpaceObject) {}",
            DATA_NODE_RETURN
        ))
        .param("id", id.to_string());
        self.fetch_one(query)
            .await?
            .map(|row| rows::data_node(&row))
            .transpose()
    }

    async fn require_data_node(&self, id: &str) -> Result<DataNode, RepositoryError> {
        self.data_node_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("data node {}", id)))
    }
}

#[async_trait::async_trait]
impl ProvenanceRepository for Neo4jGraph {
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
        // sorted so concurrent callers lock catalog ids in the same order
        let keys: Vec<String> = identifiers
            .iter()
            .map(CatalogId::key)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut txn = self.graph.start_txn().await?;
        // Holding the write lock of every catalog id serializes upserts that
        // share an identifier: the match below sees all committed links.
        txn.run(
            Query::new(
                "UNWIND $keys AS key
                 MERGE (c:CatalogId {key: key})
                 SET c.seen_at = $now"
                    .to_string(),
            )
            .param("keys", keys.clone())
            .param("now", timestamp(&Utc::now())),
        )
        .await?;
        let matches = txn_fetch_all(
            &mut txn,
            Query::new(
                "UNWIND $keys AS key
                 MATCH (:CatalogId {key: key})-[:identifies]->(o:SpaceObject)
                 RETURN DISTINCT o.id AS id"
                    .to_string(),
            )
            .param("keys", keys.clone()),
        )
        .await?;

        let (id, created) = match matches.as_slice() {
            [] => {
                let id = SpaceObjectId::new().to_string();
                txn.run(
                    Query::new(
                        "CREATE (:SpaceObject {id: $id, created_at: $created_at})".to_string(),
                    )
                    .param("id", id.clone())
                    .param("created_at", timestamp(&Utc::now())),
                )
                .await?;
                (id, true)
            }
            [row] => (row.get::<String>("id")?, false),
            _ => {
                txn.rollback().await?;
                return Err(RepositoryError::IdentityConflict {
                    identifiers: identifiers.to_vec(),
                    matches: matches.len(),
                });
            }
        };

        txn.run(
            Query::new(
                "MATCH (o:SpaceObject {id: $id})
                 UNWIND $keys AS key
                 MERGE (c:CatalogId {key: key})
                 MERGE (c)-[:identifies]->(o)"
                    .to_string(),
            )
            .param("id", id.clone())
            .param("keys", keys.clone()),
        )
        .await?;

        let shared = txn_fetch_all(
            &mut txn,
            Query::new(
                "UNWIND $keys AS key
                 MATCH (:CatalogId {key: key})-[:identifies]->(o:SpaceObject)
                 WITH key, count(DISTINCT o) AS objects
                 WHERE objects > 1
                 RETURN key, objects"
                    .to_string(),
            )
            .param("keys", keys),
        )
        .await?;
        if let Some(row) = shared.first() {
            let objects = row.get::<i64>("objects")?;
            txn.rollback().await?;
            return Err(RepositoryError::IdentityConflict {
                identifiers: identifiers.to_vec(),
                matches: usize::try_from(objects).unwrap_or(usize::MAX),
            });
        }

        if let Some(name) = name {
            txn.run(
                Query::new(
                    "MATCH (o:SpaceObject {id: $id}) SET o.name = coalesce(o.name, $name)"
                        .to_string(),
                )
                .param("id", id.clone())
                .param("name", name.to_string()),
            )
            .await?;
        }
        txn.commit().await?;

        let object = self
            .space_object_by_id(&id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("space object {}", id)))?;
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
        self.space_object_by_id(&id.to_string()).await
    }

    async fn find_space_object_by_catalog_id(
        &self,
        identifier: &CatalogId,
    ) -> Result<Option<SpaceObject>, RepositoryError> {
        let query = Query::new(format!(
            "MATCH (:CatalogId {{key: $key}})-[:identifies]->(o:SpaceObject) {}",
            SPACE_OBJECT_RETURN
        ))
        .param("key", identifier.key());
        self.fetch_one(query)
            .await?
            .map(|row| rows::space_object(&row))
            .transpose()
    }

    async fn list_space_objects(&self) -> Result<Vec<SpaceObject>, RepositoryError> {
        let query = Query::new(format!(
            "MATCH (o:SpaceObject) {} ORDER BY created_at",
            SPACE_OBJECT_RETURN
        ));
        self.fetch_all(query)
            .await?
            .iter()
            .map(rows::space_object)
            .collect()
    }

    async fn register_data_source(
        &self,
        spec: &DataSourceSpec,
    ) -> Result<Upserted<DataSource>, RepositoryError> {
        let id = DataSourceId::new();
        let query = Query::new(format!(
            "MERGE (s:DataSource {{name: $name}})
             ON CREATE SET s.id = $id, s.public = $public, s.dedupe = $dedupe
             {}",
            DATA_SOURCE_RETURN
        ))
        .param("name", spec.name.clone())
        .param("id", id.to_string())
        .param("public", spec.public)
        .param("dedupe", spec.dedupe.as_str());

        let row = self
            .fetch_one(query)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("data source {}", spec.name)))?;
        let source = rows::data_source(&row)?;
        Ok(if source.id == id {
            Upserted::created(source)
        } else {
            Upserted::existing(source)
        })
    }

    async fn get_data_source(
        &self,
        id: DataSourceId,
    ) -> Result<Option<DataSource>, RepositoryError> {
        let query = Query::new(format!("MATCH (s:DataSource {{id: $id}}) {}", DATA_SOURCE_RETURN))
            .param("id", id.to_string());
        self.fetch_one(query)
            .await?
            .map(|row| rows::data_source(&row))
            .transpose()
    }

    async fn find_data_source_by_name(
        &self,
        name: &str,
    ) -> Result<Option<DataSource>, RepositoryError> {
        let query =
            Query::new(format!("MATCH (s:DataSource {{name: $name}}) {}", DATA_SOURCE_RETURN))
                .param("name", name.to_string());
        self.fetch_one(query)
            .await?
            .map(|row| rows::data_source(&row))
            .transpose()
    }

    async fn set_data_source_public(
        &self,
        id: DataSourceId,
        public: bool,
    ) -> Result<DataSource, RepositoryError> {
        let query = Query::new(format!(
            "MATCH (s:DataSource {{id: $id}}) SET s.public = $public {}",
            DATA_SOURCE_RETURN
        ))
        .param("id", id.to_string())
        .param("public", public);
        let row = self
            .fetch_one(query)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("data source {}", id)))?;
        rows::data_source(&row)
    }

    async fn merge_cos_object(
        &self,
        object: &NewCosObject,
    ) -> Result<Upserted<CosObject>, RepositoryError> {
        let id = CosObjectId::new();
        let size = i64::try_from(object.size).map_err(|_| {
            RepositoryError::InvalidData(format!("object too large: {}", object.size))
        })?;
        let query = Query::new(
            "MERGE (b:COSBucket {name: $bucket})
             MERGE (c:COSObject {ref: $ref})
             ON CREATE SET c.id = $id, c.bucket = $bucket, c.key = $key,
                           c.content_hash = $content_hash, c.size = $size,
                           c.created_at = $created_at
             MERGE (c)-[:in_bucket]->(b)
             RETURN c.id AS id, c.bucket AS bucket, c.key AS key,
                    c.content_hash AS content_hash, c.size AS size, c.created_at AS created_at"
                .to_string(),
        )
        .param("bucket", object.bucket.clone())
        .param("ref", object.reference())
        .param("id", id.to_string())
        .param("key", object.key.clone())
        .param("content_hash", object.content_hash.clone())
        .param("size", size)
        .param("created_at", timestamp(&Utc::now()));

        let row = self
            .fetch_one(query)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(object.reference()))?;
        let stored = rows::cos_object(&row)?;
        Ok(if stored.id == id {
            Upserted::created(stored)
        } else {
            Upserted::existing(stored)
        })
    }

    async fn insert_data_node(
        &self,
        node: &NewDataNode,
        policy: DedupePolicy,
    ) -> Result<Upserted<DataNode>, RepositoryError> {
        let space_object = node.provenance.space_object.to_string();
        let source = node.provenance.data_source.to_string();

        let mut txn = self.graph.start_txn().await?;
        let present = txn_fetch_all(
            &mut txn,
            Query::new(
                "OPTIONAL MATCH (o:SpaceObject {id: $space_object})
                 OPTIONAL MATCH (s:DataSource {id: $source})
                 RETURN o IS NOT NULL AS has_object, s IS NOT NULL AS has_source"
                    .to_string(),
            )
            .param("space_object", space_object.clone())
            .param("source", source.clone()),
        )
        .await?;
        let (has_object, has_source) = match present.first() {
            Some(row) => (row.get::<bool>("has_object")?, row.get::<bool>("has_source")?),
            None => (false, false),
        };
        if !has_object || !has_source {
            txn.rollback().await?;
            return Err(RepositoryError::NotFound(if has_object {
                format!("data source {}", source)
            } else {
                format!("space object {}", space_object)
            }));
        }

        if let Some(ingest_key) = &node.ingest_key {
            let replay = txn_fetch_all(
                &mut txn,
                Query::new(
                    "MATCH (n:DataNode {ingest_key: $ingest_key})-[:provided_by]->(:DataSource {id: $source})
                     RETURN n.id AS id LIMIT 1"
                        .to_string(),
                )
                .param("ingest_key", ingest_key.clone())
                .param("source", source.clone()),
            )
            .await?;
            if let Some(row) = replay.first() {
                let id = row.get::<String>("id")?;
                txn.commit().await?;
                return Ok(Upserted::existing(self.require_data_node(&id).await?));
            }
        }

        let latest = txn_fetch_all(
            &mut txn,
            Query::new(
                "MATCH (n:DataNode {dedup_key: $dedup_key})-[:provided_by]->(:DataSource {id: $source})
                 RETURN n.id AS id, n.version AS version
                 ORDER BY n.version DESC LIMIT 1"
                    .to_string(),
            )
            .param("dedup_key", node.dedup_key.clone())
            .param("source", source.clone()),
        )
        .await?;
        let latest = match latest.first() {
            Some(row) => Some((row.get::<String>("id")?, row.get::<i64>("version")?)),
            None => None,
        };

        if let (DedupePolicy::ExactKey, Some((id, _))) = (policy, &latest) {
            txn.commit().await?;
            return Ok(Upserted::existing(self.require_data_node(id).await?));
        }

        let version = latest.map(|(_, version)| version + 1).unwrap_or(1);
        let id = DataNodeId::new().to_string();
        let payload = serde_json::to_string(&node.payload)?;

        txn.run(
            Query::new(
                "MATCH (o:SpaceObject {id: $space_object})
                 MATCH (s:DataSource {id: $source})
                 CREATE (n:DataNode {id: $id, kind: $kind, dedup_key: $dedup_key,
                                     version: $version, payload: $payload,
                                     created_at: $created_at})
                 CREATE (n)-[:provided_by]->(s)
                 CREATE (n)-[:belongs_to]->(o)"
                    .to_string(),
            )
            .param("space_object", space_object)
            .param("source", source)
            .param("id", id.clone())
            .param("kind", node.kind().as_str())
            .param("dedup_key", node.dedup_key.clone())
            .param("version", version)
            .param("payload", payload)
            .param("created_at", timestamp(&Utc::now())),
        )
        .await?;

        if let Some(ingest_key) = &node.ingest_key {
            txn.run(
                Query::new(
                    "MATCH (n:DataNode {id: $id}) SET n.ingest_key = $ingest_key".to_string(),
                )
                .param("id", id.clone())
                .param("ingest_key", ingest_key.clone()),
            )
            .await?;
        }

        if let Some(artifact) = node.artifact {
            let linked = txn_fetch_all(
                &mut txn,
                Query::new(
                    "MATCH (n:DataNode {id: $id})
                     MATCH (c:COSObject {id: $artifact})
                     CREATE (n)-[:stored_in]->(c)
                     RETURN c.id AS id"
                        .to_string(),
                )
                .param("id", id.clone())
                .param("artifact", artifact.to_string()),
            )
            .await?;
            if linked.is_empty() {
                txn.rollback().await?;
                return Err(RepositoryError::NotFound(format!("cos object {}", artifact)));
            }
        }

        txn.commit().await?;
        Ok(Upserted::created(self.require_data_node(&id).await?))
    }

    async fn get_data_node(&self, id: DataNodeId) -> Result<Option<DataNode>, RepositoryError> {
        self.data_node_by_id(&id.to_string()).await
    }

    async fn data_nodes_for_space_object(
        &self,
        id: SpaceObjectId,
    ) -> Result<Vec<DataNode>, RepositoryError> {
        let query = Query::new(format!(
            "MATCH (n:DataNode)-[:belongs_to]->(o:SpaceObject {{id: $id}}) {} ORDER BY created_at",
            DATA_NODE_RETURN
        ))
        .param("id", id.to_string());
        self.fetch_all(query)
            .await?
            .iter()
            .map(rows::data_node)
            .collect()
    }
}
