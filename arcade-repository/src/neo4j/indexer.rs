// Neo4j constraint creation
use neo4rs::Query;
use tracing::{info, warn};

use super::Neo4jGraph;
use crate::errors::RepositoryError;

const CONSTRAINTS: &[(&str, &str)] = &[
    (
        "catalog_id_key_unique",
        "CREATE CONSTRAINT catalog_id_key_unique IF NOT EXISTS FOR (c:CatalogId) REQUIRE c.key IS UNIQUE",
    ),
    (
        "space_object_id_unique",
        "CREATE CONSTRAINT space_object_id_unique IF NOT EXISTS FOR (o:SpaceObject) REQUIRE o.id IS UNIQUE",
    ),
    (
        "data_source_name_unique",
        "CREATE CONSTRAINT data_source_name_unique IF NOT EXISTS FOR (s:DataSource) REQUIRE s.name IS UNIQUE",
    ),
    (
        "user_email_unique",
        "CREATE CONSTRAINT user_email_unique IF NOT EXISTS FOR (u:User) REQUIRE u.email IS UNIQUE",
    ),
    (
        "cos_bucket_name_unique",
        "CREATE CONSTRAINT cos_bucket_name_unique IF NOT EXISTS FOR (b:COSBucket) REQUIRE b.name IS UNIQUE",
    ),
    (
        "cos_object_ref_unique",
        "CREATE CONSTRAINT cos_object_ref_unique IF NOT EXISTS FOR (c:COSObject) REQUIRE c.ref IS UNIQUE",
    ),
    (
        "data_node_id_unique",
        "CREATE CONSTRAINT data_node_id_unique IF NOT EXISTS FOR (n:DataNode) REQUIRE n.id IS UNIQUE",
    ),
    (
        "import_lock_source_unique",
        "CREATE CONSTRAINT import_lock_source_unique IF NOT EXISTS FOR (l:ImportLock) REQUIRE l.source IS UNIQUE",
    ),
];

const INDEXES: &[(&str, &str)] = &[
    (
        "data_node_dedup_key",
        "CREATE INDEX data_node_dedup_key IF NOT EXISTS FOR (n:DataNode) ON (n.dedup_key)",
    ),
    (
        "data_node_ingest_key",
        "CREATE INDEX data_node_ingest_key IF NOT EXISTS FOR (n:DataNode) ON (n.ingest_key)",
    ),
    (
        "import_progress_source",
        "CREATE INDEX import_progress_source IF NOT EXISTS FOR (p:ImportProgress) ON (p.source, p.entry)",
    ),
];

impl Neo4jGraph {
    /// Creates the unique constraints the merge operations rely on.
    ///
    /// A failing constraint is fatal: without it concurrent merges could
    /// create duplicate nodes. Failing indexes only cost performance and are
    /// logged.
    pub async fn ensure_constraints(&self) -> Result<(), RepositoryError> {
        for (name, statement) in CONSTRAINTS {
            self.graph.run(Query::new(statement.to_string())).await?;
            info!(constraint = name, "Ensured constraint");
        }

        for (name, statement) in INDEXES {
            match self.graph.run(Query::new(statement.to_string())).await {
                Ok(_) => info!(index = name, "Ensured index"),
                Err(e) => warn!(index = name, error = %e, "Failed to create index"),
            }
        }

        Ok(())
    }
}
