use arcade_shared::types::CatalogId;
use thiserror::Error;

/// Represents errors that can occur within the graph repository.
///
/// Storage driver failures are wrapped as they are. Conflicts and missing
/// references are reported as their own variants so that callers can map
/// them to domain outcomes.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Neo4j error: {0}")]
    Neo4j(#[from] neo4rs::Error),

    #[error("Row deserialization error: {0}")]
    Deserialize(#[from] neo4rs::DeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Identifiers {identifiers:?} match {matches} distinct space objects")]
    IdentityConflict {
        identifiers: Vec<CatalogId>,
        matches: usize,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Repository unavailable: {0}")]
    Unavailable(String),
}
