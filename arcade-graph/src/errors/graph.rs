use arcade_repository::RepositoryError;
use arcade_shared::types::{CatalogId, DataSourceId};
use arcade_shared::ValidationError;
use thiserror::Error;

/// Represents errors raised by the graph services.
///
/// Expected access denials are not errors; they are returned as
/// [`crate::Decision::Deny`].
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Repository error: {0}")]
    Repository(RepositoryError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Identity conflict: {identifiers:?} span {matches} space objects")]
    IdentityConflict {
        identifiers: Vec<CatalogId>,
        matches: usize,
    },

    #[error("Space object not found: {0}")]
    SpaceObjectNotFound(CatalogId),

    #[error("Unknown data source: {0}")]
    UnknownDataSource(DataSourceId),
}

impl From<RepositoryError> for GraphError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::IdentityConflict {
                identifiers,
                matches,
            } => GraphError::IdentityConflict {
                identifiers,
                matches,
            },
            other => GraphError::Repository(other),
        }
    }
}
