use arcade_graph::GraphError;
use arcade_repository::RepositoryError;
use cos::CosError;
use thiserror::Error;

use crate::errors::FeedError;

/// Errors that end an importer run.
///
/// Malformed records and truncation are not errors; they are reported in
/// [`crate::ImportResult`].
#[derive(Debug, Error)]
pub enum ImportError {
    /// Another run for the same data source holds the run lock.
    #[error("Importer for {0} is already running")]
    AlreadyRunning(String),

    /// The run lock expired and another run took it over.
    #[error("Run lock for {0} was lost")]
    LockLost(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Watermark error: {0}")]
    Watermark(#[from] RepositoryError),

    #[error("Archive error: {0}")]
    Archive(#[from] CosError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}
