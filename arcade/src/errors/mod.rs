//! Error types for the arcade service.

use arcade_graph::GraphError;
use arcade_importer::FeedError;
use arcade_repository::RepositoryError;
use thiserror::Error;

/// An environment variable that is set but cannot be used.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{name} requires {requires} to be set")]
    Incomplete {
        name: &'static str,
        requires: &'static str,
    },
}

impl ConfigError {
    pub fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors that can occur during service initialization or execution.
#[derive(Error, Debug)]
pub enum ArcadeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Graph store error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}
