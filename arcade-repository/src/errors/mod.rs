//! Error types for the graph repository.
mod repository;

pub use repository::RepositoryError;
