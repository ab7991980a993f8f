//! # Arcade Repository
//! This crate provides the storage seam of the ASO graph. It includes the
//! repository traits consumed by the graph services and importers, an
//! in-memory graph for tests and local runs, and a Neo4j implementation.
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod neo4j;

pub use errors::RepositoryError;
pub use interfaces::{
    AuditRepository, IdentityRepository, ProvenanceRepository, WatermarkRepository,
};
pub use memory::InMemoryGraph;
pub use neo4j::Neo4jGraph;
