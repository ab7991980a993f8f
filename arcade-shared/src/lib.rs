//! # Arcade Shared
//! Domain types shared by the repository, graph, and importer crates:
//! node identifiers, catalog identifiers, graph entities, data node payloads,
//! audit events and import progress markers.
pub mod errors;
pub mod types;

pub use errors::ValidationError;
