//! # Arcade Graph
//! The data-fusion and access-control core of the ASO graph.
//!
//! * [`ProvenanceGraph`] resolves space object identity and appends data
//!   nodes with their provenance.
//! * [`IdentityStore`] manages users and their `has_access` grants.
//! * [`AccessGate`] decides whether a user may read a data node and records
//!   every allowed read through the [`AuditRecorder`].
//! * [`AuditTrail`] answers history and usage queries over the `accessed` log.
pub mod access;
pub mod audit;
pub mod errors;
pub mod identity;
pub mod provenance;

pub use access::{AccessGate, Decision, DenyReason};
pub use audit::{AuditRecorder, AuditTrail};
pub use errors::GraphError;
pub use identity::IdentityStore;
pub use provenance::ProvenanceGraph;
