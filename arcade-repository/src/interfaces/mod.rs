//! This module defines and re-exports the interfaces of the graph repository.
mod audit;
mod identity;
mod provenance;
mod watermark;

pub use audit::AuditRepository;
pub use identity::IdentityRepository;
pub use provenance::ProvenanceRepository;
pub use watermark::WatermarkRepository;
pub(crate) use watermark::lease_expiry;
