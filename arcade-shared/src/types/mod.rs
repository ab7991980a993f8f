mod access_event;
mod catalog;
mod cos_object;
mod data_node;
mod data_source;
mod ids;
mod import_progress;
mod space_object;
mod user;

pub use access_event::{AccessEvent, UserAccessCount};
pub use catalog::{CatalogId, CatalogScheme};
pub use cos_object::{CosObject, NewCosObject};
pub use data_node::{
    validate_data_node, DataNode, DataNodeKind, DataPayload, EphemerisLine, NewDataNode,
    OrbitEphemerisMessage, Provenance, TwoLineElementSet, UnCompliance, REFERENCE_FRAMES,
};
pub use data_source::{DataSource, DataSourceSpec, DedupePolicy};
pub use ids::{CosObjectId, DataNodeId, DataSourceId, SpaceObjectId, UserId};
pub use import_progress::ImportProgress;
pub use space_object::SpaceObject;
pub use user::{normalize_email, User};

/// Result of a create-or-merge operation.
///
/// `created` is `true` only when the call wrote a new node; merges into an
/// existing node and exact duplicates report `false`.
#[derive(Clone, Debug, PartialEq)]
pub struct Upserted<T> {
    pub value: T,
    pub created: bool,
}

impl<T> Upserted<T> {
    pub fn created(value: T) -> Self {
        Self { value, created: true }
    }

    pub fn existing(value: T) -> Self {
        Self { value, created: false }
    }
}
