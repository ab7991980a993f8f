use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CatalogId, CatalogScheme, SpaceObjectId};

/// Stable identity for one anthropogenic space object.
///
/// A space object is never deleted; later ingestions only add identifiers to
/// `identifiers`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpaceObject {
    pub id: SpaceObjectId,
    pub identifiers: BTreeSet<CatalogId>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SpaceObject {
    /// Returns the first identifier of the given scheme, if any.
    pub fn identifier(&self, scheme: CatalogScheme) -> Option<&CatalogId> {
        self.identifiers.iter().find(|id| id.scheme() == scheme)
    }

    pub fn norad_id(&self) -> Option<&str> {
        self.identifier(CatalogScheme::Norad).map(|id| id.value())
    }

    pub fn cospar_id(&self) -> Option<&str> {
        self.identifier(CatalogScheme::Cospar).map(|id| id.value())
    }
}
