//! The access-control gate.
use std::fmt;
use std::sync::Arc;

use arcade_repository::{IdentityRepository, ProvenanceRepository};
use arcade_shared::types::{AccessEvent, DataNodeId, UserId};
use tracing::{debug, error, instrument};

use crate::audit::AuditRecorder;
use crate::errors::GraphError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    /// The source is private and the user holds no grant for it.
    NoGrant,
    /// The data node has no resolvable data source.
    OrphanedData,
    UnknownUser,
    UnknownDataNode,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DenyReason::NoGrant => "no grant",
            DenyReason::OrphanedData => "orphaned data",
            DenyReason::UnknownUser => "unknown user",
            DenyReason::UnknownDataNode => "unknown data node",
        };
        f.write_str(reason)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// The single decision function in front of every data read.
///
/// Every `Allow` is handed to the [`AuditRecorder`] without waiting for the
/// write, so a failing audit store never turns an `Allow` into a `Deny`.
#[derive(Clone)]
pub struct AccessGate {
    provenance: Arc<dyn ProvenanceRepository>,
    identity: Arc<dyn IdentityRepository>,
    audit: AuditRecorder,
}

impl AccessGate {
    pub fn new(
        provenance: Arc<dyn ProvenanceRepository>,
        identity: Arc<dyn IdentityRepository>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            provenance,
            identity,
            audit,
        }
    }

    /// Decides whether `user` may read `data_node` through `endpoint`.
    ///
    /// Orphaned nodes are denied before the caller is looked at. Public
    /// sources allow every known user; private sources require a grant.
    ///
    /// # Errors
    ///
    /// Only storage failures are errors. Denials are `Ok(Decision::Deny(_))`.
    #[instrument(skip(self, user, data_node), fields(user = %user, data_node = %data_node))]
    pub async fn authorize(
        &self,
        user: UserId,
        data_node: DataNodeId,
        endpoint: &str,
    ) -> Result<Decision, GraphError> {
        let Some(node) = self.provenance.get_data_node(data_node).await? else {
            return Ok(Decision::Deny(DenyReason::UnknownDataNode));
        };

        let source = match node.provided_by {
            Some(source) => self.provenance.get_data_source(source).await?,
            None => None,
        };
        let Some(source) = source else {
            error!(
                data_node = %node.id,
                space_object = %node.space_object,
                provided_by = ?node.provided_by,
                "Orphaned data node: no resolvable data source"
            );
            return Ok(Decision::Deny(DenyReason::OrphanedData));
        };

        if self.identity.get_user(user).await?.is_none() {
            return Ok(Decision::Deny(DenyReason::UnknownUser));
        }

        if !source.public && !self.identity.has_access(user, source.id).await? {
            debug!(source = %source.name, "Denied: no grant");
            return Ok(Decision::Deny(DenyReason::NoGrant));
        }

        self.audit.record(AccessEvent::now(user, data_node, endpoint));
        Ok(Decision::Allow)
    }
}
