use arcade_shared::types::{AccessEvent, DataNodeId, UserAccessCount, UserId};

use crate::errors::RepositoryError;

/// Trait for the append-only `accessed` log.
///
/// There is deliberately no update or delete. Histories are returned in
/// chronological order; events with the same timestamp keep insertion order.
#[async_trait::async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append_access(&self, event: &AccessEvent) -> Result<(), RepositoryError>;

    async fn history_for_data_node(
        &self,
        data_node: DataNodeId,
    ) -> Result<Vec<AccessEvent>, RepositoryError>;

    async fn history_for_user(&self, user: UserId) -> Result<Vec<AccessEvent>, RepositoryError>;

    /// Number of recorded accesses per user, for every known user.
    async fn access_counts(&self) -> Result<Vec<UserAccessCount>, RepositoryError>;
}
