use arcade_shared::types::{DataSource, DataSourceId, User, UserId};

use crate::errors::RepositoryError;

/// Trait for users and their `has_access` grants.
///
/// Grants are managed administratively; granting twice or revoking a missing
/// grant is not an error.
#[async_trait::async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Creates a user, or returns the existing one with the same email.
    async fn create_user(&self, email: &str) -> Result<User, RepositoryError>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn grant_access(&self, user: UserId, source: DataSourceId) -> Result<(), RepositoryError>;
    async fn revoke_access(
        &self,
        user: UserId,
        source: DataSourceId,
    ) -> Result<(), RepositoryError>;
    async fn has_access(&self, user: UserId, source: DataSourceId) -> Result<bool, RepositoryError>;
    async fn grants_for_user(&self, user: UserId) -> Result<Vec<DataSource>, RepositoryError>;
}
