use std::sync::Arc;

use arcade_repository::IdentityRepository;
use arcade_shared::types::{DataSource, DataSourceId, User, UserId};
use tracing::info;

use crate::errors::GraphError;

/// Users and their explicit `has_access` grants.
///
/// Grants are administrative; the access gate only reads them.
#[derive(Clone)]
pub struct IdentityStore {
    repository: Arc<dyn IdentityRepository>,
}

impl IdentityStore {
    pub fn new(repository: Arc<dyn IdentityRepository>) -> Self {
        Self { repository }
    }

    pub async fn create_user(&self, email: &str) -> Result<User, GraphError> {
        Ok(self.repository.create_user(email).await?)
    }

    pub async fn user(&self, id: UserId) -> Result<Option<User>, GraphError> {
        Ok(self.repository.get_user(id).await?)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, GraphError> {
        Ok(self.repository.find_user_by_email(email).await?)
    }

    pub async fn grant_access(&self, user: UserId, source: DataSourceId) -> Result<(), GraphError> {
        self.repository.grant_access(user, source).await?;
        info!(user = %user, data_source = %source, "Granted access");
        Ok(())
    }

    pub async fn revoke_access(
        &self,
        user: UserId,
        source: DataSourceId,
    ) -> Result<(), GraphError> {
        self.repository.revoke_access(user, source).await?;
        info!(user = %user, data_source = %source, "Revoked access");
        Ok(())
    }

    pub async fn has_access(&self, user: UserId, source: DataSourceId) -> Result<bool, GraphError> {
        Ok(self.repository.has_access(user, source).await?)
    }

    pub async fn grants_for_user(&self, user: UserId) -> Result<Vec<DataSource>, GraphError> {
        Ok(self.repository.grants_for_user(user).await?)
    }
}
