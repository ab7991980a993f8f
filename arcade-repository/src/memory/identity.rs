use arcade_shared::types::{normalize_email, DataSource, DataSourceId, User, UserId};
use chrono::Utc;

use super::InMemoryGraph;
use crate::errors::RepositoryError;
use crate::interfaces::IdentityRepository;

fn normalized(email: &str) -> Result<String, RepositoryError> {
    normalize_email(email).map_err(|e| RepositoryError::InvalidData(e.to_string()))
}

#[async_trait::async_trait]
impl IdentityRepository for InMemoryGraph {
    async fn create_user(&self, email: &str) -> Result<User, RepositoryError> {
        let email = normalized(email)?;
        let mut state = self.write()?;
        if let Some(user) = state.user_emails.get(&email).and_then(|id| state.users.get(id)) {
            return Ok(user.clone());
        }

        let user = User {
            id: UserId::new(),
            email,
            created_at: Utc::now(),
        };
        state.user_emails.insert(user.email.clone(), user.id);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let email = normalized(email)?;
        let state = self.read()?;
        Ok(state
            .user_emails
            .get(&email)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn grant_access(
        &self,
        user: UserId,
        source: DataSourceId,
    ) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if !state.users.contains_key(&user) {
            return Err(RepositoryError::NotFound(format!("user {}", user)));
        }
        if !state.sources.contains_key(&source) {
            return Err(RepositoryError::NotFound(format!("data source {}", source)));
        }
        state.grants.insert((user, source));
        Ok(())
    }

    async fn revoke_access(
        &self,
        user: UserId,
        source: DataSourceId,
    ) -> Result<(), RepositoryError> {
        self.write()?.grants.remove(&(user, source));
        Ok(())
    }

    async fn has_access(
        &self,
        user: UserId,
        source: DataSourceId,
    ) -> Result<bool, RepositoryError> {
        Ok(self.read()?.grants.contains(&(user, source)))
    }

    async fn grants_for_user(&self, user: UserId) -> Result<Vec<DataSource>, RepositoryError> {
        let state = self.read()?;
        let mut sources: Vec<DataSource> = state
            .grants
            .iter()
            .filter(|(granted_to, _)| *granted_to == user)
            .filter_map(|(_, source)| state.sources.get(source))
            .cloned()
            .collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sources)
    }
}
