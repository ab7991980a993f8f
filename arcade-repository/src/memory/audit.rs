use std::collections::HashMap;

use arcade_shared::types::{AccessEvent, DataNodeId, UserAccessCount, UserId};

use super::InMemoryGraph;
use crate::errors::RepositoryError;
use crate::interfaces::AuditRepository;

fn chronological(mut events: Vec<AccessEvent>) -> Vec<AccessEvent> {
    // stable: equal timestamps keep insertion order
    events.sort_by_key(|event| event.accessed_at);
    events
}

#[async_trait::async_trait]
impl AuditRepository for InMemoryGraph {
    async fn append_access(&self, event: &AccessEvent) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if !state.users.contains_key(&event.user) {
            return Err(RepositoryError::NotFound(format!("user {}", event.user)));
        }
        if !state.data_nodes.contains_key(&event.data_node) {
            return Err(RepositoryError::NotFound(format!("data node {}", event.data_node)));
        }
        state.accesses.push(event.clone());
        Ok(())
    }

    async fn history_for_data_node(
        &self,
        data_node: DataNodeId,
    ) -> Result<Vec<AccessEvent>, RepositoryError> {
        let state = self.read()?;
        Ok(chronological(
            state
                .accesses
                .iter()
                .filter(|event| event.data_node == data_node)
                .cloned()
                .collect(),
        ))
    }

    async fn history_for_user(&self, user: UserId) -> Result<Vec<AccessEvent>, RepositoryError> {
        let state = self.read()?;
        Ok(chronological(
            state
                .accesses
                .iter()
                .filter(|event| event.user == user)
                .cloned()
                .collect(),
        ))
    }

    async fn access_counts(&self) -> Result<Vec<UserAccessCount>, RepositoryError> {
        let state = self.read()?;
        let mut counts: HashMap<UserId, u64> = HashMap::new();
        for event in &state.accesses {
            *counts.entry(event.user).or_default() += 1;
        }

        let mut report: Vec<UserAccessCount> = state
            .users
            .values()
            .map(|user| UserAccessCount {
                user: user.id,
                email: user.email.clone(),
                access_count: counts.get(&user.id).copied().unwrap_or_default(),
            })
            .collect();
        report.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(report)
    }
}
