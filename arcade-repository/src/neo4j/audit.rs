use arcade_shared::types::{AccessEvent, DataNodeId, UserAccessCount, UserId};
use neo4rs::Query;

use super::rows::{self, timestamp};
use super::Neo4jGraph;
use crate::errors::RepositoryError;
use crate::interfaces::AuditRepository;

const ACCESS_RETURN: &str = "RETURN u.id AS user, n.id AS data_node, a.endpoint AS endpoint, a.at AS at
     ORDER BY a.at";

#[async_trait::async_trait]
impl AuditRepository for Neo4jGraph {
    async fn append_access(&self, event: &AccessEvent) -> Result<(), RepositoryError> {
        let query = Query::new(
            "MATCH (u:User {id: $user})
             MATCH (n:DataNode {id: $data_node})
             CREATE (u)-[:accessed {endpoint: $endpoint, at: $at}]->(n)
             RETURN n.id AS id"
                .to_string(),
        )
        .param("user", event.user.to_string())
        .param("data_node", event.data_node.to_string())
        .param("endpoint", event.endpoint.clone())
        .param("at", timestamp(&event.accessed_at));

        match self.fetch_one(query).await? {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound(format!(
                "user {} or data node {}",
                event.user, event.data_node
            ))),
        }
    }

    async fn history_for_data_node(
        &self,
        data_node: DataNodeId,
    ) -> Result<Vec<AccessEvent>, RepositoryError> {
        let query = Query::new(format!(
            "MATCH (u:User)-[a:accessed]->(n:DataNode {{id: $id}}) {}",
            ACCESS_RETURN
        ))
        .param("id", data_node.to_string());
        self.fetch_all(query).await?.iter().map(rows::access_event).collect()
    }

    async fn history_for_user(&self, user: UserId) -> Result<Vec<AccessEvent>, RepositoryError> {
        let query = Query::new(format!(
            "MATCH (u:User {{id: $id}})-[a:accessed]->(n:DataNode) {}",
            ACCESS_RETURN
        ))
        .param("id", user.to_string());
        self.fetch_all(query).await?.iter().map(rows::access_event).collect()
    }

    async fn access_counts(&self) -> Result<Vec<UserAccessCount>, RepositoryError> {
        let query = Query::new(
            "MATCH (u:User)
             OPTIONAL MATCH (u)-[a:accessed]->(:DataNode)
             RETURN u.id AS user, u.email AS email, count(a) AS access_count
             ORDER BY email"
                .to_string(),
        );
        self.fetch_all(query).await?.iter().map(rows::access_count).collect()
    }
}
