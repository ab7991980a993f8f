use arcade_shared::types::{normalize_email, DataSource, DataSourceId, User, UserId};
use chrono::Utc;
use neo4rs::Query;

use super::rows::{self, timestamp};
use super::Neo4jGraph;
use crate::errors::RepositoryError;
use crate::interfaces::IdentityRepository;

const USER_RETURN: &str = "RETURN u.id AS id, u.email AS email, u.created_at AS created_at";

fn normalized(email: &str) -> Result<String, RepositoryError> {
    normalize_email(email).map_err(|e| RepositoryError::InvalidData(e.to_string()))
}

#[async_trait::async_trait]
impl IdentityRepository for Neo4jGraph {
    async fn create_user(&self, email: &str) -> Result<User, RepositoryError> {
        let query = Query::new(format!(
            "MERGE (u:User {{email: $email}})
             ON CREATE SET u.id = $id, u.created_at = $created_at
             {}",
            USER_RETURN
        ))
        .param("email", normalized(email)?)
        .param("id", UserId::new().to_string())
        .param("created_at", timestamp(&Utc::now()));

        let row = self
            .fetch_one(query)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", email)))?;
        rows::user(&row)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let query = Query::new(format!("MATCH (u:User {{id: $id}}) {}", USER_RETURN))
            .param("id", id.to_string());
        self.fetch_one(query).await?.map(|row| rows::user(&row)).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let query = Query::new(format!("MATCH (u:User {{email: $email}}) {}", USER_RETURN))
            .param("email", normalized(email)?);
        self.fetch_one(query).await?.map(|row| rows::user(&row)).transpose()
    }

    async fn grant_access(
        &self,
        user: UserId,
        source: DataSourceId,
    ) -> Result<(), RepositoryError> {
        let query = Query::new(
            "MATCH (u:User {id: $user})
             MATCH (s:DataSource {id: $source})
             MERGE (u)-[:has_access]->(s)
             RETURN u.id AS id"
                .to_string(),
        )
        .param("user", user.to_string())
        .param("source", source.to_string());

        match self.fetch_one(query).await? {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound(format!(
                "user {} or data source {}",
                user, source
            ))),
        }
    }

    async fn revoke_access(
        &self,
        user: UserId,
        source: DataSourceId,
    ) -> Result<(), RepositoryError> {
        let query = Query::new(
            "MATCH (:User {id: $user})-[g:has_access]->(:DataSource {id: $source}) DELETE g"
                .to_string(),
        )
        .param("user", user.to_string())
        .param("source", source.to_string());
        self.graph.run(query).await?;
        Ok(())
    }

    async fn has_access(
        &self,
        user: UserId,
        source: DataSourceId,
    ) -> Result<bool, RepositoryError> {
        let query = Query::new(
            "OPTIONAL MATCH (:User {id: $user})-[g:has_access]->(:DataSource {id: $source})
             RETURN count(g) > 0 AS granted"
                .to_string(),
        )
        .param("user", user.to_string())
        .param("source", source.to_string());

        match self.fetch_one(query).await? {
            Some(row) => Ok(row.get::<bool>("granted")?),
            None => Ok(false),
        }
    }

    async fn grants_for_user(&self, user: UserId) -> Result<Vec<DataSource>, RepositoryError> {
        let query = Query::new(
            "MATCH (:User {id: $user})-[:has_access]->(s:DataSource)
             RETURN s.id AS id, s.name AS name, s.public AS public, s.dedupe AS dedupe
             ORDER BY name"
                .to_string(),
        )
        .param("user", user.to_string());
        self.fetch_all(query).await?.iter().map(rows::data_source).collect()
    }
}
