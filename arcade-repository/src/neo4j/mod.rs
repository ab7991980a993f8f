//! Neo4j implementation of the repository traits.
//!
//! Payloads of data nodes are stored as JSON strings; timestamps are stored
//! as RFC 3339 strings with microsecond precision so they sort correctly as
//! text.
mod audit;
mod identity;
mod indexer;
mod provenance;
mod rows;
mod watermark;

use neo4rs::{Graph, Query, Row, Txn};

use crate::errors::RepositoryError;

/// Graph store backed by a Neo4j database.
#[derive(Clone)]
pub struct Neo4jGraph {
    graph: Graph,
}

impl Neo4jGraph {
    /// Connects to Neo4j. Call [`Neo4jGraph::ensure_constraints`] once at
    /// startup before writing.
    pub fn connect(uri: &str, user: &str, password: &str) -> Result<Self, RepositoryError> {
        let graph = Graph::new(uri, user, password)?;
        Ok(Self { graph })
    }

    pub fn from_graph(graph: Graph) -> Self {
        Self { graph }
    }

    async fn fetch_all(&self, query: Query) -> Result<Vec<Row>, RepositoryError> {
        let mut result = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn fetch_one(&self, query: Query) -> Result<Option<Row>, RepositoryError> {
        let mut result = self.graph.execute(query).await?;
        Ok(result.next().await?)
    }
}

async fn txn_fetch_all(txn: &mut Txn, query: Query) -> Result<Vec<Row>, RepositoryError> {
    let mut stream = txn.execute(query).await?;
    let mut rows = Vec::new();
    while let Some(row) = stream.next(txn.handle()).await? {
        rows.push(row);
    }
    Ok(rows)
}
