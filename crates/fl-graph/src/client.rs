//! Neo4j connection management and shared graph client.

use neo4rs::{ConfigBuilder, Graph, Query};
use serde::Deserialize;

use fl_core::ChurchLevel;

use crate::records::CHURCH_LABEL;

const SCHEMA_STATEMENTS: [&str; 5] = [
    "CREATE CONSTRAINT member_id IF NOT EXISTS FOR (m:Member) REQUIRE m.id IS UNIQUE",
    "CREATE CONSTRAINT member_email IF NOT EXISTS FOR (m:Member) REQUIRE m.email IS UNIQUE",
    "CREATE CONSTRAINT church_id IF NOT EXISTS FOR (c:Church) REQUIRE c.id IS UNIQUE",
    "CREATE INDEX member_auth_id IF NOT EXISTS FOR (m:Member) ON (m.auth_id)",
    "CREATE INDEX service_reference IF NOT EXISTS FOR (r:ServiceRecord) ON (r.transactionReference)",
];

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("{label} with id {id} not found")]
    NotFound { label: String, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GraphError {
    pub fn not_found(label: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            label: label.into(),
            id: id.to_string(),
        }
    }

    /// Turn a uniqueness constraint violation into a conflict with `message`.
    pub(crate) fn on_constraint(self, message: &str) -> Self {
        match &self {
            Self::Query(e) if e.to_string().contains("ConstraintValidationFailed") => {
                Self::Conflict(message.to_string())
            }
            _ => self,
        }
    }
}

/// Configuration for connecting to Neo4j.
///
/// Loaded from the `[neo4j]` section or `FLC__NEO4J__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "fl-admin-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// One client is created at startup and shared by every request.
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Create the uniqueness constraints and lookup indexes the queries rely
    /// on, and put the shared `Church` label on units that predate it.
    /// Every statement is idempotent.
    pub async fn ensure_schema(&self) -> Result<(), GraphError> {
        for statement in SCHEMA_STATEMENTS {
            self.run(neo4rs::query(statement)).await?;
        }
        for level in ChurchLevel::ALL {
            for label in [level.label(), level.closed_label()] {
                let cypher = format!("MATCH (c:{label}) WHERE NOT c:{CHURCH_LABEL} SET c:{CHURCH_LABEL}");
                self.run(neo4rs::query(&cypher)).await?;
            }
        }
        tracing::info!(statements = SCHEMA_STATEMENTS.len(), "Graph schema ensured");
        Ok(())
    }

    /// Execute a write-only query (CREATE, MERGE, DELETE, SET).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }

    /// Execute a query returning a single `cnt` column.
    pub async fn query_count(&self, query: Query) -> Result<i64, GraphError> {
        match self.query_one(query).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Begin a transaction.
    pub async fn start_txn(&self) -> Result<neo4rs::Txn, GraphError> {
        Ok(self.graph.start_txn().await?)
    }

    /// Run a sequence of write queries in one transaction.
    ///
    /// Either every statement is committed or none is.
    pub async fn run_in_txn(&self, queries: Vec<Query>) -> Result<(), GraphError> {
        let count = queries.len();
        let mut txn = self.start_txn().await?;
        for q in queries {
            if let Err(e) = txn.run(q).await {
                tracing::warn!(error = %e, "Rolling back transaction");
                txn.rollback().await?;
                return Err(e.into());
            }
        }
        txn.commit().await?;
        tracing::debug!(statements = count, "Committed transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GraphConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.max_connections, 16);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: GraphConfig =
            serde_json::from_str(r#"{"uri": "neo4j+s://db.example.com", "password": "x"}"#)
                .unwrap();
        assert_eq!(config.uri, "neo4j+s://db.example.com");
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.fetch_size, 256);
    }
}
