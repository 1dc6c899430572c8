pub mod graph;
pub mod hybrid;

pub use graph::GraphClient;
pub use hybrid::HybridClient;

use crate::compile::QueryPlan;
use crate::config::{BackendKind, RetrievalConfig};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One retrieved recipe, before safety filtering and ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Relevance score, assigned by the ranker
    #[serde(default)]
    pub score: f32,
}

/// The configured retrieval collaborator
pub enum RetrievalBackend {
    Graph(GraphClient),
    Hybrid(HybridClient),
}

impl RetrievalBackend {
    pub fn from_config(config: &RetrievalConfig) -> Result<Self> {
        match config.backend {
            BackendKind::Graph => Ok(Self::Graph(GraphClient::new(
                &config.graph_url,
                config.timeout_seconds,
            )?)),
            BackendKind::Hybrid => Ok(Self::Hybrid(HybridClient::new(
                &config.hybrid_url,
                config.timeout_seconds,
            )?)),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Graph(_) => BackendKind::Graph,
            Self::Hybrid(_) => BackendKind::Hybrid,
        }
    }

    /// Execute a compiled plan against the backend
    pub async fn retrieve(&self, plan: &QueryPlan) -> Result<Vec<Candidate>> {
        match (self, plan) {
            (Self::Graph(client), QueryPlan::Graph(query)) => client.execute(query).await,
            (Self::Hybrid(client), QueryPlan::Hybrid(request)) => client.execute(request).await,
            _ => Err(Error::Internal(
                "Query plan does not match configured backend".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{compile, QueryPlan};
    use crate::constraints::ConstraintSet;

    #[tokio::test]
    async fn test_plan_backend_mismatch_is_an_error() {
        let client = GraphClient::new("http://localhost:7200/repositories/recipes", 5).unwrap();
        let backend = RetrievalBackend::Graph(client);
        let plan = compile(&ConstraintSet::default(), BackendKind::Hybrid, 10);
        assert!(matches!(plan, QueryPlan::Hybrid(_)));
        assert!(backend.retrieve(&plan).await.is_err());
    }
}
