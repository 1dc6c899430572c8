use crate::backend::Candidate;
use crate::compile::HybridRequest;
use crate::error::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Client for the hybrid search backend (lexical + vector with faceted
/// filtering). The engine has no list-exclusion operator; exclusion
/// enforcement happens after retrieval.
pub struct HybridClient {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct HybridResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl HybridClient {
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Result<Self> {
        url::Url::parse(endpoint)?;
        let client = Client::builder()
            .user_agent(format!("tiffin/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Execute a compiled hybrid request and map hits to candidates
    pub async fn execute(&self, request: &HybridRequest) -> Result<Vec<Candidate>> {
        debug!("Hybrid search to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Search engine unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Backend(format!(
                "Search engine returned HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Backend(format!("Failed to read search response: {e}")))?;

        candidates_from_hits(&body)
    }
}

/// Parse a hybrid search response body into candidates (retrieval order
/// preserved)
pub fn candidates_from_hits(body: &str) -> Result<Vec<Candidate>> {
    let response: HybridResponse = serde_json::from_str(body)
        .map_err(|e| Error::Backend(format!("Malformed search response: {e}")))?;

    Ok(response
        .hits
        .into_iter()
        .map(|hit| Candidate {
            id: hit.id,
            title: hit.title,
            ingredients: hit.ingredients,
            description: hit.description,
            metadata: serde_json::Value::Object(hit.extra),
            score: 0.0,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hits() {
        let body = r#"{"hits":[
            {"id":"r1","title":"Walnut Salad","ingredients":["walnut","lettuce"],"description":"crunchy","source":"web"},
            {"id":"r2","title":"Dal","ingredients":["dal"]}
        ]}"#;
        let candidates = candidates_from_hits(body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Walnut Salad");
        assert_eq!(candidates[0].metadata["source"], "web");
        assert_eq!(candidates[1].description, "");
    }

    #[test]
    fn test_empty_hits() {
        assert!(candidates_from_hits(r#"{"hits":[]}"#).unwrap().is_empty());
        assert!(candidates_from_hits("{}").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_body_is_backend_error() {
        assert!(candidates_from_hits("not json").is_err());
    }
}
