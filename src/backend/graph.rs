use crate::backend::Candidate;
use crate::compile::GraphQuery;
use crate::error::{Error, Result};
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Client for the graph query backend.
///
/// Speaks the SPARQL protocol: POST of the query string, JSON results with
/// tabular variable bindings.
pub struct GraphClient {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

impl GraphClient {
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

    /// Execute a compiled SPARQL query and map bindings to candidates
    pub async fn execute(&self, query: &GraphQuery) -> Result<Vec<Candidate>> {
        debug!("Graph query to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/sparql-query")
            .header(header::ACCEPT, "application/sparql-results+json")
            .body(query.sparql.clone())
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Graph store unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Backend(format!("Graph store returned HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Backend(format!("Failed to read graph response: {e}")))?;

        candidates_from_bindings(&body)
    }
}

/// Parse SPARQL JSON results into candidates, merging duplicate recipe
/// rows.
///
/// The compiled query already aggregates ingredient edges with
/// `GROUP_CONCAT`, but a backend that ignores grouping still yields one
/// row per edge; rows with the same recipe id are folded together here.
pub fn candidates_from_bindings(body: &str) -> Result<Vec<Candidate>> {
    let results: SparqlResults = serde_json::from_str(body)
        .map_err(|e| Error::Backend(format!("Malformed graph response: {e}")))?;

    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, Candidate> = HashMap::new();

    for row in results.results.bindings {
        let Some(id) = row.get("recipe").map(|v| v.value.clone()) else {
            continue;
        };
        let title = row.get("title").map(|v| v.value.clone()).unwrap_or_default();
        let description = row
            .get("description")
            .map(|v| v.value.clone())
            .unwrap_or_default();
        let total_time = row.get("totalTime").map(|v| v.value.clone());
        let ingredients: Vec<String> = row
            .get("ingredients")
            .map(|v| {
                v.value
                    .split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        match by_id.get_mut(&id) {
            Some(existing) => {
                for ingredient in ingredients {
                    if !existing.ingredients.contains(&ingredient) {
                        existing.ingredients.push(ingredient);
                    }
                }
            }
            None => {
                order.push(id.clone());
                by_id.insert(
                    id.clone(),
                    Candidate {
                        id,
                        title,
                        ingredients,
                        description,
                        metadata: json!({ "total_time": total_time }),
                        score: 0.0,
                    },
                );
            }
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding_row(id: &str, title: &str, ingredients: &str) -> String {
        format!(
            r#"{{"recipe":{{"type":"uri","value":"{id}"}},"title":{{"type":"literal","value":"{title}"}},"ingredients":{{"type":"literal","value":"{ingredients}"}}}}"#
        )
    }

    #[test]
    fn test_parse_bindings() {
        let body = format!(
            r#"{{"head":{{"vars":["recipe","title","ingredients"]}},"results":{{"bindings":[{}]}}}}"#,
            binding_row("urn:recipe:1", "Dal Fry", "dal|ghee|cumin")
        );
        let candidates = candidates_from_bindings(&body).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Dal Fry");
        assert_eq!(candidates[0].ingredients, vec!["dal", "ghee", "cumin"]);
    }

    #[test]
    fn test_duplicate_rows_fold_into_one_candidate() {
        let body = format!(
            r#"{{"results":{{"bindings":[{},{}]}}}}"#,
            binding_row("urn:recipe:1", "Dal Fry", "dal"),
            binding_row("urn:recipe:1", "Dal Fry", "ghee")
        );
        let candidates = candidates_from_bindings(&body).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].ingredients, vec!["dal", "ghee"]);
    }

    #[test]
    fn test_row_order_preserved() {
        let body = format!(
            r#"{{"results":{{"bindings":[{},{}]}}}}"#,
            binding_row("urn:recipe:2", "B", "x"),
            binding_row("urn:recipe:1", "A", "y")
        );
        let candidates = candidates_from_bindings(&body).unwrap();
        assert_eq!(candidates[0].id, "urn:recipe:2");
        assert_eq!(candidates[1].id, "urn:recipe:1");
    }

    #[test]
    fn test_malformed_body_is_backend_error() {
        assert!(candidates_from_bindings("<html>oops</html>").is_err());
    }
}
