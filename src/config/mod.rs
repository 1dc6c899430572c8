pub mod providers;
pub mod vocab;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub retrieval: RetrievalConfig,
    pub semantic: SemanticConfig,
    pub paths: PathsConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Graph,
    Hybrid,
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "graph" => Ok(BackendKind::Graph),
            "hybrid" => Ok(BackendKind::Hybrid),
            other => Err(Error::Config(format!(
                "Invalid backend kind: {other} (expected graph or hybrid)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub backend: BackendKind,
    pub graph_url: String,
    pub hybrid_url: String,
    pub timeout_seconds: u64,
    pub max_candidates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    pub cache_ttl_seconds: i64,
    pub compare_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub lexicon: PathBuf,
    pub vocab: PathBuf,
    pub providers: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let backend = std::env::var("RETRIEVAL_BACKEND")
            .unwrap_or_else(|_| "graph".to_string())
            .parse()?;

        let graph_url = std::env::var("GRAPH_BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:7200/repositories/recipes".to_string());

        let hybrid_url = std::env::var("HYBRID_BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:8080/v1/search".to_string());

        let timeout_seconds = std::env::var("BACKEND_TIMEOUT")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid BACKEND_TIMEOUT value".to_string()))?;

        let max_candidates = std::env::var("MAX_CANDIDATES")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid MAX_CANDIDATES value".to_string()))?;

        let cache_ttl_seconds = std::env::var("SEMANTIC_CACHE_TTL")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid SEMANTIC_CACHE_TTL value".to_string()))?;

        let compare_mode = std::env::var("SEMANTIC_COMPARE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let lexicon = std::env::var("LEXICON_PATH")
            .unwrap_or_else(|_| "config/lexicon.jsonl".to_string())
            .into();

        let vocab = std::env::var("VOCAB_CONFIG_PATH")
            .unwrap_or_else(|_| "config/vocab.yaml".to_string())
            .into();

        let providers = std::env::var("PROVIDERS_CONFIG_PATH")
            .unwrap_or_else(|_| "config/providers.yaml".to_string())
            .into();

        let default_limit = std::env::var("DEFAULT_LIMIT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid DEFAULT_LIMIT value".to_string()))?;

        let max_limit = std::env::var("MAX_LIMIT")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid MAX_LIMIT value".to_string()))?;

        Ok(Settings {
            retrieval: RetrievalConfig {
                backend,
                graph_url,
                hybrid_url,
                timeout_seconds,
                max_candidates,
            },
            semantic: SemanticConfig {
                cache_ttl_seconds,
                compare_mode,
            },
            paths: PathsConfig {
                lexicon,
                vocab,
                providers,
            },
            limits: LimitsConfig {
                default_limit,
                max_limit,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.timeout_seconds == 0 {
            return Err(Error::Config("Backend timeout must be non-zero".to_string()));
        }
        if self.limits.max_limit == 0 {
            return Err(Error::Config("Max limit must be non-zero".to_string()));
        }
        if self.limits.default_limit > self.limits.max_limit {
            return Err(Error::Config(
                "Default limit cannot exceed max limit".to_string(),
            ));
        }
        url::Url::parse(&self.retrieval.graph_url)
            .map_err(|_| Error::Config("Invalid GRAPH_BACKEND_URL".to_string()))?;
        url::Url::parse(&self.retrieval.hybrid_url)
            .map_err(|_| Error::Config("Invalid HYBRID_BACKEND_URL".to_string()))?;
        Ok(())
    }
}
