use crate::alias::AliasTable;
use crate::backend::RetrievalBackend;
use crate::compile::{compile, QueryPlan};
use crate::config::providers::ProvidersConfig;
use crate::config::vocab::VocabConfig;
use crate::config::Settings;
use crate::constraints::{merge, ConstraintOverrides, ConstraintSet};
use crate::error::Result;
use crate::extract::RuleExtractor;
use crate::rank::SafetyFilter;
use crate::semantic::{ProviderStats, SemanticExtractor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One search request at the system boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Source-language tag; "auto" leaves detection to the semantic path
    #[serde(default = "default_language_tag")]
    pub language: String,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Explicit constraints overriding extracted fields one-by-one
    #[serde(default)]
    pub overrides: Option<ConstraintOverrides>,
}

fn default_language_tag() -> String {
    "auto".to_string()
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            language: default_language_tag(),
            limit: None,
            overrides: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub id: String,
    pub title: String,
    /// Ingredient list mapped to canonical forms
    pub ingredients: Vec<String>,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<RankedResult>,
    pub constraints: ConstraintSet,
    /// False only on the explicit safety-degrade path
    pub exclusions_enforced: bool,
    /// False when the retrieval backend was unreachable
    pub backend_available: bool,
}

/// Breakdown of the extraction stages, for inspection tooling
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionBreakdown {
    pub deterministic: ConstraintSet,
    pub semantic: Option<ConstraintSet>,
    pub merged: ConstraintSet,
}

/// End-to-end search pipeline.
///
/// Owns the read-only tables (aliases, vocabularies), the extractors, the
/// retrieval backend and the safety filter. One instance serves concurrent
/// requests; the only shared mutable state lives inside the semantic
/// extractor and is eventually consistent by design.
pub struct SearchService {
    aliases: AliasTable,
    rules: RuleExtractor,
    semantic: SemanticExtractor,
    backend: RetrievalBackend,
    filter: SafetyFilter,
    settings: Settings,
}

impl SearchService {
    /// Build the full pipeline from settings, loading config tables from
    /// their configured paths (missing files fall back to built-ins)
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let vocab = VocabConfig::load_or_default(&settings.paths.vocab)?;

        let aliases = if settings.paths.lexicon.exists() {
            AliasTable::from_file(&settings.paths.lexicon)?
        } else {
            warn!(
                "Lexicon {} not found; alias resolution disabled",
                settings.paths.lexicon.display()
            );
            AliasTable::empty()
        };

        let providers = ProvidersConfig::load_or_default(&settings.paths.providers)?;
        let semantic =
            SemanticExtractor::new(providers.sorted(), settings.semantic.cache_ttl_seconds)?;

        let backend = RetrievalBackend::from_config(&settings.retrieval)?;

        let rules = RuleExtractor::new(vocab.clone(), aliases.clone())?;
        let filter = SafetyFilter::new(aliases.clone(), vocab.compound_map());

        Ok(Self {
            aliases,
            rules,
            semantic,
            backend,
            filter,
            settings,
        })
    }

    /// Assemble a service from pre-built parts (used by tests)
    pub fn new(
        vocab: VocabConfig,
        aliases: AliasTable,
        semantic: SemanticExtractor,
        backend: RetrievalBackend,
        settings: Settings,
    ) -> Result<Self> {
        let rules = RuleExtractor::new(vocab.clone(), aliases.clone())?;
        let filter = SafetyFilter::new(aliases.clone(), vocab.compound_map());
        Ok(Self {
            aliases,
            rules,
            semantic,
            backend,
            filter,
            settings,
        })
    }

    /// Run both extraction paths and merge, without touching retrieval
    pub async fn extract(&self, request: &SearchRequest) -> ExtractionBreakdown {
        let deterministic = self.rules.extract(&request.query);

        let semantic = if self.semantic.has_providers() {
            if self.settings.semantic.compare_mode {
                self.semantic.extract_compare(&request.query).await
            } else {
                self.semantic.extract(&request.query).await
            }
        } else {
            None
        };

        let mut merged = merge(&deterministic, semantic.as_ref(), &self.aliases);
        if request.language != "auto" && !request.language.is_empty() {
            merged.language = request.language.clone();
        }
        if let Some(overrides) = &request.overrides {
            merged = overrides.apply(merged);
        }

        ExtractionBreakdown {
            deterministic,
            semantic,
            merged,
        }
    }

    /// Compile a request's merged constraints for the configured backend
    pub async fn compile(&self, request: &SearchRequest) -> QueryPlan {
        let breakdown = self.extract(request).await;
        compile(
            &breakdown.merged,
            self.backend.kind(),
            self.settings.retrieval.max_candidates,
        )
    }

    /// Full pipeline: extract, merge, compile, retrieve, filter, rank.
    ///
    /// Backend unavailability degrades to an empty flagged response and is
    /// logged once per request; it never surfaces as an error.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let breakdown = self.extract(request).await;
        let merged = breakdown.merged;
        debug!("Merged constraints: {:?}", merged);

        let limit = request
            .limit
            .unwrap_or(self.settings.limits.default_limit)
            .min(self.settings.limits.max_limit);

        let plan = compile(
            &merged,
            self.backend.kind(),
            self.settings.retrieval.max_candidates,
        );

        let candidates = match self.backend.retrieve(&plan).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Retrieval backend unavailable: {}", e.log_safe());
                return Ok(SearchResponse {
                    results: Vec::new(),
                    constraints: merged,
                    exclusions_enforced: true,
                    backend_available: false,
                });
            }
        };

        let outcome = self.filter.filter_and_rank(candidates, &merged, limit);

        let results = outcome
            .results
            .into_iter()
            .map(|c| RankedResult {
                id: c.id,
                title: c.title,
                ingredients: c
                    .ingredients
                    .iter()
                    .map(|i| self.aliases.canonical(i))
                    .collect(),
                score: c.score,
            })
            .collect();

        Ok(SearchResponse {
            results,
            constraints: merged,
            exclusions_enforced: outcome.exclusions_enforced,
            backend_available: true,
        })
    }

    /// Alias family for a term (CLI helper)
    pub fn resolve(&self, term: &str) -> Vec<String> {
        self.aliases.resolve(term)
    }

    /// Per-provider request/cost counters from the semantic extractor
    pub fn provider_stats(&self) -> HashMap<String, ProviderStats> {
        self.semantic.stats()
    }

    pub fn total_cost(&self) -> f64 {
        self.semantic.total_cost()
    }
}
