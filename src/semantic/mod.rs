pub mod cache;
pub mod provider;

use crate::config::providers::ProviderConfig;
use crate::constraints::ConstraintSet;
use crate::error::{Error, Result};
use cache::ResponseCache;
use provider::{strip_code_fences, CallError, ChatMessage, Provider};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

const EXTRACTION_TASK: &str = "extract";

const EXTRACTION_PROMPT: &str = "You extract structured recipe-search constraints from a user \
query. Respond with a single JSON object and nothing else, using these fields: \
include (array of required ingredients), exclude (array of ingredients that must not appear), \
cuisine (array), diet (array), course (array), max_cook_minutes (integer or null), \
max_total_minutes (integer or null), keywords (array of cooking techniques), \
intent (string), language (string), confidence (number between 0 and 1). \
The include and exclude arrays are mandatory, even when empty.";

/// Structured payload expected back from a provider.
///
/// `include` and `exclude` are mandatory; their absence marks the call as
/// failed and the chain moves on.
#[derive(Debug, Deserialize)]
struct SemanticPayload {
    include: Vec<String>,
    exclude: Vec<String>,
    #[serde(default)]
    cuisine: Vec<String>,
    #[serde(default)]
    diet: Vec<String>,
    #[serde(default)]
    course: Vec<String>,
    #[serde(default)]
    max_cook_minutes: Option<u32>,
    #[serde(default)]
    max_total_minutes: Option<u32>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

impl From<SemanticPayload> for ConstraintSet {
    fn from(payload: SemanticPayload) -> Self {
        ConstraintSet {
            include: payload.include,
            exclude: payload.exclude,
            cuisine: payload.cuisine,
            diet: payload.diet,
            course: payload.course,
            max_cook_minutes: payload.max_cook_minutes,
            max_total_minutes: payload.max_total_minutes,
            keywords: payload.keywords,
            intent: payload.intent.unwrap_or_else(|| "search".to_string()),
            language: payload.language.unwrap_or_else(|| "Unknown".to_string()),
            confidence: payload.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
        }
    }
}

/// Running per-provider counters, exposed via [`SemanticExtractor::stats`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderStats {
    pub requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost: f64,
}

/// Semantic extraction over an ordered provider chain.
///
/// Providers are tried in priority order. A non-2xx response or a timeout
/// marks the provider sticky-failed until process restart; transport-level
/// hiccups and malformed payloads are retried on the next request. When a
/// fallback provider succeeds it is promoted to primary for later calls —
/// a best-effort hint, not a strict contract: concurrent requests may race
/// and promote different providers, costing at most one extra fallback
/// attempt.
///
/// Exhausting the whole chain yields `None`, never an error; the caller
/// always has the deterministic extraction as ground truth.
pub struct SemanticExtractor {
    providers: Vec<Provider>,
    client: Client,
    cache: ResponseCache,
    primary: AtomicUsize,
    failed: Mutex<HashSet<String>>,
    stats: Mutex<HashMap<String, ProviderStats>>,
}

impl SemanticExtractor {
    pub fn new(configs: Vec<ProviderConfig>, cache_ttl_seconds: i64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("tiffin/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        let providers: Vec<Provider> = configs.into_iter().map(Provider::new).collect();
        if !providers.is_empty() {
            info!(
                "Semantic extraction enabled with {} provider(s), primary: {}",
                providers.len(),
                providers[0].name()
            );
        }

        Ok(Self {
            providers,
            client,
            cache: ResponseCache::new(cache_ttl_seconds),
            primary: AtomicUsize::new(0),
            failed: Mutex::new(HashSet::new()),
            stats: Mutex::new(HashMap::new()),
        })
    }

    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Provider indices in call order: current primary first, then the rest
    /// in priority order
    fn call_order(&self) -> Vec<usize> {
        let primary = self.primary.load(Ordering::Relaxed).min(self.providers.len());
        let mut order = Vec::with_capacity(self.providers.len());
        if primary < self.providers.len() {
            order.push(primary);
        }
        order.extend((0..self.providers.len()).filter(|&i| i != primary));
        order
    }

    fn is_failed(&self, name: &str) -> bool {
        self.failed.lock().expect("failed-set lock poisoned").contains(name)
    }

    fn mark_failed(&self, name: &str, reason: &str) {
        warn!("Provider {} marked failed for process lifetime: {}", name, reason);
        self.failed
            .lock()
            .expect("failed-set lock poisoned")
            .insert(name.to_string());
    }

    fn record_request(&self, name: &str) {
        let mut stats = self.stats.lock().expect("stats lock poisoned");
        stats.entry(name.to_string()).or_default().requests += 1;
    }

    fn record_usage(&self, provider: &Provider, prompt_tokens: u64, completion_tokens: u64) {
        let mut stats = self.stats.lock().expect("stats lock poisoned");
        let entry = stats.entry(provider.name().to_string()).or_default();
        entry.prompt_tokens += prompt_tokens;
        entry.completion_tokens += completion_tokens;
        entry.cost += provider.cost(prompt_tokens, completion_tokens);
    }

    fn parse_payload(content: &str) -> Option<ConstraintSet> {
        let body = strip_code_fences(content);
        match serde_json::from_str::<SemanticPayload>(body) {
            Ok(payload) => Some(payload.into()),
            Err(e) => {
                debug!("Discarding malformed semantic payload: {}", e);
                None
            }
        }
    }

    /// One attempt against one provider: cache check, call with deadline,
    /// parse. Returns `None` on any failure.
    async fn try_provider(&self, idx: usize, text: &str) -> Option<ConstraintSet> {
        let provider = &self.providers[idx];
        let name = provider.name().to_string();

        if self.is_failed(&name) {
            return None;
        }

        let cache_key = ResponseCache::key(EXTRACTION_TASK, &name, text);
        if let Some(cached) = self.cache.get(&cache_key) {
            return serde_json::from_str(&cached).ok();
        }

        let messages = [
            ChatMessage::system(EXTRACTION_PROMPT),
            ChatMessage::user(text),
        ];

        self.record_request(&name);
        let deadline = Duration::from_secs(provider.config.timeout_secs);
        let completion = match tokio::time::timeout(
            deadline,
            provider.complete(&self.client, &messages),
        )
        .await
        {
            // An abandoned call has no partial result to merge
            Err(_) => {
                self.mark_failed(&name, "call exceeded deadline");
                return None;
            }
            Ok(Err(CallError::Sticky(reason))) => {
                self.mark_failed(&name, &reason);
                return None;
            }
            Ok(Err(CallError::Transient(reason))) => {
                debug!("Provider {} transient failure: {}", name, reason);
                return None;
            }
            Ok(Ok(completion)) => completion,
        };

        self.record_usage(provider, completion.prompt_tokens, completion.completion_tokens);

        let constraints = Self::parse_payload(&completion.content)?;
        if let Ok(serialized) = serde_json::to_string(&constraints) {
            self.cache.put(cache_key, serialized);
        }
        Some(constraints)
    }

    /// Extract constraints via the provider chain.
    ///
    /// Never fails: chain exhaustion returns `None`.
    pub async fn extract(&self, text: &str) -> Option<ConstraintSet> {
        let order = self.call_order();
        let first = order.first().copied();

        for idx in order {
            if let Some(constraints) = self.try_provider(idx, text).await {
                if Some(idx) != first {
                    info!(
                        "Promoting provider {} to primary after fallback success",
                        self.providers[idx].name()
                    );
                    self.primary.store(idx, Ordering::Relaxed);
                }
                return Some(constraints);
            }
        }

        debug!("Semantic provider chain exhausted, deterministic path only");
        None
    }

    /// Comparison mode: dispatch to the top two providers concurrently.
    ///
    /// The primary's result is preferred when present; a disagreement is
    /// logged for observability but never blocks the response.
    pub async fn extract_compare(&self, text: &str) -> Option<ConstraintSet> {
        let available: Vec<usize> = self
            .call_order()
            .into_iter()
            .filter(|&i| !self.is_failed(self.providers[i].name()))
            .take(2)
            .collect();

        match available.as_slice() {
            [] => None,
            [only] => self.try_provider(*only, text).await,
            [first, second, ..] => {
                let (a, b) = tokio::join!(
                    self.try_provider(*first, text),
                    self.try_provider(*second, text)
                );
                if let (Some(primary), Some(secondary)) = (&a, &b) {
                    if !same_constraints(primary, secondary) {
                        warn!(
                            "Semantic comparison mismatch between {} and {}",
                            self.providers[*first].name(),
                            self.providers[*second].name()
                        );
                    }
                }
                a.or(b)
            }
        }
    }

    /// Snapshot of per-provider request/cost counters
    pub fn stats(&self) -> HashMap<String, ProviderStats> {
        self.stats.lock().expect("stats lock poisoned").clone()
    }

    pub fn total_cost(&self) -> f64 {
        self.stats().values().map(|s| s.cost).sum()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

fn same_constraints(a: &ConstraintSet, b: &ConstraintSet) -> bool {
    let sorted = |v: &[String]| {
        let mut out: Vec<String> = v.iter().map(|s| s.to_lowercase()).collect();
        out.sort();
        out
    };
    sorted(&a.include) == sorted(&b.include) && sorted(&a.exclude) == sorted(&b.exclude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload_requires_include_and_exclude() {
        assert!(SemanticExtractor::parse_payload(r#"{"include":[],"exclude":["onion"]}"#).is_some());
        // Missing mandatory exclude field
        assert!(SemanticExtractor::parse_payload(r#"{"include":[]}"#).is_none());
        assert!(SemanticExtractor::parse_payload("not json at all").is_none());
    }

    #[test]
    fn test_parse_payload_strips_fences() {
        let fenced = "```json\n{\"include\":[\"paneer\"],\"exclude\":[]}\n```";
        let set = SemanticExtractor::parse_payload(fenced).unwrap();
        assert_eq!(set.include, vec!["paneer"]);
    }

    #[test]
    fn test_payload_defaults() {
        let set =
            SemanticExtractor::parse_payload(r#"{"include":[],"exclude":[]}"#).unwrap();
        assert_eq!(set.intent, "search");
        assert_eq!(set.language, "Unknown");
        assert_eq!(set.confidence, 0.0);
    }

    #[test]
    fn test_same_constraints_ignores_order_and_case() {
        let a = ConstraintSet {
            exclude: vec!["Onion".to_string(), "garlic".to_string()],
            ..Default::default()
        };
        let b = ConstraintSet {
            exclude: vec!["garlic".to_string(), "onion".to_string()],
            ..Default::default()
        };
        assert!(same_constraints(&a, &b));
    }

    #[tokio::test]
    async fn test_extract_with_no_providers_is_none() {
        let extractor = SemanticExtractor::new(Vec::new(), 3600).unwrap();
        assert!(!extractor.has_providers());
        assert!(extractor.extract("paneer tikka").await.is_none());
        assert!(extractor.stats().is_empty());
    }
}
