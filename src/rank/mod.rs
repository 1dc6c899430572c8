use crate::alias::{word_pattern, AliasTable, FamilyMatcher};
use crate::backend::Candidate;
use crate::constraints::ConstraintSet;
use crate::utils::duration::parse_minutes;
use crate::utils::text::{normalize, token_overlap_ratio, tokenize};
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Outcome of the safety filter and ranking stage
#[derive(Debug)]
pub struct FilterOutcome {
    pub results: Vec<Candidate>,
    /// False only on the explicit degrade path: exclusion filtering would
    /// have emptied the result set, so the pre-filter set was returned
    /// instead
    pub exclusions_enforced: bool,
}

/// Verifies exclusion safety and scores retrieved candidates.
///
/// The exclusion invariant is the strongest guarantee in the system: a
/// returned result must not match any alias of any excluded term in its
/// title, ingredient list or description. The only exception is the
/// flagged degrade path when enforcement would leave nothing to show.
pub struct SafetyFilter {
    aliases: AliasTable,
    compounds: HashMap<String, String>,
}

impl SafetyFilter {
    pub fn new(aliases: AliasTable, compounds: HashMap<String, String>) -> Self {
        Self { aliases, compounds }
    }

    /// One precompiled matcher per term; patterns are built once per
    /// request, not once per candidate field
    fn matchers_for(&self, terms: &[String]) -> Vec<FamilyMatcher> {
        terms
            .iter()
            .map(|term| FamilyMatcher::new(&self.aliases, &self.compounds, term))
            .collect()
    }

    fn matches_any_field(candidate: &Candidate, matcher: &FamilyMatcher) -> bool {
        matcher.matches(&candidate.title)
            || candidate.ingredients.iter().any(|ing| matcher.matches(ing))
            || matcher.matches(&candidate.description)
    }

    /// Does the candidate match any alias of any excluded term?
    fn violates_exclusion(candidate: &Candidate, exclude: &[FamilyMatcher]) -> bool {
        exclude.iter().any(|m| Self::matches_any_field(candidate, m))
    }

    /// Does the candidate carry every required term (any alias, any field)?
    fn satisfies_requirements(candidate: &Candidate, include: &[FamilyMatcher]) -> bool {
        include.iter().all(|m| Self::matches_any_field(candidate, m))
    }

    /// Re-check the time bound on the retrieved candidate.
    ///
    /// The compiled queries let unbound or unparsable duration literals
    /// through so a messy value never hides a recipe; literals that DO
    /// parse are held to the bound here.
    fn within_time_bound(candidate: &Candidate, bound: Option<u32>) -> bool {
        let Some(bound) = bound else {
            return true;
        };
        let minutes = match candidate.metadata.get("total_time") {
            Some(serde_json::Value::String(s)) => parse_minutes(s),
            Some(serde_json::Value::Number(n)) => n.as_u64().map(|n| n as u32),
            _ => None,
        };
        minutes.map_or(true, |m| m <= bound)
    }

    fn score(candidate: &Candidate, constraints: &ConstraintSet, keywords: &[Regex]) -> f32 {
        let include_tokens: Vec<String> = constraints
            .include
            .iter()
            .flat_map(|t| tokenize(t))
            .collect();
        let ingredient_tokens: Vec<String> = candidate
            .ingredients
            .iter()
            .flat_map(|i| tokenize(i))
            .collect();
        let title_tokens = tokenize(&candidate.title);

        let ingredient_overlap = token_overlap_ratio(&include_tokens, &ingredient_tokens);
        let title_overlap = token_overlap_ratio(&include_tokens, &title_tokens);

        let description = normalize(&candidate.description);
        let matched_keywords = keywords.iter().filter(|re| re.is_match(&description)).count() as f32;
        let keyword_bonus = (0.1 * matched_keywords).min(0.3);

        let score = 0.5 * ingredient_overlap + 0.3 * title_overlap + keyword_bonus;
        (score.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
    }

    /// Apply requirement checks, exclusion safety, scoring and ordering.
    ///
    /// Under-inclusive candidates are dropped outright (not a safety
    /// concern). If exclusion enforcement would then empty a non-empty
    /// set, the pre-exclusion set is returned unmodified with
    /// `exclusions_enforced = false` — the degrade is always explicit,
    /// never silent.
    pub fn filter_and_rank(
        &self,
        candidates: Vec<Candidate>,
        constraints: &ConstraintSet,
        limit: usize,
    ) -> FilterOutcome {
        let include_matchers = self.matchers_for(&constraints.include);
        let exclude_matchers = self.matchers_for(&constraints.exclude);
        let keyword_patterns: Vec<Regex> = constraints
            .keywords
            .iter()
            .filter_map(|k| word_pattern(k))
            .collect();

        let time_bound = constraints
            .max_cook_minutes
            .or(constraints.max_total_minutes);
        let eligible: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| Self::satisfies_requirements(c, &include_matchers))
            .filter(|c| Self::within_time_bound(c, time_bound))
            .collect();

        let (mut kept, exclusions_enforced) = if constraints.exclude.is_empty() {
            (eligible, true)
        } else {
            let safe: Vec<Candidate> = eligible
                .iter()
                .filter(|c| !Self::violates_exclusion(c, &exclude_matchers))
                .cloned()
                .collect();

            if safe.is_empty() && !eligible.is_empty() {
                warn!(
                    "Exclusion filtering would empty {} candidate(s); returning unverified set",
                    eligible.len()
                );
                (eligible, false)
            } else {
                (safe, true)
            }
        };

        for candidate in &mut kept {
            candidate.score = Self::score(candidate, constraints, &keyword_patterns);
        }
        // Stable sort keeps retrieval order on ties
        kept.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        kept.truncate(limit);

        debug!(
            "Ranked {} result(s), exclusions_enforced={}",
            kept.len(),
            exclusions_enforced
        );

        FilterOutcome {
            results: kept,
            exclusions_enforced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasGroup;
    use serde_json::json;

    fn candidate(id: &str, title: &str, ingredients: &[&str]) -> Candidate {
        Candidate {
            id: id.to_string(),
            title: title.to_string(),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            description: String::new(),
            metadata: json!(null),
            score: 0.0,
        }
    }

    fn filter() -> SafetyFilter {
        let aliases = AliasTable::from_groups(vec![AliasGroup {
            canonical: "onion".to_string(),
            synonyms: vec!["pyaz".to_string()],
            replacements: vec![],
        }]);
        SafetyFilter::new(aliases, HashMap::new())
    }

    fn exclude(terms: &[&str]) -> ConstraintSet {
        ConstraintSet {
            exclude: terms.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_excluded_ingredient_filters_candidate() {
        let candidates = vec![
            candidate("1", "Onion Pakora", &["onion", "gram flour"]),
            candidate("2", "Plain Dal", &["dal", "ghee"]),
        ];
        let outcome = filter().filter_and_rank(candidates, &exclude(&["onion"]), 10);
        assert!(outcome.exclusions_enforced);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].id, "2");
    }

    #[test]
    fn test_exclusion_matches_title_and_aliases() {
        // Violation through the title, and through a synonym in the
        // ingredient list
        let candidates = vec![
            candidate("1", "Onion Soup", &["broth"]),
            candidate("2", "Bhaji", &["pyaz", "besan"]),
            candidate("3", "Dal", &["dal"]),
        ];
        let outcome = filter().filter_and_rank(candidates, &exclude(&["onion"]), 10);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].id, "3");
    }

    #[test]
    fn test_unrelated_exclusion_keeps_candidate() {
        let candidates = vec![candidate("1", "Walnut Salad", &["walnut", "lettuce"])];
        let outcome = filter().filter_and_rank(candidates, &exclude(&["banana"]), 10);
        assert!(outcome.exclusions_enforced);
        assert_eq!(outcome.results.len(), 1);
    }

    #[test]
    fn test_degrade_returns_prefilter_set_flagged() {
        let candidates: Vec<Candidate> = (0..5)
            .map(|i| candidate(&i.to_string(), "Banana Bread", &["banana", "flour"]))
            .collect();
        let outcome = filter().filter_and_rank(candidates, &exclude(&["banana"]), 10);
        assert!(!outcome.exclusions_enforced);
        assert_eq!(outcome.results.len(), 5);
    }

    #[test]
    fn test_degrade_respects_limit() {
        let candidates: Vec<Candidate> = (0..5)
            .map(|i| candidate(&i.to_string(), "Banana Bread", &["banana"]))
            .collect();
        let outcome = filter().filter_and_rank(candidates, &exclude(&["banana"]), 3);
        assert!(!outcome.exclusions_enforced);
        assert_eq!(outcome.results.len(), 3);
    }

    #[test]
    fn test_missing_required_term_drops_candidate() {
        let constraints = ConstraintSet {
            include: vec!["paneer".to_string()],
            ..Default::default()
        };
        let candidates = vec![
            candidate("1", "Paneer Tikka", &["paneer", "yogurt"]),
            candidate("2", "Plain Rice", &["rice"]),
        ];
        let outcome = filter().filter_and_rank(candidates, &constraints, 10);
        // Under-inclusion has no degrade path
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].id, "1");
    }

    #[test]
    fn test_scoring_weights() {
        let constraints = ConstraintSet {
            include: vec!["paneer".to_string()],
            ..Default::default()
        };
        let candidates = vec![candidate("1", "Paneer Tikka", &["paneer", "yogurt"])];
        let outcome = filter().filter_and_rank(candidates, &constraints, 10);
        // Full ingredient overlap (0.5) plus full title overlap (0.3)
        assert!((outcome.results[0].score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_keyword_bonus_capped() {
        let constraints = ConstraintSet {
            keywords: vec![
                "grilled".to_string(),
                "baked".to_string(),
                "fried".to_string(),
                "steamed".to_string(),
            ],
            ..Default::default()
        };
        let mut c = candidate("1", "Mixed Platter", &["vegetables"]);
        c.description = "grilled then baked then fried then steamed".to_string();
        let outcome = filter().filter_and_rank(vec![c], &constraints, 10);
        // Four keyword matches at 0.1 each, capped at 0.3
        assert!((outcome.results[0].score - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_stable_sort_keeps_retrieval_order_on_ties() {
        let constraints = ConstraintSet::default();
        let candidates = vec![
            candidate("first", "A", &["x"]),
            candidate("second", "B", &["y"]),
            candidate("third", "C", &["z"]),
        ];
        let outcome = filter().filter_and_rank(candidates, &constraints, 10);
        let ids: Vec<&str> = outcome.results.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_higher_score_sorts_first() {
        let constraints = ConstraintSet {
            include: vec!["paneer".to_string()],
            ..Default::default()
        };
        let candidates = vec![
            candidate("weak", "Rice Bowl", &["rice", "paneer"]),
            candidate("strong", "Paneer Tikka", &["paneer"]),
        ];
        let outcome = filter().filter_and_rank(candidates, &constraints, 10);
        assert_eq!(outcome.results[0].id, "strong");
    }

    #[test]
    fn test_parsable_time_literal_held_to_bound() {
        let constraints = ConstraintSet {
            max_cook_minutes: Some(30),
            ..Default::default()
        };
        let mut slow = candidate("slow", "Dum Biryani", &["rice"]);
        slow.metadata = json!({ "total_time": "PT90M" });
        let mut fast = candidate("fast", "Poha", &["poha"]);
        fast.metadata = json!({ "total_time": "20 minutes" });
        let mut vague = candidate("vague", "Dal", &["dal"]);
        vague.metadata = json!({ "total_time": "a while" });

        let outcome = filter().filter_and_rank(vec![slow, fast, vague], &constraints, 10);
        let ids: Vec<&str> = outcome.results.iter().map(|c| c.id.as_str()).collect();
        // The unparsable literal passes; only the provably slow recipe drops
        assert_eq!(ids, vec!["fast", "vague"]);
    }

    #[test]
    fn test_empty_candidates_is_not_a_degrade() {
        let outcome = filter().filter_and_rank(Vec::new(), &exclude(&["onion"]), 10);
        assert!(outcome.exclusions_enforced);
        assert!(outcome.results.is_empty());
    }
}
