use crate::alias::AliasTable;
use crate::utils::text::dedup_preserving_order;
use serde::{Deserialize, Serialize};

/// Structured representation of a query's requirements.
///
/// Produced by the deterministic extractor, optionally enriched by a
/// semantic provider, then frozen by [`merge`]. Exclusion terms carry the
/// strongest guarantee in the system: a result matching an excluded term's
/// alias family must never be returned silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub cuisine: Vec<String>,
    #[serde(default)]
    pub diet: Vec<String>,
    #[serde(default)]
    pub course: Vec<String>,
    #[serde(default)]
    pub max_cook_minutes: Option<u32>,
    #[serde(default)]
    pub max_total_minutes: Option<u32>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_intent")]
    pub intent: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub confidence: f32,
}

fn default_intent() -> String {
    "search".to_string()
}

fn default_language() -> String {
    "Unknown".to_string()
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            cuisine: Vec::new(),
            diet: Vec::new(),
            course: Vec::new(),
            max_cook_minutes: None,
            max_total_minutes: None,
            keywords: Vec::new(),
            intent: default_intent(),
            language: default_language(),
            confidence: 0.0,
        }
    }
}

impl ConstraintSet {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
            && self.exclude.is_empty()
            && self.cuisine.is_empty()
            && self.diet.is_empty()
            && self.course.is_empty()
            && self.keywords.is_empty()
            && self.max_cook_minutes.is_none()
            && self.max_total_minutes.is_none()
    }
}

/// Per-field overrides supplied explicitly by the caller.
///
/// Present fields replace the merged value one-by-one; absent fields leave
/// the extracted value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintOverrides {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub cuisine: Option<Vec<String>>,
    pub diet: Option<Vec<String>>,
    pub course: Option<Vec<String>>,
    pub max_cook_minutes: Option<u32>,
    pub max_total_minutes: Option<u32>,
    pub keywords: Option<Vec<String>>,
}

impl ConstraintOverrides {
    /// Apply overrides field-by-field on top of a merged set
    pub fn apply(&self, mut set: ConstraintSet) -> ConstraintSet {
        if let Some(include) = &self.include {
            set.include = include.clone();
        }
        if let Some(exclude) = &self.exclude {
            set.exclude = exclude.clone();
        }
        if let Some(cuisine) = &self.cuisine {
            set.cuisine = cuisine.clone();
        }
        if let Some(diet) = &self.diet {
            set.diet = diet.clone();
        }
        if let Some(course) = &self.course {
            set.course = course.clone();
        }
        if let Some(minutes) = self.max_cook_minutes {
            set.max_cook_minutes = Some(minutes);
        }
        if let Some(minutes) = self.max_total_minutes {
            set.max_total_minutes = Some(minutes);
        }
        if let Some(keywords) = &self.keywords {
            set.keywords = keywords.clone();
        }
        set
    }
}

/// Union two term lists, deduplicating on canonical form
///
/// Deterministic terms come first so ordering stays stable regardless of
/// what the semantic provider returned.
fn union_canonical(det: &[String], sem: &[String], aliases: &AliasTable) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for term in det.iter().chain(sem.iter()) {
        let canonical = aliases.canonical(term);
        if seen.insert(canonical.to_lowercase()) {
            out.push(canonical);
        }
    }
    out
}

fn prefer_semantic_list(det: &[String], sem: &[String]) -> Vec<String> {
    if sem.is_empty() {
        det.to_vec()
    } else {
        dedup_preserving_order(sem.to_vec())
    }
}

/// Reconcile the deterministic and semantic constraint sets.
///
/// `include` and `exclude` take the union of both sources so exclusion
/// safety always favors the superset. Scalar fields prefer the semantic
/// value when present, falling back to the deterministic one. A missing or
/// weak semantic result never drags confidence below the deterministic
/// score.
pub fn merge(
    deterministic: &ConstraintSet,
    semantic: Option<&ConstraintSet>,
    aliases: &AliasTable,
) -> ConstraintSet {
    let Some(sem) = semantic else {
        return deterministic.clone();
    };

    ConstraintSet {
        include: union_canonical(&deterministic.include, &sem.include, aliases),
        exclude: union_canonical(&deterministic.exclude, &sem.exclude, aliases),
        cuisine: prefer_semantic_list(&deterministic.cuisine, &sem.cuisine),
        diet: prefer_semantic_list(&deterministic.diet, &sem.diet),
        course: prefer_semantic_list(&deterministic.course, &sem.course),
        max_cook_minutes: sem.max_cook_minutes.or(deterministic.max_cook_minutes),
        max_total_minutes: sem.max_total_minutes.or(deterministic.max_total_minutes),
        keywords: union_canonical(&deterministic.keywords, &sem.keywords, aliases),
        intent: if sem.intent.is_empty() || sem.intent == "Unknown" {
            deterministic.intent.clone()
        } else {
            sem.intent.clone()
        },
        language: if sem.language.is_empty() || sem.language == "Unknown" {
            deterministic.language.clone()
        } else {
            sem.language.clone()
        },
        confidence: deterministic.confidence.max(sem.confidence),
    }
}
