use crate::error::{Error, Result};
use crate::utils::text::normalize;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// One alias family: a canonical term plus its interchangeable surface
/// forms (spellings, transliterations, other languages) and a list of
/// related-but-distinct substitutes that are NOT treated as the same
/// ingredient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasGroup {
    pub canonical: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub replacements: Vec<String>,
}

/// Canonical-term lookup table, loaded once at startup and read-only
/// afterward. Groups never merge across unrelated canonical keys.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    groups: Vec<AliasGroup>,
    // lowercase surface form -> index into groups
    index: HashMap<String, usize>,
}

impl AliasTable {
    /// Load a lexicon from a line-delimited JSON file
    ///
    /// One `AliasGroup` record per line; blank lines are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Lexicon(format!(
                "Failed to read lexicon from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let mut table = Self::default();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let group: AliasGroup = serde_json::from_str(line).map_err(|e| {
                Error::Lexicon(format!("Invalid lexicon record on line {}: {}", line_no + 1, e))
            })?;
            table.insert(group);
        }

        info!("Loaded {} alias groups from lexicon", table.groups.len());
        Ok(table)
    }

    /// Empty table; every term resolves to itself
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from in-memory groups (tests and built-in defaults)
    pub fn from_groups(groups: Vec<AliasGroup>) -> Self {
        let mut table = Self::default();
        for group in groups {
            table.insert(group);
        }
        table
    }

    fn insert(&mut self, group: AliasGroup) {
        let idx = self.groups.len();
        self.index.insert(group.canonical.to_lowercase(), idx);
        for synonym in &group.synonyms {
            self.index.insert(synonym.to_lowercase(), idx);
        }
        self.groups.push(group);
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn lookup(&self, term: &str) -> Option<&AliasGroup> {
        let key = normalize(term);
        if let Some(&idx) = self.index.get(&key) {
            return Some(&self.groups[idx]);
        }

        // Partial-match fallback: case-insensitive substring against known
        // keys. Guarded to 3+ characters so "a" never latches onto a family.
        // When several keys match, the longest wins (then lexicographically
        // smallest), so the outcome never depends on map iteration order.
        if key.len() >= 3 {
            let mut best: Option<(&str, usize)> = None;
            for (known, &idx) in &self.index {
                if !known.contains(&key) && !key.contains(known.as_str()) {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((current, _)) => {
                        known.len() > current.len()
                            || (known.len() == current.len() && known.as_str() < current)
                    }
                };
                if better {
                    best = Some((known.as_str(), idx));
                }
            }
            if let Some((known, idx)) = best {
                debug!(
                    "Alias partial match: {} -> {} (via {})",
                    key, self.groups[idx].canonical, known
                );
                return Some(&self.groups[idx]);
            }
        }

        None
    }

    /// All known surface forms for the term's family, canonical first.
    /// Unknown terms resolve to themselves.
    pub fn resolve(&self, term: &str) -> Vec<String> {
        match self.lookup(term) {
            Some(group) => {
                let mut forms = vec![group.canonical.clone()];
                forms.extend(group.synonyms.iter().cloned());
                forms
            }
            None => vec![term.to_string()],
        }
    }

    /// The canonical key for a term, or the term itself when unknown
    pub fn canonical(&self, term: &str) -> String {
        match self.lookup(term) {
            Some(group) => group.canonical.clone(),
            None => normalize(term),
        }
    }

    /// Related-but-distinct substitutes for a term's family
    pub fn replacements(&self, term: &str) -> Vec<String> {
        match self.lookup(term) {
            Some(group) => group.replacements.clone(),
            None => Vec::new(),
        }
    }
}

/// Compiled word-boundary pattern for one term, plural tolerant
///
/// `None` for terms that normalize to the empty string.
pub fn word_pattern(term: &str) -> Option<Regex> {
    let needle = normalize(term);
    if needle.is_empty() {
        return None;
    }
    Regex::new(&format!(r"\b{}(?:s|es)?\b", regex::escape(&needle))).ok()
}

/// Whole-word match of `term` in `text`, plural tolerant
///
/// This is the unified matching policy used for titles, ingredient lists
/// and descriptions alike. Compound words are handled separately via the
/// vocabulary allowlist (see [`FamilyMatcher`]).
pub fn word_match(text: &str, term: &str) -> bool {
    match word_pattern(term) {
        Some(re) => re.is_match(&normalize(text)),
        None => false,
    }
}

/// Precompiled matcher for every surface form of one term's alias family
///
/// Patterns compile once at construction and are reused across candidate
/// fields; the hot loop in the safety filter only runs `is_match`.
/// `compounds` maps compound words to the base term they contain
/// (e.g. "buttermilk" -> "milk"); a compound hit counts as a hit for the
/// base term's family.
pub struct FamilyMatcher {
    patterns: Vec<Regex>,
}

impl FamilyMatcher {
    pub fn new(aliases: &AliasTable, compounds: &HashMap<String, String>, term: &str) -> Self {
        let mut forms = aliases.resolve(term);
        let canonical = aliases.canonical(term);
        forms.extend(
            compounds
                .iter()
                .filter(|(_, base)| base.eq_ignore_ascii_case(&canonical))
                .map(|(compound, _)| compound.clone()),
        );
        Self {
            patterns: forms.iter().filter_map(|form| word_pattern(form)).collect(),
        }
    }

    /// Does `text` contain any surface form of the family?
    pub fn matches(&self, text: &str) -> bool {
        let haystack = normalize(text);
        self.patterns.iter().any(|re| re.is_match(&haystack))
    }
}

/// One-shot convenience over [`FamilyMatcher`] for single checks
pub fn family_matches(
    aliases: &AliasTable,
    compounds: &HashMap<String, String>,
    text: &str,
    term: &str,
) -> bool {
    FamilyMatcher::new(aliases, compounds, term).matches(text)
}
