use crate::alias::AliasTable;
use crate::config::vocab::VocabConfig;
use crate::constraints::ConstraintSet;
use crate::error::{Error, Result};
use crate::utils::text::{dedup_preserving_order, normalize};
use regex::Regex;
use std::collections::HashSet;

/// Deterministic, pure constraint extractor.
///
/// No I/O at extraction time: all cue patterns and vocabularies are
/// compiled once at construction from the loaded tables. Identical input
/// always yields an identical `ConstraintSet`.
pub struct RuleExtractor {
    vocab: VocabConfig,
    aliases: AliasTable,
    stopwords: HashSet<String>,
    exclusion_re: Regex,
    requirement_re: Regex,
    conjunction_re: Regex,
    conjunction_tail_re: Regex,
    bound_re: Regex,
    window_re: Regex,
    // Scan order is fixed at construction: longest term first, then
    // alphabetical, so overlapping vocabulary terms resolve the same way
    // on every run.
    cuisine_scan: Vec<(String, Regex)>,
    diet_scan: Vec<(String, Regex)>,
    course_scan: Vec<(String, Regex)>,
    technique_scan: Vec<(String, Regex)>,
}

/// Words that terminate a captured cue phrase early
const PHRASE_TERMINATORS: &[&str] = &[
    "and", "or", "under", "less", "below", "within", "in", "minute", "minutes", "min", "mins",
];

fn cue_alternation(cues: &[String]) -> String {
    let mut sorted: Vec<&String> = cues.iter().collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    sorted
        .iter()
        .map(|c| regex::escape(&c.to_lowercase()))
        .collect::<Vec<_>>()
        .join("|")
}

fn vocab_scan(terms: &[String]) -> Vec<(String, Regex)> {
    let mut sorted: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    sorted
        .into_iter()
        .filter_map(|term| {
            let pattern = format!(r"\b{}(?:s|es)?\b", regex::escape(&term));
            Regex::new(&pattern).ok().map(|re| (term, re))
        })
        .collect()
}

fn overlaps(spans: &[(usize, usize)], start: usize, end: usize) -> bool {
    spans.iter().any(|&(s, e)| start < e && s < end)
}

fn blank_spans(text: &str, spans: &[(usize, usize)]) -> String {
    text.char_indices()
        .map(|(i, c)| if overlaps(spans, i, i + c.len_utf8()) { ' ' } else { c })
        .collect()
}

impl RuleExtractor {
    pub fn new(vocab: VocabConfig, aliases: AliasTable) -> Result<Self> {
        let exclusion_re = Regex::new(&format!(
            r"\b(?:{})\s+(\w+)(?:\s+(\w+))?",
            cue_alternation(&vocab.exclusion_cues)
        ))
        .map_err(|e| Error::Internal(format!("Invalid exclusion cue pattern: {e}")))?;

        let requirement_re = Regex::new(&format!(
            r"\b(?:{})\s+(\w+)(?:\s+(\w+))?",
            cue_alternation(&vocab.requirement_cues)
        ))
        .map_err(|e| Error::Internal(format!("Invalid requirement cue pattern: {e}")))?;

        // Conjoined cue phrases: "without onion and garlic" binds every
        // conjunct to the cue. The tail variant resumes after a match whose
        // trailing word was already the conjunction.
        let conjunction_re = Regex::new(r"^\s*(?:and|or)\s+(\w+)(?:\s+(\w+))?")
            .map_err(|e| Error::Internal(format!("Invalid conjunction pattern: {e}")))?;
        let conjunction_tail_re = Regex::new(r"^\s*(\w+)(?:\s+(\w+))?")
            .map_err(|e| Error::Internal(format!("Invalid conjunction tail pattern: {e}")))?;

        let bound_re =
            Regex::new(r"\b(?:under|less than|below|within)\s+(\d+)\s*(?:minutes?|mins?)\b")
                .map_err(|e| Error::Internal(format!("Invalid time pattern: {e}")))?;

        let window_re = Regex::new(r"\bin\s+(\d+)\s*(?:minutes?|mins?)\b")
            .map_err(|e| Error::Internal(format!("Invalid time window pattern: {e}")))?;

        let stopwords = vocab.stopword_set();
        let cuisine_scan = vocab_scan(&vocab.cuisines);
        let diet_scan = vocab_scan(&vocab.diets);
        let course_scan = vocab_scan(&vocab.courses);
        let technique_scan = vocab_scan(&vocab.techniques);

        Ok(Self {
            vocab,
            aliases,
            stopwords,
            exclusion_re,
            requirement_re,
            conjunction_re,
            conjunction_tail_re,
            bound_re,
            window_re,
            cuisine_scan,
            diet_scan,
            course_scan,
            technique_scan,
        })
    }

    fn is_cue(&self, word: &str) -> bool {
        self.vocab
            .exclusion_cues
            .iter()
            .chain(self.vocab.requirement_cues.iter())
            .any(|cue| cue.eq_ignore_ascii_case(word))
    }

    /// Truncate a captured 1-2 word phrase at and/or, cue and time
    /// terminators
    fn phrase_from_captures(&self, first: &str, second: Option<&str>) -> Option<String> {
        if PHRASE_TERMINATORS.contains(&first)
            || self.is_cue(first)
            || first.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        match second {
            Some(word)
                if !PHRASE_TERMINATORS.contains(&word)
                    && !self.is_cue(word)
                    && !self.stopwords.contains(word)
                    && !word.chars().all(|c| c.is_ascii_digit()) =>
            {
                Some(format!("{first} {word}"))
            }
            _ => Some(first.to_string()),
        }
    }

    fn scan_cues(
        &self,
        re: &Regex,
        text: &str,
        spans: &mut Vec<(usize, usize)>,
    ) -> Vec<String> {
        let mut terms = Vec::new();
        let mut pos = 0;
        while let Some(caps) = re.captures(&text[pos..]) {
            let full = caps.get(0).expect("capture 0 always present");
            let first = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let second_match = caps.get(2);
            let second = second_match.map(|m| m.as_str());
            let mut end = pos + full.end();

            if let Some(phrase) = self.phrase_from_captures(first, second) {
                spans.push((pos + full.start(), end));
                terms.push(self.aliases.canonical(&phrase));

                // Every conjunct binds to the same cue: "without onion and
                // garlic" excludes both. The run ends at the first token
                // that is not joined by and/or.
                let mut conjoined = matches!(second, Some("and") | Some("or"));
                loop {
                    let tail = if conjoined {
                        &self.conjunction_tail_re
                    } else {
                        &self.conjunction_re
                    };
                    let Some(caps) = tail.captures(&text[end..]) else {
                        break;
                    };
                    let first = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                    let second = caps.get(2).map(|m| m.as_str());
                    let Some(phrase) = self.phrase_from_captures(first, second) else {
                        break;
                    };
                    let consumed = caps.get(0).expect("capture 0 always present");
                    spans.push((end + consumed.start(), end + consumed.end()));
                    terms.push(self.aliases.canonical(&phrase));
                    conjoined = matches!(second, Some("and") | Some("or"));
                    end += consumed.end();
                }
            }

            // A cue swallowed as the trailing capture ("no onion no garlic")
            // restarts the scan at that cue, not after it
            pos = match second_match {
                Some(m) if self.is_cue(m.as_str()) => pos + m.start(),
                _ => end,
            };
        }
        dedup_preserving_order(terms)
    }

    fn scan_vocab(
        &self,
        scan: &[(String, Regex)],
        text: &str,
        spans: &mut Vec<(usize, usize)>,
    ) -> Vec<String> {
        let mut found = Vec::new();
        let mut local_spans: Vec<(usize, usize)> = Vec::new();
        for (term, re) in scan {
            for m in re.find_iter(text) {
                // Longest-match-first: "north indian" claims its span before
                // "indian" gets a chance at the same region.
                if overlaps(&local_spans, m.start(), m.end()) || overlaps(spans, m.start(), m.end())
                {
                    continue;
                }
                local_spans.push((m.start(), m.end()));
                found.push(term.clone());
            }
        }
        spans.extend(local_spans);
        dedup_preserving_order(found)
    }

    fn scan_time(&self, text: &str, spans: &mut Vec<(usize, usize)>) -> Option<u32> {
        if let Some(caps) = self.bound_re.captures(text) {
            let full = caps.get(0).expect("capture 0 always present");
            spans.push((full.start(), full.end()));
            if let Ok(minutes) = caps[1].parse::<u32>() {
                return Some(minutes);
            }
        }

        // "in N minutes" is a target, not a hard bound: widen to a window
        // and keep the upper edge.
        if let Some(caps) = self.window_re.captures(text) {
            let full = caps.get(0).expect("capture 0 always present");
            spans.push((full.start(), full.end()));
            if let Ok(minutes) = caps[1].parse::<u32>() {
                return Some(minutes + 5);
            }
        }

        // Qualitative cues; when several match, the tightest bound wins
        let mut cues: Vec<(&String, &u32)> = self.vocab.time_cues.iter().collect();
        cues.sort_by(|a, b| a.0.cmp(b.0));
        let mut implied: Option<u32> = None;
        for (cue, minutes) in cues {
            let pattern = format!(r"\b{}\b", regex::escape(&cue.to_lowercase()));
            if let Ok(re) = Regex::new(&pattern) {
                if let Some(m) = re.find(text) {
                    spans.push((m.start(), m.end()));
                    implied = Some(implied.map_or(*minutes, |cur: u32| cur.min(*minutes)));
                }
            }
        }
        implied
    }

    /// Extract a constraint set from a free-text query.
    ///
    /// Pure function of the input text and the tables loaded at
    /// construction.
    pub fn extract(&self, text: &str) -> ConstraintSet {
        let normalized = normalize(text);
        let mut spans: Vec<(usize, usize)> = Vec::new();

        // Order matters only for span bookkeeping; each stage scans the
        // original normalized text.
        let mut exclude = self.scan_cues(&self.exclusion_re, &normalized, &mut spans);
        let required = self.scan_cues(&self.requirement_re, &normalized, &mut spans);
        let max_cook_minutes = self.scan_time(&normalized, &mut spans);
        let cuisine = self.scan_vocab(&self.cuisine_scan, &normalized, &mut spans);
        let diet = self.scan_vocab(&self.diet_scan, &normalized, &mut spans);
        let course = self.scan_vocab(&self.course_scan, &normalized, &mut spans);
        let keywords = self.scan_vocab(&self.technique_scan, &normalized, &mut spans);

        // Diet-implied exclusions (e.g. jain excludes onion and garlic)
        for diet_name in &diet {
            if let Some(implied) = self.vocab.diet_exclusions.get(diet_name) {
                for term in implied {
                    exclude.push(self.aliases.canonical(term));
                }
            }
        }
        let exclude = dedup_preserving_order(exclude);

        // Residual tokens become include terms
        let residual = blank_spans(&normalized, &spans);
        let mut include = required;
        include.extend(
            residual
                .split_whitespace()
                .filter(|t| !self.stopwords.contains(*t))
                .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
                .map(String::from),
        );
        let include = dedup_preserving_order(include);

        let mut confidence: f32 = 0.5;
        if !exclude.is_empty() {
            confidence += 0.15;
        }
        if !include.is_empty() {
            confidence += 0.10;
        }
        if !cuisine.is_empty() {
            confidence += 0.10;
        }
        if !diet.is_empty() {
            confidence += 0.10;
        }
        if max_cook_minutes.is_some() {
            confidence += 0.10;
        }
        if !course.is_empty() {
            confidence += 0.05;
        }
        if !keywords.is_empty() {
            confidence += 0.05;
        }

        ConstraintSet {
            include,
            exclude,
            cuisine,
            diet,
            course,
            max_cook_minutes,
            max_total_minutes: None,
            keywords,
            confidence: confidence.min(1.0),
            ..Default::default()
        }
    }
}
