// Text normalization helpers shared by the extractor, alias matcher and ranker

/// Lowercase and collapse all whitespace runs to single spaces
pub fn normalize(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split normalized text into alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Fraction of `wanted` tokens present in `have` (0.0 when `wanted` is empty)
pub fn token_overlap_ratio(wanted: &[String], have: &[String]) -> f32 {
    if wanted.is_empty() {
        return 0.0;
    }
    let matched = wanted.iter().filter(|w| have.contains(w)).count();
    matched as f32 / wanted.len() as f32
}

/// Deduplicate preserving first-occurrence order, comparing case-insensitively
pub fn dedup_preserving_order(terms: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    terms
        .into_iter()
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Paneer\t Tikka \n"), "paneer tikka");
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        assert_eq!(tokenize("gram-flour, onion!"), vec!["gram", "flour", "onion"]);
    }

    #[test]
    fn test_token_overlap_ratio() {
        let wanted = vec!["paneer".to_string(), "tikka".to_string()];
        let have = vec!["paneer".to_string(), "masala".to_string()];
        assert!((token_overlap_ratio(&wanted, &have) - 0.5).abs() < f32::EPSILON);
        assert_eq!(token_overlap_ratio(&[], &have), 0.0);
    }

    #[test]
    fn test_dedup_preserving_order() {
        let terms = vec![
            "Onion".to_string(),
            "garlic".to_string(),
            "onion".to_string(),
        ];
        assert_eq!(dedup_preserving_order(terms), vec!["Onion", "garlic"]);
    }
}
