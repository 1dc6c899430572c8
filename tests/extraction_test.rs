// End-to-end extraction and merge behavior over the shipped tables
use tiffin::alias::{AliasGroup, AliasTable};
use tiffin::config::vocab::VocabConfig;
use tiffin::constraints::{merge, ConstraintSet};
use tiffin::extract::RuleExtractor;
use tiffin::utils::duration::parse_minutes;

fn aliases() -> AliasTable {
    AliasTable::from_groups(vec![
        AliasGroup {
            canonical: "onion".to_string(),
            synonyms: vec!["pyaz".to_string(), "kanda".to_string()],
            replacements: vec!["asafoetida".to_string()],
        },
        AliasGroup {
            canonical: "garlic".to_string(),
            synonyms: vec!["lehsun".to_string()],
            replacements: vec![],
        },
        AliasGroup {
            canonical: "paneer".to_string(),
            synonyms: vec!["cottage cheese".to_string()],
            replacements: vec!["tofu".to_string()],
        },
    ])
}

fn extractor() -> RuleExtractor {
    RuleExtractor::new(VocabConfig::default(), aliases()).unwrap()
}

#[test]
fn exclusion_cue_yields_canonical_exclude() {
    // Property: any exclusion cue referencing ingredient X puts X's
    // canonical form into the exclude set
    let cases = [
        ("dal without onions", "onion"),
        ("dal no pyaz", "onion"),
        ("curry except garlic", "garlic"),
        ("sabzi excluding lehsun", "garlic"),
        ("thali minus onion", "onion"),
        ("bread free from garlic", "garlic"),
    ];
    let ex = extractor();
    for (query, expected) in cases {
        let set = ex.extract(query);
        assert!(
            set.exclude.contains(&expected.to_string()),
            "query {query:?}: expected {expected} in {:?}",
            set.exclude
        );
    }
}

#[test]
fn conjoined_exclusion_never_becomes_requirement() {
    // "dal without onion and garlic" excludes both conjuncts; the second
    // must never land in the include set as if it were required
    let set = extractor().extract("dal without onion and garlic");
    assert!(set.exclude.contains(&"onion".to_string()));
    assert!(set.exclude.contains(&"garlic".to_string()));
    assert!(!set.include.contains(&"garlic".to_string()));
    assert_eq!(set.include, vec!["dal"]);
}

#[test]
fn scenario_paneer_tikka_without_onions() {
    let set = extractor().extract("paneer tikka without onions under 30 minutes");
    assert!(set.include.contains(&"paneer".to_string()));
    assert!(set.exclude.contains(&"onion".to_string()));
    assert_eq!(set.max_cook_minutes, Some(30));
}

#[test]
fn scenario_jain_dal_no_garlic() {
    let set = extractor().extract("jain dal recipe no garlic");
    assert!(set.diet.contains(&"jain".to_string()));
    assert!(set.exclude.contains(&"garlic".to_string()));
    // Jain diet implies the onion exclusion even though the query never
    // mentions onions
    assert!(set.exclude.contains(&"onion".to_string()));
}

#[test]
fn extractor_is_deterministic() {
    let ex = extractor();
    let query = "quick jain north indian snack without onion with paneer under 25 minutes";
    let first = ex.extract(query);
    for _ in 0..10 {
        assert_eq!(ex.extract(query), first);
    }
}

#[test]
fn merge_union_law() {
    // merge(det, sem).exclude == union(det.exclude, sem.exclude),
    // regardless of evaluation order
    let aliases = aliases();
    let det = ConstraintSet {
        exclude: vec!["onion".to_string(), "garlic".to_string()],
        ..Default::default()
    };
    let sem = ConstraintSet {
        exclude: vec!["pyaz".to_string(), "peanut".to_string()],
        ..Default::default()
    };

    let merged = merge(&det, Some(&sem), &aliases);
    let mut got = merged.exclude.clone();
    got.sort();
    // "pyaz" canonicalizes to "onion", so the union has three members
    assert_eq!(got, vec!["garlic", "onion", "peanut"]);

    let reversed = merge(&sem, Some(&det), &aliases);
    let mut got_reversed = reversed.exclude.clone();
    got_reversed.sort();
    assert_eq!(got, got_reversed);
}

#[test]
fn merge_keeps_deterministic_when_semantic_absent() {
    let aliases = aliases();
    let det = extractor().extract("paneer tikka without onion");
    let merged = merge(&det, None, &aliases);
    assert_eq!(merged, det);
}

#[test]
fn merge_defaults_for_missing_semantic_fields() {
    let aliases = aliases();
    let det = ConstraintSet::default();
    let sem = ConstraintSet::default();
    let merged = merge(&det, Some(&sem), &aliases);
    assert_eq!(merged.intent, "search");
    assert_eq!(merged.language, "Unknown");
    assert!(merged.max_cook_minutes.is_none());
    assert!(merged.cuisine.is_empty());
}

#[test]
fn duration_literals_normalize_identically() {
    // "30 minutes", "PT30M" and literal 30 all normalize to 30
    assert_eq!(parse_minutes("30 minutes"), Some(30));
    assert_eq!(parse_minutes("PT30M"), Some(30));
    assert_eq!(parse_minutes("30"), Some(30));
    assert_eq!(parse_minutes("2 hours"), Some(120));
    assert_eq!(parse_minutes("PT2H"), Some(120));
}

#[test]
fn shipped_lexicon_loads_and_resolves() {
    let table = AliasTable::from_file("config/lexicon.jsonl").unwrap();
    assert!(table.len() > 20);
    assert_eq!(table.canonical("pyaz"), "onion");
    assert_eq!(table.canonical("besan"), "gram flour");
    let family = table.resolve("lehsun");
    assert!(family.contains(&"garlic".to_string()));
}

#[test]
fn shipped_vocab_parses() {
    let vocab = VocabConfig::from_file("config/vocab.yaml").unwrap();
    assert!(vocab.diets.contains(&"jain".to_string()));
    assert!(vocab.diet_exclusions.contains_key("jain"));
    // The extractor must build cleanly from the shipped tables
    RuleExtractor::new(vocab, AliasTable::empty()).unwrap();
}
