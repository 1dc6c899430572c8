use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Closed vocabularies and extraction cue tables.
///
/// Kept data-driven so new cuisines, cue phrases or diet rules land in
/// `config/vocab.yaml` instead of code. The built-in `Default` covers the
/// common English tables and is used when no config file is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabConfig {
    #[serde(default = "default_exclusion_cues")]
    pub exclusion_cues: Vec<String>,
    #[serde(default = "default_requirement_cues")]
    pub requirement_cues: Vec<String>,
    #[serde(default = "default_cuisines")]
    pub cuisines: Vec<String>,
    #[serde(default = "default_diets")]
    pub diets: Vec<String>,
    #[serde(default = "default_courses")]
    pub courses: Vec<String>,
    #[serde(default = "default_techniques")]
    pub techniques: Vec<String>,
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
    /// Diet name -> ingredients that diet implicitly excludes
    #[serde(default = "default_diet_exclusions")]
    pub diet_exclusions: HashMap<String, Vec<String>>,
    /// Qualitative time cue -> implied max cook minutes
    #[serde(default = "default_time_cues")]
    pub time_cues: HashMap<String, u32>,
    /// Compound word -> base term it contains, for the matching allowlist
    #[serde(default = "default_compounds")]
    pub compounds: HashMap<String, String>,
}

impl Default for VocabConfig {
    fn default() -> Self {
        Self {
            exclusion_cues: default_exclusion_cues(),
            requirement_cues: default_requirement_cues(),
            cuisines: default_cuisines(),
            diets: default_diets(),
            courses: default_courses(),
            techniques: default_techniques(),
            stopwords: default_stopwords(),
            diet_exclusions: default_diet_exclusions(),
            time_cues: default_time_cues(),
            compounds: default_compounds(),
        }
    }
}

fn default_exclusion_cues() -> Vec<String> {
    ["without", "no", "except", "excluding", "minus", "free from"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_requirement_cues() -> Vec<String> {
    ["with", "containing", "having", "must have"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_cuisines() -> Vec<String> {
    [
        "north indian",
        "south indian",
        "indian",
        "punjabi",
        "gujarati",
        "bengali",
        "maharashtrian",
        "rajasthani",
        "goan",
        "kerala",
        "chinese",
        "italian",
        "mexican",
        "thai",
        "continental",
        "mediterranean",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_diets() -> Vec<String> {
    [
        "jain",
        "vegan",
        "vegetarian",
        "non vegetarian",
        "eggetarian",
        "gluten free",
        "keto",
        "diabetic friendly",
        "high protein",
        "low carb",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_courses() -> Vec<String> {
    [
        "breakfast",
        "lunch",
        "dinner",
        "snack",
        "dessert",
        "starter",
        "main course",
        "side dish",
        "appetizer",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_techniques() -> Vec<String> {
    [
        "grilled",
        "baked",
        "fried",
        "deep fried",
        "steamed",
        "roasted",
        "tandoori",
        "stir fried",
        "pressure cooked",
        "slow cooked",
        "raw",
        "tikka",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_stopwords() -> Vec<String> {
    [
        "a", "an", "the", "some", "any", "recipe", "recipes", "dish", "dishes", "food", "make",
        "cook", "want", "need", "give", "show", "find", "me", "i", "please", "for", "of", "to",
        "in", "on", "that", "this", "is", "are", "it", "my", "how",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_diet_exclusions() -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    map.insert(
        "jain".to_string(),
        vec![
            "onion".to_string(),
            "garlic".to_string(),
            "potato".to_string(),
            "ginger".to_string(),
        ],
    );
    map.insert(
        "vegetarian".to_string(),
        vec![
            "chicken".to_string(),
            "mutton".to_string(),
            "fish".to_string(),
            "egg".to_string(),
        ],
    );
    map.insert(
        "vegan".to_string(),
        vec![
            "chicken".to_string(),
            "mutton".to_string(),
            "fish".to_string(),
            "egg".to_string(),
            "milk".to_string(),
            "paneer".to_string(),
            "ghee".to_string(),
            "honey".to_string(),
        ],
    );
    map
}

fn default_time_cues() -> HashMap<String, u32> {
    let mut map = HashMap::new();
    map.insert("quick".to_string(), 30);
    map.insert("fast".to_string(), 20);
    map
}

fn default_compounds() -> HashMap<String, String> {
    let mut map = HashMap::new();
    map.insert("spring onion".to_string(), "onion".to_string());
    map.insert("buttermilk".to_string(), "milk".to_string());
    map.insert("garlic bread".to_string(), "garlic".to_string());
    map.insert("coconut milk".to_string(), "coconut".to_string());
    map
}

impl VocabConfig {
    /// Load vocabulary configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read vocab config from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: VocabConfig = serde_yaml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse vocab config from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from file when present, otherwise fall back to the built-in tables
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.exclusion_cues.is_empty() {
            return Err(Error::Config(
                "At least one exclusion cue is required".to_string(),
            ));
        }
        if self.requirement_cues.is_empty() {
            return Err(Error::Config(
                "At least one requirement cue is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn stopword_set(&self) -> HashSet<String> {
        self.stopwords.iter().map(|s| s.to_lowercase()).collect()
    }

    pub fn compound_map(&self) -> HashMap<String, String> {
        self.compounds.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_validate() {
        assert!(VocabConfig::default().validate().is_ok());
    }

    #[test]
    fn test_jain_implies_onion_and_garlic() {
        let vocab = VocabConfig::default();
        let implied = vocab.diet_exclusions.get("jain").unwrap();
        assert!(implied.contains(&"onion".to_string()));
        assert!(implied.contains(&"garlic".to_string()));
    }

    #[test]
    fn test_from_file_partial_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.yaml");
        std::fs::write(&path, "cuisines:\n  - martian\n").unwrap();

        let vocab = VocabConfig::from_file(&path).unwrap();
        assert_eq!(vocab.cuisines, vec!["martian"]);
        // Unspecified sections keep built-in defaults
        assert!(!vocab.exclusion_cues.is_empty());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let vocab = VocabConfig::load_or_default("/nonexistent/vocab.yaml").unwrap();
        assert!(!vocab.diets.is_empty());
    }
}
