use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

/// Descriptor for one semantic extraction provider.
///
/// Providers are chat-completion style HTTP endpoints. Priority rank
/// orders the fallback chain (lower value is tried first); pricing feeds
/// the running cost counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key; unset means no auth header
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub input_price_per_1k: f64,
    #[serde(default)]
    pub output_price_per_1k: f64,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_max_tokens() -> u32 {
    512
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl ProvidersConfig {
    /// Load provider configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read provider config from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: ProvidersConfig = serde_yaml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse provider config from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from file when present; an absent file means no semantic path
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = std::collections::HashSet::new();
        for provider in &self.providers {
            if provider.name.is_empty() {
                return Err(Error::Config("Provider name cannot be empty".to_string()));
            }
            if !names.insert(provider.name.clone()) {
                return Err(Error::Config(format!(
                    "Duplicate provider name: {}",
                    provider.name
                )));
            }
            Url::parse(&provider.endpoint).map_err(|e| {
                Error::Config(format!(
                    "Invalid endpoint for provider {}: {}",
                    provider.name, e
                ))
            })?;
            if provider.timeout_secs == 0 {
                return Err(Error::Config(format!(
                    "Provider {} timeout must be non-zero",
                    provider.name
                )));
            }
        }
        Ok(())
    }

    /// Enabled providers sorted by priority rank (then name, for stability)
    pub fn sorted(&self) -> Vec<ProviderConfig> {
        let mut providers: Vec<ProviderConfig> = self
            .providers
            .iter()
            .filter(|p| p.enabled)
            .cloned()
            .collect();
        providers.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.name.cmp(&b.name)));
        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(name: &str, priority: u32) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            endpoint: "https://api.example.com/v1/chat/completions".to_string(),
            model: "test-model".to_string(),
            api_key_env: None,
            priority,
            timeout_secs: 20,
            input_price_per_1k: 0.001,
            output_price_per_1k: 0.002,
            temperature: 0.0,
            max_tokens: 512,
            enabled: true,
        }
    }

    #[test]
    fn test_sorted_respects_priority() {
        let config = ProvidersConfig {
            providers: vec![provider("slow", 2), provider("primary", 0), provider("backup", 1)],
        };
        let names: Vec<_> = config.sorted().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["primary", "backup", "slow"]);
    }

    #[test]
    fn test_sorted_skips_disabled() {
        let mut disabled = provider("off", 0);
        disabled.enabled = false;
        let config = ProvidersConfig {
            providers: vec![disabled, provider("on", 1)],
        };
        assert_eq!(config.sorted().len(), 1);
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_urls() {
        let config = ProvidersConfig {
            providers: vec![provider("a", 0), provider("a", 1)],
        };
        assert!(config.validate().is_err());

        let mut bad = provider("b", 0);
        bad.endpoint = "not a url".to_string();
        let config = ProvidersConfig {
            providers: vec![bad],
        };
        assert!(config.validate().is_err());
    }
}
