use crate::config::providers::ProviderConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a failed provider call should be treated by the fallback chain
#[derive(Debug)]
pub enum CallError {
    /// Provider is considered down for the process lifetime (non-2xx,
    /// timeout)
    Sticky(String),
    /// Worth retrying on the next request (transport hiccup, malformed
    /// response)
    Transient(String),
}

impl CallError {
    pub fn reason(&self) -> &str {
        match self {
            CallError::Sticky(r) | CallError::Transient(r) => r,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// A successful completion plus the token counts used for cost accounting
#[derive(Debug)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// One chat-completion-style semantic extraction provider
#[derive(Debug, Clone)]
pub struct Provider {
    pub config: ProviderConfig,
    api_key: Option<String>,
}

impl Provider {
    pub fn new(config: ProviderConfig) -> Self {
        let api_key = config
            .api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok());
        Self { config, api_key }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Dollar cost of one call at this provider's per-token pricing
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        prompt_tokens as f64 / 1000.0 * self.config.input_price_per_1k
            + completion_tokens as f64 / 1000.0 * self.config.output_price_per_1k
    }

    /// Perform one chat completion call
    ///
    /// The per-call deadline is enforced by the caller so an abandoned call
    /// never contributes a partial result.
    pub async fn complete(
        &self,
        client: &Client,
        messages: &[ChatMessage],
    ) -> Result<Completion, CallError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!("Provider {} request to {}", self.config.name, self.config.endpoint);

        let mut request = client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CallError::Sticky(format!("request timed out: {e}"))
            } else {
                // Connection-level hiccups are worth another try next request
                CallError::Transient(format!("transport error: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallError::Sticky(format!("HTTP {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CallError::Transient(format!("malformed response envelope: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CallError::Transient("response contained no choices".to_string()))?;

        let usage = parsed.usage.unwrap_or_default();
        // Rough length-based estimate when the provider omits usage counts
        let prompt_tokens = if usage.prompt_tokens > 0 {
            usage.prompt_tokens
        } else {
            messages.iter().map(|m| m.content.len() as u64).sum::<u64>() / 4
        };
        let completion_tokens = if usage.completion_tokens > 0 {
            usage.completion_tokens
        } else {
            content.len() as u64 / 4
        };

        Ok(Completion {
            content,
            prompt_tokens,
            completion_tokens,
        })
    }
}

/// Strip a wrapping markdown code fence from provider output, if any
///
/// Providers often return ```json ... ``` despite being asked for bare
/// JSON.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line
    let rest = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProviderConfig {
        ProviderConfig {
            name: "test".to_string(),
            endpoint: "https://api.example.com/v1/chat/completions".to_string(),
            model: "test-model".to_string(),
            api_key_env: None,
            priority: 0,
            timeout_secs: 20,
            input_price_per_1k: 0.5,
            output_price_per_1k: 1.5,
            temperature: 0.0,
            max_tokens: 512,
            enabled: true,
        }
    }

    #[test]
    fn test_cost_uses_per_token_pricing() {
        let provider = Provider::new(config());
        let cost = provider.cost(2000, 1000);
        assert!((cost - (1.0 + 1.5)).abs() < 1e-9);
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```json\n{}\n```  "), "{}");
    }

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::system("x").role, "system");
        assert_eq!(ChatMessage::user("x").role, "user");
    }
}
