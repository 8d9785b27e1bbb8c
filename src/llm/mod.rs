//! LLM client for post classification and draft composition
//!
//! This module provides LLM integration using an Ollama-compatible endpoint
//! for two tasks: judging whether a channel post matches an autoposting
//! config's filter prompt, and rewriting a winning post into publication
//! text.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::Verdict;
use crate::utils::error::ClassifyError;
use crate::utils::truncate_text;

/// Configuration for LLM client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama endpoint URL (default: http://localhost:11434)
    pub endpoint: String,

    /// Model name to use
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature for generation (0.0 - 1.0)
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b".to_string(),
            timeout_secs: 60,
            max_tokens: 1024,
            temperature: 0.2,
        }
    }
}

impl LlmConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("OLLAMA_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "qwen2.5:7b".to_string()),
            timeout_secs: std::env::var("OLLAMA_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            max_tokens: std::env::var("OLLAMA_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024),
            temperature: std::env::var("OLLAMA_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.2),
        }
    }
}

/// Ollama generate request
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama generate response
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// LLM client for classification and draft composition
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client with default config
    pub fn new() -> Result<Self> {
        Self::with_config(LlmConfig::default())
    }

    /// Create a new LLM client with custom config
    pub fn with_config(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// Create a client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(LlmConfig::from_env())
    }

    /// Check if the model endpoint is available
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.endpoint);
        self.client.get(&url).send().await.is_ok()
    }

    /// Judge whether a post matches an autoposting filter prompt
    ///
    /// Returns the model's verdict with a human-readable reason. The caller
    /// decides what to do with rejected posts (they are ledgered so they are
    /// never judged twice).
    pub async fn classify_post(
        &self,
        filter_prompt: &str,
        text: &str,
    ) -> std::result::Result<Verdict, ClassifyError> {
        let prompt = build_classify_prompt(filter_prompt, text);
        let response = self
            .generate(&prompt)
            .await
            .map_err(ClassifyError::Request)?;

        if response.trim().is_empty() {
            return Err(ClassifyError::EmptyResponse);
        }

        parse_verdict(&response)
    }

    /// Rewrite a winning post into publication text for a category
    pub async fn compose_draft(&self, category_name: &str, source_text: &str) -> Result<String> {
        let prompt = build_draft_prompt(category_name, source_text);
        let response = self.generate(&prompt).await?;

        let text = strip_code_fences(&response).trim().to_string();
        if text.is_empty() {
            anyhow::bail!("Model returned an empty draft");
        }

        Ok(text)
    }

    /// Generate text using the model endpoint
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.config.endpoint);

        let request = OllamaRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to model endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Model request failed: {} - {}", status, body);
        }

        let completion: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse model response")?;

        Ok(completion.response)
    }
}

#[async_trait::async_trait]
impl crate::engine::ports::PostClassifier for LlmClient {
    async fn classify(&self, filter_prompt: &str, text: &str) -> crate::error::Result<Verdict> {
        self.classify_post(filter_prompt, text)
            .await
            .map_err(Into::into)
    }
}

/// Build the classification prompt from a config's filter prompt and a post
fn build_classify_prompt(filter_prompt: &str, text: &str) -> String {
    format!(
        r#"You screen Telegram posts for a content editor.

## Selection rule from the editor:
{filter_prompt}

## Task:
Decide whether the post below satisfies the selection rule. Answer with JSON
only, no extra prose:

```json
{{"suitable": true, "reason": "one short sentence"}}
```

## Post:
{text}

## Verdict (JSON):"#
    )
}

/// Build the draft composition prompt for a winning post
fn build_draft_prompt(category_name: &str, source_text: &str) -> String {
    format!(
        r#"You write social-media publications for the "{category_name}" category.

Rewrite the source post below into a standalone publication: keep the facts,
drop channel-specific references, no hashtag spam, no preamble. Reply with
the publication text only.

## Source post:
{source_text}

## Publication:"#
    )
}

/// Parse a classification verdict from model output
fn parse_verdict(response: &str) -> std::result::Result<Verdict, ClassifyError> {
    let json_str = extract_json(response);

    tracing::debug!("Extracted verdict JSON: {}", truncate_text(&json_str, 200));

    match serde_json::from_str::<Verdict>(&json_str) {
        Ok(verdict) => Ok(verdict),
        Err(_) => {
            // Fall back to a keyword scan when the model ignored the format
            let lowered = response.to_lowercase();
            if lowered.contains("\"suitable\": true") || lowered.contains("\"suitable\":true") {
                return Ok(Verdict {
                    suitable: true,
                    reason: String::new(),
                });
            }
            if lowered.contains("\"suitable\": false") || lowered.contains("\"suitable\":false") {
                return Ok(Verdict {
                    suitable: false,
                    reason: String::new(),
                });
            }

            Err(ClassifyError::BadVerdict(truncate_text(response, 200)))
        }
    }
}

/// Extract JSON from markdown code blocks or raw text
fn extract_json(text: &str) -> String {
    // Try to find JSON in code block
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            return text[start + 7..start + 7 + end].trim().to_string();
        }
    }

    // Try to find JSON in generic code block
    if let Some(start) = text.find("```") {
        let after_start = &text[start + 3..];
        // Skip language identifier if present
        let content_start = after_start.find('\n').unwrap_or(0) + 1;
        if let Some(end) = after_start[content_start..].find("```") {
            return after_start[content_start..content_start + end]
                .trim()
                .to_string();
        }
    }

    // Try to find raw JSON object
    if let Some(start) = text.find('{') {
        if let Some(end) = text.rfind('}') {
            if end > start {
                return text[start..=end].to_string();
            }
        }
    }

    text.trim().to_string()
}

/// Strip a wrapping markdown code fence from a completion, if present
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(inner) = trimmed.strip_prefix("```") {
        if let Some(inner) = inner.split_once('\n').map(|(_, rest)| rest) {
            if let Some(stripped) = inner.strip_suffix("```") {
                return stripped;
            }
        }
    }
    trimmed
}
