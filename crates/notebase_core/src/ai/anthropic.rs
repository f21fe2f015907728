//! Anthropic Messages API adapter.

use super::{parse_tag_list, AiError, MemoEnricher};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
const API_VERSION: &str = "2023-06-01";
const SUMMARY_MAX_TOKENS: u32 = 300;
const TAGS_MAX_TOKENS: u32 = 100;

/// Memo enricher backed by the Anthropic Messages API.
pub struct AnthropicEnricher {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicEnricher {
    /// Builds an enricher; a blank or missing key is rejected up front.
    pub fn new(
        api_key: Option<String>,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(AiError::MissingApiKey)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AiError::Transport(format!("http client error: {err}")))?;
        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the client at another host, e.g. a local proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, AiError> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .map_err(|err| AiError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let payload: MessagesResponse = response
            .json()
            .map_err(|err| AiError::InvalidResponse(err.to_string()))?;
        first_text(&payload)
    }
}

impl MemoEnricher for AnthropicEnricher {
    fn summarize(&self, content: &str) -> Result<String, AiError> {
        self.complete(&summary_prompt(content), SUMMARY_MAX_TOKENS)
    }

    fn generate_tags(&self, content: &str) -> Result<Vec<String>, AiError> {
        let raw = self.complete(&tags_prompt(content), TAGS_MAX_TOKENS)?;
        Ok(parse_tag_list(&raw))
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn first_text(payload: &MessagesResponse) -> Result<String, AiError> {
    payload
        .content
        .iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text.as_deref())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| AiError::InvalidResponse("response has no text content".to_string()))
}

fn summary_prompt(content: &str) -> String {
    format!(
        "Summarize the following memo in at most 200 characters.\n\
         Keep only the key points and leave out filler.\n\n\
         Memo:\n{content}\n\n\
         Summary:"
    )
}

fn tags_prompt(content: &str) -> String {
    format!(
        "Extract at most 5 key keywords from the following memo.\n\
         Separate keywords with commas and keep each one to a word or short phrase.\n\n\
         Memo:\n{content}\n\n\
         Keywords (comma separated):"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_key_is_rejected() {
        let timeout = Duration::from_secs(1);
        assert!(matches!(
            AnthropicEnricher::new(None, None, timeout),
            Err(AiError::MissingApiKey)
        ));
        assert!(matches!(
            AnthropicEnricher::new(Some("  ".to_string()), None, timeout),
            Err(AiError::MissingApiKey)
        ));
    }

    #[test]
    fn default_model_applies_when_unset() {
        let enricher =
            AnthropicEnricher::new(Some("key".to_string()), None, Duration::from_secs(1)).unwrap();
        assert_eq!(enricher.model(), DEFAULT_MODEL);
    }

    #[test]
    fn first_text_block_is_trimmed() {
        let payload: MessagesResponse = serde_json::from_value(json!({
            "content": [
                { "type": "tool_use", "id": "x" },
                { "type": "text", "text": "  rust, sqlite \n" }
            ]
        }))
        .unwrap();
        assert_eq!(first_text(&payload).unwrap(), "rust, sqlite");
    }

    #[test]
    fn empty_content_is_invalid() {
        let payload: MessagesResponse = serde_json::from_value(json!({ "content": [] })).unwrap();
        assert!(matches!(
            first_text(&payload),
            Err(AiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn prompts_embed_memo_body() {
        assert!(summary_prompt("buy milk").contains("Memo:\nbuy milk"));
        assert!(tags_prompt("buy milk").contains("at most 5"));
    }
}
