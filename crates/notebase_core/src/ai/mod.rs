//! AI enrichment for memos.
//!
//! # Responsibility
//! - Define the [`MemoEnricher`] seam used by the memo service.
//! - Provide the Anthropic Messages API adapter.
//!
//! # Invariants
//! - Enrichers never touch storage; callers decide what to persist.
//! - Generated tag lists hold at most [`MAX_TAGS`] trimmed, non-empty tags.

pub mod anthropic;

use std::error::Error;
use std::fmt::{Display, Formatter};

pub use anthropic::AnthropicEnricher;

pub const MAX_TAGS: usize = 5;

/// Errors from AI enrichment calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    /// No API key configured.
    MissingApiKey,
    /// Request could not be sent or the body could not be read.
    Transport(String),
    /// Upstream answered with a non-success status.
    Status { status: u16, message: String },
    /// Upstream answered but the payload had no usable text.
    InvalidResponse(String),
}

impl Display for AiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "AI API key is not configured"),
            Self::Transport(message) => write!(f, "AI request failed: {message}"),
            Self::Status { status, message } => {
                write!(f, "AI API returned status {status}: {message}")
            }
            Self::InvalidResponse(message) => write!(f, "invalid AI response: {message}"),
        }
    }
}

impl Error for AiError {}

/// Summary and tags produced for one memo body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoEnrichment {
    pub summary: String,
    pub tags: Vec<String>,
}

/// Text model that can summarize and tag memo content.
pub trait MemoEnricher: Send + Sync {
    /// Short summary of `content`.
    fn summarize(&self, content: &str) -> Result<String, AiError>;

    /// Up to [`MAX_TAGS`] keyword tags for `content`.
    fn generate_tags(&self, content: &str) -> Result<Vec<String>, AiError>;

    /// Runs both calls; the first failure wins.
    fn enrich(&self, content: &str) -> Result<MemoEnrichment, AiError> {
        let summary = self.summarize(content)?;
        let tags = self.generate_tags(content)?;
        Ok(MemoEnrichment { summary, tags })
    }
}

/// Splits a comma-separated model answer into clean tags.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .take(MAX_TAGS)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_list_is_trimmed_filtered_and_capped() {
        let tags = parse_tag_list(" rust, ,sqlite ,axum,tokio,serde,log ");
        assert_eq!(tags, vec!["rust", "sqlite", "axum", "tokio", "serde"]);
        assert!(parse_tag_list(" , ").is_empty());
    }

    struct Canned;

    impl MemoEnricher for Canned {
        fn summarize(&self, _content: &str) -> Result<String, AiError> {
            Ok("short".to_string())
        }

        fn generate_tags(&self, _content: &str) -> Result<Vec<String>, AiError> {
            Err(AiError::MissingApiKey)
        }
    }

    #[test]
    fn enrich_fails_when_any_step_fails() {
        assert_eq!(Canned.enrich("body"), Err(AiError::MissingApiKey));
    }
}
