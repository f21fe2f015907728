//! Memo domain model.
//!
//! Memos live outside the page tree. `ai_summary` and `tags` are filled by
//! best-effort enrichment and stay `None` when it did not run or failed.

use super::char_len;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable memo identifier.
pub type MemoId = Uuid;

pub const MEMO_TITLE_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub id: MemoId,
    pub title: String,
    pub content: String,
    pub ai_summary: Option<String>,
    pub tags: Option<Vec<String>>,
    pub user_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Memo {
    /// Case-insensitive substring match over title, content, summary and
    /// tags. `needle_lower` must already be lowercased.
    pub fn matches_text(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.content.to_lowercase().contains(needle_lower)
            || self
                .ai_summary
                .as_ref()
                .is_some_and(|summary| summary.to_lowercase().contains(needle_lower))
            || self.has_tag_matching(needle_lower)
    }

    /// Case-insensitive substring match against any tag.
    pub fn has_tag_matching(&self, needle_lower: &str) -> bool {
        self.tags.as_ref().is_some_and(|tags| {
            tags.iter()
                .any(|tag| tag.to_lowercase().contains(needle_lower))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMemo {
    pub title: String,
    pub content: String,
    pub user_id: Option<i64>,
}

impl NewMemo {
    pub fn normalized(&self) -> Result<Self, MemoValidationError> {
        Ok(Self {
            title: normalize_title(&self.title)?,
            content: validate_content(&self.content)?,
            user_id: self.user_id,
        })
    }
}

/// Partial memo update. AI fields are not part of user edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl MemoPatch {
    pub fn normalized(&self) -> Result<Self, MemoValidationError> {
        Ok(Self {
            title: self.title.as_deref().map(normalize_title).transpose()?,
            content: self.content.as_deref().map(validate_content).transpose()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoValidationError {
    BlankTitle,
    TitleTooLong { max_chars: usize },
    BlankContent,
}

impl Display for MemoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "memo title must not be blank"),
            Self::TitleTooLong { max_chars } => {
                write!(f, "memo title must be at most {max_chars} characters")
            }
            Self::BlankContent => write!(f, "memo content must not be blank"),
        }
    }
}

impl Error for MemoValidationError {}

fn normalize_title(value: &str) -> Result<String, MemoValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MemoValidationError::BlankTitle);
    }
    if char_len(trimmed) > MEMO_TITLE_MAX_CHARS {
        return Err(MemoValidationError::TitleTooLong {
            max_chars: MEMO_TITLE_MAX_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

// Content keeps its original whitespace; only all-blank bodies are refused.
fn validate_content(value: &str) -> Result<String, MemoValidationError> {
    if value.trim().is_empty() {
        return Err(MemoValidationError::BlankContent);
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memo_with_tags(tags: Option<Vec<&str>>) -> Memo {
        Memo {
            id: Uuid::nil(),
            title: "t".to_string(),
            content: "c".to_string(),
            ai_summary: None,
            tags: tags.map(|items| items.into_iter().map(str::to_string).collect()),
            user_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn tag_match_is_case_insensitive_substring() {
        let memo = memo_with_tags(Some(vec!["Rust", "Databases"]));
        assert!(memo.has_tag_matching("data"));
        assert!(memo.has_tag_matching("rust"));
        assert!(!memo.has_tag_matching("python"));
        assert!(!memo_with_tags(None).has_tag_matching("rust"));
    }

    #[test]
    fn text_match_folds_non_ascii_case() {
        let mut memo = memo_with_tags(Some(vec!["Straße"]));
        memo.title = "Über Rust".to_string();
        assert!(memo.matches_text(&"ÜBER".to_lowercase()));
        assert!(memo.matches_text("straße"));
        assert!(!memo.matches_text("\""));
        assert!(!memo.matches_text(","));
    }

    #[test]
    fn new_memo_trims_title_but_keeps_content() {
        let memo = NewMemo {
            title: "  Groceries ".to_string(),
            content: "  milk\n".to_string(),
            user_id: None,
        }
        .normalized()
        .unwrap();
        assert_eq!(memo.title, "Groceries");
        assert_eq!(memo.content, "  milk\n");
    }

    #[test]
    fn patch_rejects_blank_content() {
        let patch = MemoPatch {
            title: None,
            content: Some("\n\t".to_string()),
        };
        assert_eq!(
            patch.normalized().unwrap_err(),
            MemoValidationError::BlankContent
        );
    }
}
