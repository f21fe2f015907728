//! Block domain model.
//!
//! # Responsibility
//! - Define ordered content units owned by exactly one page.
//! - Provide the open-ended block type tag.
//!
//! # Invariants
//! - `page_id` is fixed at creation time.
//! - `order` is always a finite number; duplicates are allowed.

use super::page::PageId;
use super::{char_len, FieldUpdate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable block identifier.
pub type BlockId = Uuid;

pub const BLOCK_TYPE_MAX_CHARS: usize = 50;

/// Order key given to blocks created without an explicit one.
pub const DEFAULT_BLOCK_ORDER: f64 = 0.0;

/// Block type tag.
///
/// Known editor types get their own variant; any other non-blank tag is kept
/// verbatim in `Other` so clients can introduce new types without a schema
/// change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BlockType {
    Text,
    Heading1,
    Heading2,
    Heading3,
    BulletList,
    NumberedList,
    Todo,
    Code,
    Quote,
    Divider,
    Other(String),
}

impl BlockType {
    /// Parses a stored or user-supplied tag.
    pub fn parse(value: &str) -> Result<Self, BlockValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(BlockValidationError::BlankType);
        }
        if char_len(trimmed) > BLOCK_TYPE_MAX_CHARS {
            return Err(BlockValidationError::TypeTooLong {
                max_chars: BLOCK_TYPE_MAX_CHARS,
            });
        }
        Ok(match trimmed {
            "text" => Self::Text,
            "heading1" => Self::Heading1,
            "heading2" => Self::Heading2,
            "heading3" => Self::Heading3,
            "bullet_list" => Self::BulletList,
            "numbered_list" => Self::NumberedList,
            "todo" => Self::Todo,
            "code" => Self::Code,
            "quote" => Self::Quote,
            "divider" => Self::Divider,
            other => Self::Other(other.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Heading1 => "heading1",
            Self::Heading2 => "heading2",
            Self::Heading3 => "heading3",
            Self::BulletList => "bullet_list",
            Self::NumberedList => "numbered_list",
            Self::Todo => "todo",
            Self::Code => "code",
            Self::Quote => "quote",
            Self::Divider => "divider",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

impl Display for BlockType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for BlockType {
    type Error = BlockValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BlockType> for String {
    fn from(value: BlockType) -> Self {
        match value {
            BlockType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// Persisted block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub page_id: PageId,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    /// Free-form body; format depends on `block_type`.
    pub content: Option<String>,
    /// Sort key among the page's blocks.
    pub order: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for block creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBlock {
    pub page_id: PageId,
    pub block_type: BlockType,
    pub content: Option<String>,
    /// `None` means the default order key.
    pub order: Option<f64>,
}

/// Block body without identity, used for bulk inserts such as imports.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSeed {
    pub block_type: BlockType,
    pub content: Option<String>,
    pub order: f64,
}

/// Partial block update. Blocks never move between pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockPatch {
    pub block_type: Option<BlockType>,
    pub content: FieldUpdate<String>,
    pub order: Option<f64>,
}

/// Field-level validation failures for block input.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockValidationError {
    BlankType,
    TypeTooLong { max_chars: usize },
    NonFiniteOrder(f64),
}

impl Display for BlockValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankType => write!(f, "block type must not be blank"),
            Self::TypeTooLong { max_chars } => {
                write!(f, "block type must be at most {max_chars} characters")
            }
            Self::NonFiniteOrder(value) => {
                write!(f, "block order must be a finite number, got {value}")
            }
        }
    }
}

impl Error for BlockValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_parse_to_variants_and_back() {
        for tag in [
            "text",
            "heading1",
            "heading2",
            "heading3",
            "bullet_list",
            "numbered_list",
            "todo",
            "code",
            "quote",
            "divider",
        ] {
            let parsed = BlockType::parse(tag).unwrap();
            assert!(!matches!(parsed, BlockType::Other(_)), "{tag}");
            assert_eq!(parsed.as_str(), tag);
        }
    }

    #[test]
    fn unknown_tags_are_kept_verbatim() {
        let parsed = BlockType::parse(" callout ").unwrap();
        assert_eq!(parsed, BlockType::Other("callout".to_string()));
        assert_eq!(String::from(parsed), "callout");
    }

    #[test]
    fn blank_and_oversized_tags_are_rejected() {
        assert_eq!(BlockType::parse("  "), Err(BlockValidationError::BlankType));
        assert!(matches!(
            BlockType::parse(&"t".repeat(BLOCK_TYPE_MAX_CHARS + 1)),
            Err(BlockValidationError::TypeTooLong { .. })
        ));
    }

    #[test]
    fn block_serializes_type_field_as_plain_string() {
        let block = Block {
            id: Uuid::nil(),
            page_id: Uuid::nil(),
            block_type: BlockType::Heading2,
            content: Some("Intro".to_string()),
            order: 1.5,
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "heading2");
        assert_eq!(json["order"], 1.5);
    }
}
