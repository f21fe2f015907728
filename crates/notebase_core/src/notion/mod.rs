//! Notion workspace source and content mapping.
//!
//! # Responsibility
//! - Define the [`WorkspaceSource`] seam the importer reads from.
//! - Map Notion page/block JSON onto local titles, icons and block seeds.
//!
//! # Invariants
//! - Unsupported block types are skipped; kept blocks use their index in the
//!   fetched list as order key, so skips leave gaps.
//! - Mapping is lossy by design: only plain text survives.

pub mod client;

use crate::model::block::{BlockSeed, BlockType};
use crate::model::page::DEFAULT_PAGE_TITLE;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use client::NotionClient;

static PAGE_ID_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z]{32}$"));

/// Errors from workspace source calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    MissingApiKey,
    /// Upstream reports the object as missing or not shared.
    NotFound(String),
    /// Upstream answered with an error payload.
    Api {
        status: u16,
        code: String,
        message: String,
    },
    Transport(String),
    InvalidResponse(String),
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "workspace API key is not configured"),
            Self::NotFound(id) => write!(f, "workspace object not found: {id}"),
            Self::Api {
                status,
                code,
                message,
            } => write!(f, "workspace API error {status} ({code}): {message}"),
            Self::Transport(message) => write!(f, "workspace request failed: {message}"),
            Self::InvalidResponse(message) => {
                write!(f, "invalid workspace response: {message}")
            }
        }
    }
}

impl Error for SourceError {}

/// Page header fields read from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePage {
    pub id: String,
    pub title: String,
    pub icon: Option<String>,
}

impl SourcePage {
    /// Reads id, title and emoji icon from a Notion page object.
    pub fn from_json(page: &Value) -> Self {
        Self {
            id: page
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            title: page_title(page),
            icon: page_icon(page),
        }
    }
}

/// Read access to an external page and its top-level blocks.
pub trait WorkspaceSource: Send + Sync {
    fn fetch_page(&self, page_id: &str) -> Result<SourcePage, SourceError>;

    /// Returns all top-level child blocks, following pagination.
    fn fetch_child_blocks(&self, page_id: &str) -> Result<Vec<Value>, SourceError>;
}

/// Strips dashes and checks for a 32 character alphanumeric id.
pub fn normalize_page_id(raw: &str) -> Option<String> {
    let compact: String = raw.trim().chars().filter(|ch| *ch != '-').collect();
    let pattern = PAGE_ID_PATTERN.as_ref().ok()?;
    pattern.is_match(&compact).then_some(compact)
}

/// Concatenated `plain_text` of a rich text array.
pub fn rich_text_plain(rich_text: Option<&Value>) -> String {
    rich_text
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("plain_text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

/// Title from the first `title`-typed property; blank becomes `Untitled`.
pub fn page_title(page: &Value) -> String {
    let title = page
        .get("properties")
        .and_then(Value::as_object)
        .and_then(|properties| {
            properties
                .values()
                .find(|property| property.get("type").and_then(Value::as_str) == Some("title"))
        })
        .map(|property| rich_text_plain(property.get("title")))
        .unwrap_or_default();
    if title.trim().is_empty() {
        DEFAULT_PAGE_TITLE.to_string()
    } else {
        title
    }
}

/// Emoji icon, if the page has one. File and external icons are dropped.
pub fn page_icon(page: &Value) -> Option<String> {
    let icon = page.get("icon")?;
    if icon.get("type").and_then(Value::as_str) != Some("emoji") {
        return None;
    }
    icon.get("emoji").and_then(Value::as_str).map(str::to_string)
}

/// Local block type for a Notion block type tag.
pub fn map_block_type(notion_type: &str) -> Option<BlockType> {
    let mapped = match notion_type {
        "paragraph" => BlockType::Text,
        "heading_1" => BlockType::Heading1,
        "heading_2" => BlockType::Heading2,
        "heading_3" => BlockType::Heading3,
        "bulleted_list_item" => BlockType::BulletList,
        "numbered_list_item" => BlockType::NumberedList,
        "to_do" => BlockType::Todo,
        "code" => BlockType::Code,
        "quote" => BlockType::Quote,
        "divider" => BlockType::Divider,
        _ => return None,
    };
    Some(mapped)
}

/// Converts one Notion block; `None` for unsupported types.
pub fn convert_block(block: &Value, order: f64) -> Option<BlockSeed> {
    let notion_type = block.get("type").and_then(Value::as_str)?;
    let block_type = map_block_type(notion_type)?;
    let body = block.get(notion_type);
    let text = || rich_text_plain(body.and_then(|data| data.get("rich_text")));

    let content = match block_type {
        BlockType::Todo => {
            let checked = body
                .and_then(|data| data.get("checked"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            format!("[{}] {}", if checked { 'x' } else { ' ' }, text())
        }
        BlockType::Code => {
            let code = text();
            match body
                .and_then(|data| data.get("language"))
                .and_then(Value::as_str)
                .filter(|language| !language.is_empty())
            {
                Some(language) => format!("```{language}\n{code}\n```"),
                None => code,
            }
        }
        BlockType::Divider => "---".to_string(),
        _ => text(),
    };

    Some(BlockSeed {
        block_type,
        content: Some(content),
        order,
    })
}

/// Converts a fetched block list, keeping the source index as order key.
pub fn convert_blocks(blocks: &[Value]) -> Vec<BlockSeed> {
    blocks
        .iter()
        .enumerate()
        .filter_map(|(index, block)| convert_block(block, index as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_block(kind: &str, text: &str) -> Value {
        let mut block = json!({ "type": kind });
        block[kind] = json!({ "rich_text": [{ "plain_text": text }] });
        block
    }

    #[test]
    fn page_id_accepts_dashed_and_compact_forms() {
        let dashed = "1a2b3c4d-5e6f-7a8b-9c0d-1e2f3a4b5c6d";
        assert_eq!(
            normalize_page_id(dashed).as_deref(),
            Some("1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d")
        );
        assert!(normalize_page_id("short").is_none());
        assert!(normalize_page_id("1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6!").is_none());
    }

    #[test]
    fn title_comes_from_title_property() {
        let page = json!({
            "properties": {
                "Tags": { "type": "multi_select", "multi_select": [] },
                "Name": {
                    "type": "title",
                    "title": [{ "plain_text": "Road" }, { "plain_text": "map" }]
                }
            }
        });
        assert_eq!(page_title(&page), "Roadmap");
        assert_eq!(page_title(&json!({ "properties": {} })), DEFAULT_PAGE_TITLE);
    }

    #[test]
    fn only_emoji_icons_are_kept() {
        assert_eq!(
            page_icon(&json!({ "icon": { "type": "emoji", "emoji": "📘" } })).as_deref(),
            Some("📘")
        );
        assert!(page_icon(&json!({ "icon": { "type": "external", "external": {} } })).is_none());
        assert!(page_icon(&json!({ "icon": null })).is_none());
    }

    #[test]
    fn todo_and_code_blocks_get_markdown_content() {
        let todo = json!({
            "type": "to_do",
            "to_do": { "rich_text": [{ "plain_text": "ship" }], "checked": true }
        });
        let seed = convert_block(&todo, 0.0).unwrap();
        assert_eq!(seed.block_type, BlockType::Todo);
        assert_eq!(seed.content.as_deref(), Some("[x] ship"));

        let code = json!({
            "type": "code",
            "code": { "rich_text": [{ "plain_text": "fn main() {}" }], "language": "rust" }
        });
        assert_eq!(
            convert_block(&code, 0.0).unwrap().content.as_deref(),
            Some("```rust\nfn main() {}\n```")
        );
    }

    #[test]
    fn unsupported_blocks_are_skipped_leaving_order_gaps() {
        let blocks = vec![
            text_block("heading_1", "Intro"),
            json!({ "type": "image", "image": {} }),
            json!({ "type": "divider", "divider": {} }),
            text_block("bulleted_list_item", "point"),
        ];
        let seeds = convert_blocks(&blocks);
        let summary: Vec<(BlockType, f64)> = seeds
            .iter()
            .map(|seed| (seed.block_type.clone(), seed.order))
            .collect();
        assert_eq!(
            summary,
            vec![
                (BlockType::Heading1, 0.0),
                (BlockType::Divider, 2.0),
                (BlockType::BulletList, 3.0),
            ]
        );
        assert_eq!(seeds[1].content.as_deref(), Some("---"));
    }
}
