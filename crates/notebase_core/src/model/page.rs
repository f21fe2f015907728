//! Page domain model.
//!
//! # Responsibility
//! - Define the page record that forms the user's document hierarchy.
//! - Normalize and validate user-supplied title/icon values.
//!
//! # Invariants
//! - `parent_id` graph over all pages is an acyclic forest.
//! - `title` is never blank once persisted; it defaults to `Untitled`.

use super::{char_len, FieldUpdate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable page identifier.
pub type PageId = Uuid;

pub const DEFAULT_PAGE_TITLE: &str = "Untitled";
pub const PAGE_TITLE_MAX_CHARS: usize = 500;
pub const PAGE_ICON_MAX_CHARS: usize = 10;

/// Persisted page node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub title: String,
    /// Short glyph, usually a single emoji.
    pub icon: Option<String>,
    /// `None` means the page is a root.
    pub parent_id: Option<PageId>,
    /// Owner reference; not enforced.
    pub user_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for page creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPage {
    /// `None` or blank falls back to [`DEFAULT_PAGE_TITLE`].
    pub title: Option<String>,
    pub icon: Option<String>,
    pub parent_id: Option<PageId>,
    pub user_id: Option<i64>,
}

impl NewPage {
    /// Returns a copy with normalized title/icon, or the first violated rule.
    pub fn normalized(&self) -> Result<Self, PageValidationError> {
        let title = match self.title.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_PAGE_TITLE.to_string(),
            Some(title) => normalize_title(title)?,
        };
        let icon = self.icon.as_deref().map(normalize_icon).transpose()?.flatten();
        Ok(Self {
            title: Some(title),
            icon,
            parent_id: self.parent_id,
            user_id: self.user_id,
        })
    }
}

/// Partial page update. Only non-`Keep` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagePatch {
    pub title: Option<String>,
    pub icon: FieldUpdate<String>,
    pub parent_id: FieldUpdate<PageId>,
}

impl PagePatch {
    /// Returns a copy with normalized title/icon, or the first violated rule.
    ///
    /// Unlike creation, an explicit blank title is rejected rather than
    /// defaulted.
    pub fn normalized(&self) -> Result<Self, PageValidationError> {
        let title = self.title.as_deref().map(normalize_title).transpose()?;
        let icon = match &self.icon {
            FieldUpdate::Keep => FieldUpdate::Keep,
            FieldUpdate::Clear => FieldUpdate::Clear,
            FieldUpdate::Set(value) => match normalize_icon(value)? {
                Some(icon) => FieldUpdate::Set(icon),
                None => FieldUpdate::Clear,
            },
        };
        Ok(Self {
            title,
            icon,
            parent_id: self.parent_id.clone(),
        })
    }
}

/// Field-level validation failures for page input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageValidationError {
    BlankTitle,
    TitleTooLong { max_chars: usize },
    IconTooLong { max_chars: usize },
}

impl Display for PageValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "page title must not be blank"),
            Self::TitleTooLong { max_chars } => {
                write!(f, "page title must be at most {max_chars} characters")
            }
            Self::IconTooLong { max_chars } => {
                write!(f, "page icon must be at most {max_chars} characters")
            }
        }
    }
}

impl Error for PageValidationError {}

fn normalize_title(value: &str) -> Result<String, PageValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PageValidationError::BlankTitle);
    }
    if char_len(trimmed) > PAGE_TITLE_MAX_CHARS {
        return Err(PageValidationError::TitleTooLong {
            max_chars: PAGE_TITLE_MAX_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

/// Blank icons normalize to "no icon".
fn normalize_icon(value: &str) -> Result<Option<String>, PageValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if char_len(trimmed) > PAGE_ICON_MAX_CHARS {
        return Err(PageValidationError::IconTooLong {
            max_chars: PAGE_ICON_MAX_CHARS,
        });
    }
    Ok(Some(trimmed.to_string()))
}
