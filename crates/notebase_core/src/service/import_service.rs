//! Import of external workspace pages into the local page tree.
//!
//! # Responsibility
//! - Fetch one external page with its top-level blocks and store it as a
//!   local page with ordered blocks.
//! - Keep the upstream half ([`ImportFetcher`]) free of storage handles so
//!   callers can run it without holding a connection.
//!
//! # Invariants
//! - A missing source is reported before a malformed id.
//! - Everything is fetched before the first write, so an upstream failure
//!   leaves the store untouched.
//! - Page and blocks are inserted in one transaction that re-checks the parent.

use super::ErrorKind;
use crate::model::block::BlockSeed;
use crate::model::char_len;
use crate::model::page::{
    NewPage, PageId, DEFAULT_PAGE_TITLE, PAGE_ICON_MAX_CHARS, PAGE_TITLE_MAX_CHARS,
};
use crate::notion::{convert_blocks, normalize_page_id, SourceError, WorkspaceSource};
use crate::repo::page_repo::PageRepository;
use crate::repo::RepoError;
use log::{error, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Import input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub external_page_id: String,
    pub parent_id: Option<PageId>,
}

/// Summary of a finished import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub page_id: PageId,
    pub blocks_count: usize,
    pub external_page_id: String,
    pub title: String,
    pub icon: Option<String>,
}

/// Errors from import operations.
#[derive(Debug)]
pub enum ImportError {
    /// External id is not a 32 character alphanumeric id.
    InvalidPageId(String),
    /// No workspace source is configured.
    AuthMissing,
    UpstreamNotFound(String),
    Upstream(SourceError),
    ParentNotFound(PageId),
    Repo(RepoError),
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPageId(_) => ErrorKind::InvalidInput,
            Self::AuthMissing => ErrorKind::UpstreamAuthMissing,
            Self::UpstreamNotFound(_) => ErrorKind::UpstreamNotFound,
            Self::Upstream(_) => ErrorKind::UpstreamFailure,
            Self::ParentNotFound(_) => ErrorKind::NotFound,
            Self::Repo(_) => ErrorKind::Unexpected,
        }
    }
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPageId(id) => {
                write!(f, "external page id must be 32 alphanumeric characters: {id}")
            }
            Self::AuthMissing => write!(f, "Notion API key is not configured"),
            Self::UpstreamNotFound(id) => write!(f, "Notion page not found: {id}"),
            Self::Upstream(err) => write!(f, "{err}"),
            Self::ParentNotFound(id) => write!(f, "parent page not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Upstream(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ImportError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::PageNotFound(page_id) => Self::ParentNotFound(page_id),
            other => Self::Repo(other),
        }
    }
}

impl From<SourceError> for ImportError {
    fn from(value: SourceError) -> Self {
        match value {
            SourceError::MissingApiKey => Self::AuthMissing,
            SourceError::NotFound(id) => Self::UpstreamNotFound(id),
            other => Self::Upstream(other),
        }
    }
}

/// Page and blocks fetched from the source, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedImport {
    pub external_page_id: String,
    pub page: NewPage,
    pub blocks: Vec<BlockSeed>,
    /// Upstream blocks with no local mapping.
    pub skipped: usize,
}

/// Upstream half of an import.
pub struct ImportFetcher<'s> {
    source: Option<&'s dyn WorkspaceSource>,
}

impl<'s> ImportFetcher<'s> {
    /// `source` is `None` when no API key is configured.
    pub fn new(source: Option<&'s dyn WorkspaceSource>) -> Self {
        Self { source }
    }

    /// Returns the normalized external id.
    pub fn validate(&self, request: &ImportRequest) -> Result<String, ImportError> {
        if self.source.is_none() {
            return Err(ImportError::AuthMissing);
        }
        normalize_page_id(&request.external_page_id)
            .ok_or_else(|| ImportError::InvalidPageId(request.external_page_id.clone()))
    }

    pub fn fetch(&self, request: &ImportRequest) -> Result<FetchedImport, ImportError> {
        let external_id = self.validate(request)?;
        let source = self.source.ok_or(ImportError::AuthMissing)?;

        let page = source.fetch_page(&external_id).map_err(|err| {
            log_upstream_failure("fetch_page", &err);
            ImportError::from(err)
        })?;

        // A missing page here is still an upstream failure, not a 404.
        let raw_blocks = source.fetch_child_blocks(&external_id).map_err(|err| {
            log_upstream_failure("fetch_blocks", &err);
            match err {
                SourceError::MissingApiKey => ImportError::AuthMissing,
                other => ImportError::Upstream(other),
            }
        })?;
        let blocks = convert_blocks(&raw_blocks);

        let icon = page
            .icon
            .map(|icon| icon.trim().to_string())
            .filter(|icon| !icon.is_empty() && char_len(icon) <= PAGE_ICON_MAX_CHARS);
        Ok(FetchedImport {
            external_page_id: external_id,
            page: NewPage {
                title: Some(clamp_title(&page.title)),
                icon,
                parent_id: request.parent_id,
                user_id: None,
            },
            skipped: raw_blocks.len() - blocks.len(),
            blocks,
        })
    }
}

/// Storage half of an import.
pub struct ImportService<P: PageRepository> {
    pages: P,
}

impl<P: PageRepository> ImportService<P> {
    pub fn new(pages: P) -> Self {
        Self { pages }
    }

    /// Validates, checks the parent, fetches, then stores.
    pub fn import_page(
        &self,
        fetcher: &ImportFetcher<'_>,
        request: ImportRequest,
    ) -> Result<ImportOutcome, ImportError> {
        fetcher.validate(&request)?;
        self.check_parent(request.parent_id)?;
        let fetched = fetcher.fetch(&request)?;
        self.store(fetched)
    }

    pub fn check_parent(&self, parent_id: Option<PageId>) -> Result<(), ImportError> {
        if let Some(parent_id) = parent_id {
            if !self.pages.page_exists(parent_id)? {
                return Err(ImportError::ParentNotFound(parent_id));
            }
        }
        Ok(())
    }

    /// Inserts the page and its blocks in one transaction.
    pub fn store(&self, fetched: FetchedImport) -> Result<ImportOutcome, ImportError> {
        let created = self
            .pages
            .create_page_with_blocks(&fetched.page, &fetched.blocks)?;

        info!(
            "event=import_page module=import_service status=ok page_id={} blocks={} skipped={}",
            created.id,
            fetched.blocks.len(),
            fetched.skipped
        );
        Ok(ImportOutcome {
            page_id: created.id,
            blocks_count: fetched.blocks.len(),
            external_page_id: fetched.external_page_id,
            title: created.title,
            icon: created.icon,
        })
    }
}

fn clamp_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return DEFAULT_PAGE_TITLE.to_string();
    }
    if char_len(trimmed) <= PAGE_TITLE_MAX_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().take(PAGE_TITLE_MAX_CHARS).collect()
}

fn log_upstream_failure(stage: &str, err: &SourceError) {
    error!("event=import_page module=import_service status=error stage={stage} error={err}");
}
