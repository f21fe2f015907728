//! Page tree use-case service.
//!
//! # Responsibility
//! - Validate page input and tree invariants above the repository layer.
//! - Provide page create, read, list, update and subtree delete.
//!
//! # Invariants
//! - A referenced parent must exist before anything is written.
//! - Reparenting must not create a cycle; self-parenting is rejected first.

use super::tree_integrity::would_create_cycle;
use super::ErrorKind;
use crate::model::block::Block;
use crate::model::page::{NewPage, Page, PageId, PagePatch, PageValidationError};
use crate::model::FieldUpdate;
use crate::repo::block_repo::BlockRepository;
use crate::repo::page_repo::{CascadeDeleteReport, PageFilter, PageRepository};
use crate::repo::RepoError;
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from page service operations.
#[derive(Debug)]
pub enum PageServiceError {
    InvalidInput(PageValidationError),
    PageNotFound(PageId),
    ParentNotFound(PageId),
    /// Page was given itself as parent.
    SelfParent(PageId),
    /// Parent lies inside the page's own subtree.
    CycleDetected { page_id: PageId, parent_id: PageId },
    Repo(RepoError),
}

impl PageServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::PageNotFound(_) | Self::ParentNotFound(_) => ErrorKind::NotFound,
            Self::SelfParent(_) | Self::CycleDetected { .. } => ErrorKind::InvalidReference,
            Self::Repo(_) => ErrorKind::Unexpected,
        }
    }
}

impl Display for PageServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::PageNotFound(id) => write!(f, "page not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent page not found: {id}"),
            Self::SelfParent(id) => write!(f, "page cannot be its own parent: {id}"),
            Self::CycleDetected { page_id, parent_id } => write!(
                f,
                "moving page {page_id} under {parent_id} would create a cycle"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PageServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PageServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::PageNotFound(page_id) => Self::PageNotFound(page_id),
            other => Self::Repo(other),
        }
    }
}

impl From<PageValidationError> for PageServiceError {
    fn from(value: PageValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

/// Page read model together with its ordered blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageWithBlocks {
    #[serde(flatten)]
    pub page: Page,
    pub blocks: Vec<Block>,
}

/// Page tree service facade.
pub struct PageService<P: PageRepository, B: BlockRepository> {
    pages: P,
    blocks: B,
}

impl<P: PageRepository, B: BlockRepository> PageService<P, B> {
    /// Creates service from repository implementations.
    pub fn new(pages: P, blocks: B) -> Self {
        Self { pages, blocks }
    }

    /// Creates one page under an optional parent.
    pub fn create_page(&self, page: NewPage) -> Result<Page, PageServiceError> {
        let normalized = page.normalized()?;
        if let Some(parent_id) = normalized.parent_id {
            self.ensure_parent_exists(parent_id)?;
        }
        let created = self.pages.create_page(&normalized)?;
        info!(
            "event=page_create module=page_service status=ok page_id={} has_parent={}",
            created.id,
            created.parent_id.is_some()
        );
        Ok(created)
    }

    pub fn get_page(&self, page_id: PageId) -> Result<Page, PageServiceError> {
        self.pages
            .get_page(page_id)?
            .ok_or(PageServiceError::PageNotFound(page_id))
    }

    /// Loads one page with its blocks in display order.
    pub fn get_page_with_blocks(&self, page_id: PageId) -> Result<PageWithBlocks, PageServiceError> {
        let page = self.get_page(page_id)?;
        let blocks = self.blocks.list_blocks(page_id)?;
        Ok(PageWithBlocks { page, blocks })
    }

    /// Lists pages, optionally restricted to the children of one parent.
    pub fn list_pages(&self, filter: PageFilter) -> Result<Vec<Page>, PageServiceError> {
        self.pages.list_pages(filter).map_err(Into::into)
    }

    /// Applies a partial update. Existence, parent and cycle checks run in the
    /// same transaction as the write.
    pub fn update_page(&self, page_id: PageId, patch: PagePatch) -> Result<Page, PageServiceError> {
        let normalized = patch.normalized()?;
        let updated = self
            .pages
            .in_write_transaction(|| self.checked_update(page_id, &normalized))?;
        info!(
            "event=page_update module=page_service status=ok page_id={} parent_changed={}",
            page_id,
            !normalized.parent_id.is_keep()
        );
        Ok(updated)
    }

    /// Deletes a page with all descendant pages and their blocks.
    pub fn delete_page(&self, page_id: PageId) -> Result<CascadeDeleteReport, PageServiceError> {
        let report = self.pages.delete_page_cascade(page_id)?;
        info!(
            "event=page_delete module=page_service status=ok page_id={} pages={} blocks={}",
            page_id, report.pages, report.blocks
        );
        Ok(report)
    }

    fn checked_update(&self, page_id: PageId, patch: &PagePatch) -> Result<Page, PageServiceError> {
        if !self.pages.page_exists(page_id)? {
            return Err(PageServiceError::PageNotFound(page_id));
        }

        if let FieldUpdate::Set(parent_id) = patch.parent_id {
            if parent_id == page_id {
                return Err(PageServiceError::SelfParent(page_id));
            }
            self.ensure_parent_exists(parent_id)?;
            if would_create_cycle(&self.pages, page_id, Some(parent_id))? {
                return Err(PageServiceError::CycleDetected { page_id, parent_id });
            }
        }

        self.pages
            .update_page(page_id, patch)
            .map_err(Into::into)
    }

    fn ensure_parent_exists(&self, parent_id: PageId) -> Result<(), PageServiceError> {
        if self.pages.page_exists(parent_id)? {
            Ok(())
        } else {
            Err(PageServiceError::ParentNotFound(parent_id))
        }
    }
}
