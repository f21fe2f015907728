//! Block use-case service.
//!
//! # Responsibility
//! - Validate block input and page ownership.
//! - Expose single-block reorder and explicit per-page rebalance.
//! - Warn when a reorder leaves a block with no key room next to a neighbour.
//!
//! # Invariants
//! - Blocks are only created on existing pages and never change page.
//! - Order keys written through this service are finite.

use super::block_order::{has_exhausted_gap, is_crowded, rebalanced_orders, validate_order};
use super::ErrorKind;
use crate::model::block::{Block, BlockId, BlockPatch, BlockValidationError, NewBlock};
use crate::model::page::PageId;
use crate::repo::block_repo::BlockRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from block service operations.
#[derive(Debug)]
pub enum BlockServiceError {
    InvalidInput(BlockValidationError),
    PageNotFound(PageId),
    BlockNotFound(BlockId),
    Repo(RepoError),
}

impl BlockServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::PageNotFound(_) | Self::BlockNotFound(_) => ErrorKind::NotFound,
            Self::Repo(_) => ErrorKind::Unexpected,
        }
    }
}

impl Display for BlockServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::PageNotFound(id) => write!(f, "page not found: {id}"),
            Self::BlockNotFound(id) => write!(f, "block not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BlockServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BlockServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::PageNotFound(page_id) => Self::PageNotFound(page_id),
            RepoError::BlockNotFound(block_id) => Self::BlockNotFound(block_id),
            other => Self::Repo(other),
        }
    }
}

impl From<BlockValidationError> for BlockServiceError {
    fn from(value: BlockValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

/// Block service facade.
pub struct BlockService<R: BlockRepository> {
    repo: R,
}

impl<R: BlockRepository> BlockService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Adds a block to an existing page. A missing order means the default key.
    pub fn create_block(&self, block: NewBlock) -> Result<Block, BlockServiceError> {
        if let Some(order) = block.order {
            validate_order(order)?;
        }
        if !self.repo.page_exists(block.page_id)? {
            return Err(BlockServiceError::PageNotFound(block.page_id));
        }
        let created = self.repo.create_block(&block)?;
        info!(
            "event=block_create module=block_service status=ok block_id={} page_id={} type={}",
            created.id, created.page_id, created.block_type
        );
        Ok(created)
    }

    pub fn get_block(&self, block_id: BlockId) -> Result<Block, BlockServiceError> {
        self.repo
            .get_block(block_id)?
            .ok_or(BlockServiceError::BlockNotFound(block_id))
    }

    /// Lists a page's blocks in display order.
    pub fn list_blocks(&self, page_id: PageId) -> Result<Vec<Block>, BlockServiceError> {
        if !self.repo.page_exists(page_id)? {
            return Err(BlockServiceError::PageNotFound(page_id));
        }
        self.repo.list_blocks(page_id).map_err(Into::into)
    }

    pub fn update_block(
        &self,
        block_id: BlockId,
        patch: BlockPatch,
    ) -> Result<Block, BlockServiceError> {
        if let Some(order) = patch.order {
            validate_order(order)?;
        }
        self.repo.update_block(block_id, &patch).map_err(Into::into)
    }

    /// Moves one block by writing its order key; siblings stay untouched.
    pub fn reorder_block(
        &self,
        block_id: BlockId,
        new_order: f64,
    ) -> Result<Block, BlockServiceError> {
        let new_order = validate_order(new_order)?;
        let block = self.repo.set_block_order(block_id, new_order)?;
        info!(
            "event=block_reorder module=block_service status=ok block_id={} page_id={}",
            block.id, block.page_id
        );

        let siblings = self.repo.list_blocks(block.page_id)?;
        if is_crowded(&siblings, block.id) {
            warn!(
                "event=block_reorder module=block_service status=needs_rebalance block_id={} page_id={}",
                block.id, block.page_id
            );
        }
        Ok(block)
    }

    /// Whether two adjacent blocks on the page leave no room for a key
    /// between them.
    pub fn page_needs_rebalance(&self, page_id: PageId) -> Result<bool, BlockServiceError> {
        let blocks = self.list_blocks(page_id)?;
        Ok(has_exhausted_gap(&blocks))
    }

    pub fn delete_block(&self, block_id: BlockId) -> Result<(), BlockServiceError> {
        self.repo.delete_block(block_id)?;
        info!("event=block_delete module=block_service status=ok block_id={block_id}");
        Ok(())
    }

    /// Renumbers a page's blocks to `1.0, 2.0, ...` keeping display order.
    pub fn rebalance_page(&self, page_id: PageId) -> Result<Vec<Block>, BlockServiceError> {
        let current = self.list_blocks(page_id)?;
        let orders = rebalanced_orders(&current);
        self.repo.rewrite_orders(page_id, &orders)?;
        info!(
            "event=block_rebalance module=block_service status=ok page_id={} blocks={}",
            page_id,
            orders.len()
        );
        self.repo.list_blocks(page_id).map_err(Into::into)
    }
}
