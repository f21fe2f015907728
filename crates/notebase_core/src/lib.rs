//! Core domain logic for notebase, a personal knowledge base.
//! This crate is the single source of truth for page tree, block ordering
//! and memo invariants.

pub mod ai;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notion;
pub mod repo;
pub mod service;

pub use ai::{AiError, AnthropicEnricher, MemoEnricher, MemoEnrichment};
pub use config::{ConfigError, Settings};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::block::{Block, BlockId, BlockPatch, BlockSeed, BlockType, NewBlock};
pub use model::memo::{Memo, MemoId, MemoPatch, NewMemo};
pub use model::page::{NewPage, Page, PageId, PagePatch};
pub use model::FieldUpdate;
pub use notion::{NotionClient, SourceError, SourcePage, WorkspaceSource};
pub use repo::block_repo::{BlockRepository, SqliteBlockRepository};
pub use repo::memo_repo::{MemoRepository, SqliteMemoRepository};
pub use repo::page_repo::{CascadeDeleteReport, PageFilter, PageRepository, SqlitePageRepository};
pub use repo::{RepoError, RepoResult};
pub use service::block_service::{BlockService, BlockServiceError};
pub use service::import_service::{
    FetchedImport, ImportError, ImportFetcher, ImportOutcome, ImportRequest, ImportService,
};
pub use service::memo_service::{MemoService, MemoServiceError};
pub use service::page_service::{PageService, PageServiceError, PageWithBlocks};
pub use service::ErrorKind;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
