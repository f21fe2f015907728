//! Memo use-case service.
//!
//! # Responsibility
//! - Provide memo CRUD, pagination and text search.
//! - Run AI enrichment after a memo is committed.
//! - Expose the store, enrich and persist steps separately so callers that
//!   share one connection can run the AI call without holding it.
//!
//! # Invariants
//! - Memo creation never fails because of enrichment; failures are logged
//!   and the memo keeps empty AI fields.
//! - Explicit regeneration surfaces enrichment failures to the caller.

use super::ErrorKind;
use crate::ai::{AiError, MemoEnricher, MemoEnrichment};
use crate::model::memo::{Memo, MemoId, MemoPatch, MemoValidationError, NewMemo};
use crate::repo::memo_repo::{MemoListQuery, MemoRepository};
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_MEMO_PAGE_SIZE: u32 = 100;
pub const MAX_MEMO_PAGE_SIZE: u32 = 100;

/// Errors from memo service operations.
#[derive(Debug)]
pub enum MemoServiceError {
    InvalidInput(MemoValidationError),
    /// Pagination or search parameters are out of range.
    InvalidQuery(String),
    MemoNotFound(MemoId),
    /// No enricher is configured.
    AiUnavailable,
    AiFailed(AiError),
    Repo(RepoError),
}

impl MemoServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::InvalidQuery(_) => ErrorKind::InvalidInput,
            Self::MemoNotFound(_) => ErrorKind::NotFound,
            Self::AiUnavailable | Self::AiFailed(_) => ErrorKind::AiUnavailable,
            Self::Repo(_) => ErrorKind::Unexpected,
        }
    }
}

impl Display for MemoServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::InvalidQuery(message) => write!(f, "{message}"),
            Self::MemoNotFound(id) => write!(f, "memo not found: {id}"),
            Self::AiUnavailable => write!(f, "AI enrichment is not configured"),
            Self::AiFailed(err) => write!(f, "AI enrichment failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MemoServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::AiFailed(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for MemoServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::MemoNotFound(memo_id) => Self::MemoNotFound(memo_id),
            other => Self::Repo(other),
        }
    }
}

impl From<MemoValidationError> for MemoServiceError {
    fn from(value: MemoValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

/// Memo service facade.
pub struct MemoService<'e, R: MemoRepository> {
    repo: R,
    enricher: Option<&'e dyn MemoEnricher>,
}

impl<'e, R: MemoRepository> MemoService<'e, R> {
    /// Creates service; `enricher` is `None` when AI is not configured.
    pub fn new(repo: R, enricher: Option<&'e dyn MemoEnricher>) -> Self {
        Self { repo, enricher }
    }

    /// Newest memos first. `skip` defaults to 0, `limit` to 100 (max 100).
    pub fn list_memos(
        &self,
        skip: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Memo>, MemoServiceError> {
        let skip = match skip {
            None => 0,
            Some(value) => u32::try_from(value).map_err(|_| {
                MemoServiceError::InvalidQuery("skip must be a non-negative integer".to_string())
            })?,
        };
        let limit = match limit {
            None => DEFAULT_MEMO_PAGE_SIZE,
            Some(value) => u32::try_from(value)
                .ok()
                .filter(|limit| (1..=MAX_MEMO_PAGE_SIZE).contains(limit))
                .ok_or_else(|| {
                    MemoServiceError::InvalidQuery(format!(
                        "limit must be between 1 and {MAX_MEMO_PAGE_SIZE}"
                    ))
                })?,
        };
        self.repo
            .list_memos(MemoListQuery { skip, limit })
            .map_err(Into::into)
    }

    /// Case-insensitive search; memos whose tags match come first.
    pub fn search_memos(&self, query: &str) -> Result<Vec<Memo>, MemoServiceError> {
        let needle = query.trim();
        if needle.is_empty() {
            return Err(MemoServiceError::InvalidQuery(
                "search query must not be blank".to_string(),
            ));
        }

        let needle_lower = needle.to_lowercase();
        let (tag_hits, other_hits): (Vec<Memo>, Vec<Memo>) = self
            .repo
            .search_memos(needle)?
            .into_iter()
            .partition(|memo| memo.has_tag_matching(&needle_lower));
        Ok(tag_hits.into_iter().chain(other_hits).collect())
    }

    pub fn get_memo(&self, memo_id: MemoId) -> Result<Memo, MemoServiceError> {
        self.repo
            .get_memo(memo_id)?
            .ok_or(MemoServiceError::MemoNotFound(memo_id))
    }

    /// Stores the memo, then tries to attach summary and tags.
    pub fn create_memo(&self, memo: NewMemo) -> Result<Memo, MemoServiceError> {
        let created = self.store_memo(memo)?;
        Ok(self.enrich_best_effort(created))
    }

    /// Validates and stores the memo without enrichment.
    pub fn store_memo(&self, memo: NewMemo) -> Result<Memo, MemoServiceError> {
        let normalized = memo.normalized()?;
        let created = self.repo.create_memo(&normalized)?;
        info!(
            "event=memo_create module=memo_service status=ok memo_id={}",
            created.id
        );
        Ok(created)
    }

    pub fn update_memo(
        &self,
        memo_id: MemoId,
        patch: MemoPatch,
    ) -> Result<Memo, MemoServiceError> {
        let normalized = patch.normalized()?;
        self.repo
            .update_memo(memo_id, &normalized)
            .map_err(Into::into)
    }

    pub fn delete_memo(&self, memo_id: MemoId) -> Result<(), MemoServiceError> {
        self.repo.delete_memo(memo_id)?;
        info!("event=memo_delete module=memo_service status=ok memo_id={memo_id}");
        Ok(())
    }

    /// Recomputes summary and tags from the current content.
    pub fn regenerate_ai(&self, memo_id: MemoId) -> Result<Memo, MemoServiceError> {
        let memo = self.get_memo(memo_id)?;
        let enricher = self.enricher.ok_or(MemoServiceError::AiUnavailable)?;
        let enrichment = enricher
            .enrich(&memo.content)
            .map_err(MemoServiceError::AiFailed)?;
        self.save_enrichment(memo_id, &enrichment)
    }

    /// Overwrites both AI fields of an existing memo.
    pub fn save_enrichment(
        &self,
        memo_id: MemoId,
        enrichment: &MemoEnrichment,
    ) -> Result<Memo, MemoServiceError> {
        let updated = self.repo.set_ai_fields(
            memo_id,
            Some(enrichment.summary.as_str()),
            Some(enrichment.tags.as_slice()),
        )?;
        info!(
            "event=memo_enrich module=memo_service status=ok memo_id={} tags={}",
            memo_id,
            enrichment.tags.len()
        );
        Ok(updated)
    }

    /// Persists an enrichment outcome computed elsewhere. Failures are logged
    /// and the memo is returned as stored.
    pub fn attach_enrichment(&self, memo: Memo, outcome: Result<MemoEnrichment, AiError>) -> Memo {
        let enrichment = match outcome {
            Ok(enrichment) => enrichment,
            Err(err) => {
                warn!(
                    "event=memo_enrich module=memo_service status=error memo_id={} error={}",
                    memo.id, err
                );
                return memo;
            }
        };

        match self.save_enrichment(memo.id, &enrichment) {
            Ok(updated) => updated,
            Err(err) => {
                warn!(
                    "event=memo_enrich module=memo_service status=error memo_id={} stage=persist error={}",
                    memo.id, err
                );
                memo
            }
        }
    }

    fn enrich_best_effort(&self, memo: Memo) -> Memo {
        let Some(enricher) = self.enricher else {
            log_enrichment_skipped(memo.id);
            return memo;
        };
        let outcome = enricher.enrich(&memo.content);
        self.attach_enrichment(memo, outcome)
    }
}

fn log_enrichment_skipped(memo_id: MemoId) {
    warn!(
        "event=memo_enrich module=memo_service status=skipped memo_id={memo_id} reason=not_configured"
    );
}
