//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce tree and ordering invariants above the storage layer.
//! - Classify every failure with an [`ErrorKind`] so outer layers map
//!   statuses in one place.

pub mod block_order;
pub mod block_service;
pub mod import_service;
pub mod memo_service;
pub mod page_service;
pub mod tree_integrity;

/// Transport-neutral failure category shared by all service errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Addressed page, block, memo or parent does not exist.
    NotFound,
    /// Reference is well-formed but structurally invalid (self-parent, cycle).
    InvalidReference,
    /// Field-level validation failure.
    InvalidInput,
    /// External API key is not configured.
    UpstreamAuthMissing,
    /// External service reports the object as missing.
    UpstreamNotFound,
    /// External service call failed.
    UpstreamFailure,
    /// AI enrichment is not configured or failed.
    AiUnavailable,
    Unexpected,
}
