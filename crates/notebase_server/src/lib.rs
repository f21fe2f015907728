//! HTTP/JSON surface over `notebase_core`.
//!
//! # Responsibility
//! - Expose page, block, memo and import operations under `/api`.
//! - Map service error kinds to HTTP statuses in one place.
//!
//! # Invariants
//! - All storage work runs on the blocking pool behind a single connection
//!   mutex; handlers never touch SQLite on an async worker thread.

pub mod rest;
pub mod state;

pub use rest::create_router;
pub use state::AppState;
