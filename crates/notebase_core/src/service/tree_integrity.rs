//! Page tree integrity checks.
//!
//! # Responsibility
//! - Decide whether attaching a page under a candidate parent would close a
//!   cycle in the parent graph.
//!
//! # Invariants
//! - Checks are read-only; one parent lookup per ancestor level.
//! - Corrupt data (an already-cyclic ancestor chain) is reported as a cycle.

use crate::model::page::PageId;
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;

/// Read access to the parent pointer of one page.
pub trait ParentLookup {
    type Error;

    /// Returns the parent of `page_id`, or `None` for roots and unknown ids.
    fn parent_of(&self, page_id: PageId) -> Result<Option<PageId>, Self::Error>;
}

/// In-memory parent map, keyed by child id.
impl ParentLookup for HashMap<PageId, Option<PageId>> {
    type Error = Infallible;

    fn parent_of(&self, page_id: PageId) -> Result<Option<PageId>, Self::Error> {
        Ok(self.get(&page_id).copied().flatten())
    }
}

/// Returns `true` when `page_id` placed under `candidate_parent_id` would make
/// the page its own ancestor.
///
/// The walk starts at the candidate and climbs towards the root. Meeting
/// `page_id` on the way means the candidate lives inside the page's subtree.
/// A missing ancestor row ends the walk as if it were a root.
pub fn would_create_cycle<L: ParentLookup + ?Sized>(
    lookup: &L,
    page_id: PageId,
    candidate_parent_id: Option<PageId>,
) -> Result<bool, L::Error> {
    let Some(candidate) = candidate_parent_id else {
        return Ok(false);
    };

    let mut visited = HashSet::new();
    let mut cursor = Some(candidate);
    while let Some(current) = cursor {
        if current == page_id {
            return Ok(true);
        }
        if !visited.insert(current) {
            return Ok(true);
        }
        cursor = lookup.parent_of(current)?;
    }
    Ok(false)
}
