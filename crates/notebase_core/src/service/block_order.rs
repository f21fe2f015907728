//! Fractional ordering of blocks within a page.
//!
//! # Responsibility
//! - Provide order-key arithmetic for appends, inserts and rebalancing.
//! - Detect neighbours whose keys leave no room for another key.
//!
//! # Invariants
//! - Keys are finite `f64`; duplicates are legal and keep insertion sequence.
//! - Moving one block never rewrites its siblings. Only an explicit
//!   rebalance renumbers a page.

use crate::model::block::{Block, BlockId, BlockValidationError, DEFAULT_BLOCK_ORDER};

/// Rejects NaN and infinities.
pub fn validate_order(order: f64) -> Result<f64, BlockValidationError> {
    if order.is_finite() {
        Ok(order)
    } else {
        Err(BlockValidationError::NonFiniteOrder(order))
    }
}

/// Key that places a new block after all `existing` keys.
pub fn next_trailing_order<I>(existing: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    existing
        .into_iter()
        .reduce(f64::max)
        .map_or(DEFAULT_BLOCK_ORDER, |max| max + 1.0)
}

/// Key strictly between two neighbours.
///
/// A missing neighbour is an open end: before the first block the key is
/// `after - 1.0`, after the last one it is `before + 1.0`.
pub fn order_between(before: Option<f64>, after: Option<f64>) -> f64 {
    match (before, after) {
        (Some(before), Some(after)) => before + (after - before) / 2.0,
        (Some(before), None) => before + 1.0,
        (None, Some(after)) => after - 1.0,
        (None, None) => DEFAULT_BLOCK_ORDER,
    }
}

/// Returns `true` when no representable key is left strictly between
/// `before` and `after`.
pub fn needs_rebalance(before: f64, after: f64) -> bool {
    let (low, high) = if before <= after {
        (before, after)
    } else {
        (after, before)
    };
    let mid = order_between(Some(low), Some(high));
    !(low < mid && mid < high)
}

/// Whether any two adjacent blocks (in display order) have no key left
/// between them.
pub fn has_exhausted_gap(blocks: &[Block]) -> bool {
    blocks
        .windows(2)
        .any(|pair| needs_rebalance(pair[0].order, pair[1].order))
}

/// Whether `block_id` has no key left towards either display neighbour.
/// Unknown ids are never crowded.
pub fn is_crowded(blocks: &[Block], block_id: BlockId) -> bool {
    let Some(index) = blocks.iter().position(|block| block.id == block_id) else {
        return false;
    };
    let order = blocks[index].order;
    let before = index.checked_sub(1).map(|prev| blocks[prev].order);
    let after = blocks.get(index + 1).map(|next| next.order);
    before.is_some_and(|before| needs_rebalance(before, order))
        || after.is_some_and(|after| needs_rebalance(order, after))
}

/// Evenly spaced keys `1.0, 2.0, ...` for blocks already in display order.
pub fn rebalanced_orders(blocks: &[Block]) -> Vec<(BlockId, f64)> {
    blocks
        .iter()
        .enumerate()
        .map(|(index, block)| (block.id, (index + 1) as f64))
        .collect()
}
