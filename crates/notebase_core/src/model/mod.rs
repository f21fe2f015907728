//! Domain model for pages, blocks and memos.
//!
//! # Responsibility
//! - Define the records and write inputs shared by repositories and services.
//! - Own field-level validation rules (lengths, blank checks, finite keys).
//!
//! # Invariants
//! - Every record is identified by a stable v4 `Uuid`.
//! - Timestamps are Unix epoch milliseconds.

pub mod block;
pub mod memo;
pub mod page;

/// Partial-update instruction for a nullable field.
///
/// `Keep` leaves the stored value untouched, `Clear` writes NULL and `Set`
/// writes a new value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> FieldUpdate<T> {
    /// Builds an update from the `Option<Option<T>>` shape produced by JSON
    /// patch bodies: absent, explicit `null`, or a value.
    pub fn from_patch(value: Option<Option<T>>) -> Self {
        match value {
            None => Self::Keep,
            Some(None) => Self::Clear,
            Some(Some(value)) => Self::Set(value),
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    /// Returns the new stored value, or `None` when the field is untouched.
    pub fn as_change(&self) -> Option<Option<&T>> {
        match self {
            Self::Keep => None,
            Self::Clear => Some(None),
            Self::Set(value) => Some(Some(value)),
        }
    }
}

pub(crate) fn char_len(value: &str) -> usize {
    value.chars().count()
}

#[cfg(test)]
mod tests {
    use super::FieldUpdate;

    #[test]
    fn from_patch_distinguishes_absent_null_and_value() {
        assert_eq!(FieldUpdate::<i32>::from_patch(None), FieldUpdate::Keep);
        assert_eq!(FieldUpdate::<i32>::from_patch(Some(None)), FieldUpdate::Clear);
        assert_eq!(FieldUpdate::from_patch(Some(Some(7))), FieldUpdate::Set(7));
    }
}
