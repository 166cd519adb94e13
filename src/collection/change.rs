//! # Change notifications for the diverting collection.
//!
//! Two payload types back the collection's two events:
//! - [`StructureChanged`] — the shape of the sequence changed
//!   (insert/remove/move/clear);
//! - [`ElementChanged`] — one slot's value was replaced in place.
//!
//! Payloads carry clones of the affected items so observers diverted onto
//! other threads never reach back into the collection to see what happened.

/// Structural delta raised by insert/remove/move/clear.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructureChanged<T> {
    /// `item` was inserted at `index`.
    Inserted { index: usize, item: T },
    /// `item` was removed from `index`.
    Removed { index: usize, item: T },
    /// The item at `from` now lives at `to`.
    Moved { from: usize, to: usize },
    /// All items were removed; `len` is the count before the clear.
    Cleared { len: usize },
}

impl<T> StructureChanged<T> {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StructureChanged::Inserted { .. } => "inserted",
            StructureChanged::Removed { .. } => "removed",
            StructureChanged::Moved { .. } => "moved",
            StructureChanged::Cleared { .. } => "cleared",
        }
    }
}

/// In-place replacement of one element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementChanged<T> {
    /// The slot that changed.
    pub index: usize,
    /// The value that was replaced.
    pub old: T,
    /// The value now in the slot.
    pub new: T,
}
