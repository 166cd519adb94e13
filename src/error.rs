//! Error types used by the diversion engine.
//!
//! This module defines [`DiversionError`], the single error enum shared by the
//! strategy registry, the multicast event list and the diverting collection.
//!
//! The enum provides helper methods (`as_label`, `as_message`) for
//! logging/metrics, mirroring the rest of the crate's observability surface.
//!
//! ## Failure surfaces
//! - **Registration** (`DuplicateStrategy`) — surfaced to the caller as a
//!   typed error; registering twice under one key never silently succeeds.
//! - **Resolution** (`UnknownStrategy`) — fatal to the `add` call that
//!   triggered it.
//! - **Collection mutation** (`Reentrancy`, `IndexOutOfBounds`,
//!   `AffinityClosed`) — fatal to the offending mutation only.
//!
//! Handler failures inside diverted (off-thread) work are deliberately *not*
//! part of this enum: they never reach the caller and are reported through
//! the log and the registry's failure sink instead (see
//! [`HandlerFailure`](crate::HandlerFailure)).

use thiserror::Error;

use crate::registry::StrategyKey;

/// # Errors produced by the diversion engine.
///
/// Covers strategy configuration failures and diverting-collection mutation
/// failures. Invocation-time handler failures are out of band by design
/// (fire-and-forget relays swallow them into the log/failure sink).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DiversionError {
    /// A strategy key was resolved that was never registered.
    #[error("unknown strategy key: {key}")]
    UnknownStrategy {
        /// The key that failed to resolve.
        key: StrategyKey,
    },

    /// A strategy was registered under a key that already exists.
    ///
    /// Registry entries are never removed, so the only recovery is to pick
    /// a different key.
    #[error("strategy key already registered: {key}")]
    DuplicateStrategy {
        /// The key that was already present.
        key: StrategyKey,
    },

    /// A collection mutation was issued from inside an in-flight change
    /// notification on the same collection.
    #[error("reentrant mutation during change notification: {op}")]
    Reentrancy {
        /// The mutating operation that was rejected (e.g. `"insert"`).
        op: &'static str,
    },

    /// A collection index was out of range for the operation.
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// The collection length at the time of the call.
        len: usize,
    },

    /// The affinity pump behind a captured context is gone (every handle
    /// dropped), so a blocking relay could not be delivered.
    #[error("affinity context closed; pump is no longer running")]
    AffinityClosed,
}

impl DiversionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use diversions::{DiversionError, StrategyKey};
    ///
    /// let err = DiversionError::UnknownStrategy { key: StrategyKey::from("afterthought") };
    /// assert_eq!(err.as_label(), "unknown_strategy");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DiversionError::UnknownStrategy { .. } => "unknown_strategy",
            DiversionError::DuplicateStrategy { .. } => "duplicate_strategy",
            DiversionError::Reentrancy { .. } => "reentrancy_violation",
            DiversionError::IndexOutOfBounds { .. } => "index_out_of_bounds",
            DiversionError::AffinityClosed => "affinity_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DiversionError::UnknownStrategy { key } => format!("unknown strategy: {key}"),
            DiversionError::DuplicateStrategy { key } => format!("duplicate strategy: {key}"),
            DiversionError::Reentrancy { op } => format!("reentrant {op} during notification"),
            DiversionError::IndexOutOfBounds { index, len } => {
                format!("index {index} out of bounds for len {len}")
            }
            DiversionError::AffinityClosed => "affinity context closed".to_string(),
        }
    }
}
