//! # Strategy selection.
//!
//! Resolves which [`StrategyKey`] applies to a handler being attached.
//! Three levels, first match wins:
//!
//! 1. an explicit per-handler key (`add_with_strategy`);
//! 2. the subscriber type's [`strategy`](crate::Subscriber::strategy) hook;
//! 3. the registry's current default key.
//!
//! Selection happens once, at `add` time; the chosen key resolves against
//! the registry immediately, so an unknown key fails the `add` instead of
//! the later `invoke`.

use crate::registry::{StrategyKey, StrategyRegistry};

/// Picks the strategy key for one attach.
pub(crate) fn select(
    explicit: Option<StrategyKey>,
    type_level: Option<StrategyKey>,
    registry: &StrategyRegistry,
) -> StrategyKey {
    explicit
        .or(type_level)
        .unwrap_or_else(|| registry.default_key())
}
