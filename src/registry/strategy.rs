//! # Dispatch strategies (registration input).
//!
//! [`DispatchStrategy`] is what a caller hands to
//! [`StrategyRegistry::register`](crate::StrategyRegistry::register). It
//! binds the *how* of a diversion as a typed relay closure: instead of
//! naming a target object and method and having the registry match a
//! signature at runtime, the caller supplies a function value that takes the
//! ready-made [`Thunk`] and hands it to whatever launcher or scheduler it
//! owns. Any fixed launch arguments are ordinary captures of that closure,
//! so signature compatibility is checked by the compiler, not at
//! registration time.
//!
//! ## Shapes
//! - [`current_thread`](DispatchStrategy::current_thread) — no relay at all.
//! - [`background`](DispatchStrategy::background) — fire-and-forget hand-off
//!   to a task launcher.
//! - [`scheduler`](DispatchStrategy::scheduler) — fire-and-forget hand-off
//!   to a user-supplied scheduler; the thunk takes the slot the scheduler
//!   reserves for an action.
//! - [`affinity`](DispatchStrategy::affinity) — targets one
//!   [`AffinityContext`]; carries the context token used for the
//!   same-thread fast path and for collection mutation relays.
//!
//! ## Example
//! ```
//! use diversions::{DispatchStrategy, StrategyKey, StrategyRegistry};
//!
//! let registry = StrategyRegistry::new();
//! // A "scheduler" that runs work on a dedicated thread per call.
//! registry
//!     .register(
//!         StrategyKey::from("spawny"),
//!         DispatchStrategy::scheduler(|thunk| {
//!             std::thread::spawn(thunk);
//!         }),
//!     )
//!     .unwrap();
//! ```

use std::sync::Arc;

use crate::affinity::AffinityContext;

/// A deferred handler call: the raw handler plus its captured arguments,
/// packaged as a single runnable unit for a relay to launch.
pub type Thunk = Box<dyn FnOnce() + Send + 'static>;

/// Relay operation: receives a [`Thunk`] and hands it to a launcher,
/// scheduler or context. Shared by every wrapper built from one descriptor.
pub type RelayFn = Arc<dyn Fn(Thunk) + Send + Sync + 'static>;

/// Which wrapper variant a descriptor produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchKind {
    /// No relay; invoke inline on the raising thread.
    CurrentThread,
    /// Fire-and-forget hand-off to a task launcher.
    Background,
    /// Relay onto a single thread-affine context, with a same-thread
    /// fast path.
    Affinity,
    /// Fire-and-forget hand-off to a user-supplied scheduler.
    Scheduler,
}

/// The relay shape behind a strategy; each variant carries exactly the
/// parts its wrapper needs, so a resolved descriptor can never be missing
/// them.
#[derive(Clone)]
pub(crate) enum DispatchShape {
    CurrentThread,
    Background(RelayFn),
    Scheduler(RelayFn),
    Affinity(AffinityContext),
}

impl DispatchShape {
    pub(crate) fn kind(&self) -> DispatchKind {
        match self {
            DispatchShape::CurrentThread => DispatchKind::CurrentThread,
            DispatchShape::Background(_) => DispatchKind::Background,
            DispatchShape::Scheduler(_) => DispatchKind::Scheduler,
            DispatchShape::Affinity(_) => DispatchKind::Affinity,
        }
    }
}

/// Registration input: the relay shape for one strategy key.
///
/// Immutable; consumed by [`StrategyRegistry::register`](crate::StrategyRegistry::register),
/// which turns it into the resolved
/// [`DispatchDescriptor`](crate::DispatchDescriptor) handlers share.
pub struct DispatchStrategy {
    pub(crate) shape: DispatchShape,
}

impl DispatchStrategy {
    /// The no-op strategy: handlers run inline on whichever thread raises
    /// the event.
    pub fn current_thread() -> Self {
        Self {
            shape: DispatchShape::CurrentThread,
        }
    }

    /// A background strategy: each invocation builds a thunk and hands it
    /// to `relay`, which is expected to launch it without waiting
    /// (fire and forget).
    pub fn background<F>(relay: F) -> Self
    where
        F: Fn(Thunk) + Send + Sync + 'static,
    {
        Self {
            shape: DispatchShape::Background(Arc::new(relay)),
        }
    }

    /// A user-scheduler strategy: same hand-off shape as
    /// [`background`](Self::background), kept distinct so callers can tell
    /// pool launches from scheduler launches apart in diagnostics.
    pub fn scheduler<F>(relay: F) -> Self
    where
        F: Fn(Thunk) + Send + Sync + 'static,
    {
        Self {
            shape: DispatchShape::Scheduler(Arc::new(relay)),
        }
    }

    /// An affinity strategy targeting `ctx`.
    ///
    /// Handlers relay onto the context's pump thread unless the raising
    /// thread already *is* that thread; the context token is also what the
    /// diverting collection captures for mutation relays.
    pub fn affinity(ctx: AffinityContext) -> Self {
        Self {
            shape: DispatchShape::Affinity(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_carry_expected_parts() {
        let s = DispatchStrategy::current_thread();
        assert!(matches!(s.shape, DispatchShape::CurrentThread));
        assert_eq!(s.shape.kind(), DispatchKind::CurrentThread);

        let s = DispatchStrategy::background(|thunk| thunk());
        assert!(matches!(s.shape, DispatchShape::Background(_)));
        assert_eq!(s.shape.kind(), DispatchKind::Background);

        let (ctx, _pump) = AffinityContext::new();
        match DispatchStrategy::affinity(ctx.clone()).shape {
            DispatchShape::Affinity(carried) => assert_eq!(carried, ctx),
            _ => panic!("affinity strategy must carry its context"),
        }
    }
}
