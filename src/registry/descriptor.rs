//! # Resolved dispatch descriptors.
//!
//! A [`DispatchDescriptor`] is the immutable record the registry produces
//! from a [`DispatchStrategy`](crate::DispatchStrategy) at registration
//! time. The registry entry owns it; every handler wrapper built from it
//! holds a shared `Arc` reference. Callers that `add` a handler get the
//! descriptor back through the returned handle and may inspect it — the
//! diverting collection does exactly that to discover an affinity context.

use std::sync::Arc;

use crate::affinity::AffinityContext;
use crate::registry::key::StrategyKey;
use crate::registry::strategy::{DispatchKind, DispatchShape, DispatchStrategy, RelayFn};

/// Immutable, resolved record of how one strategy relays handler calls.
///
/// The shape is stored whole: a background descriptor cannot exist without
/// its relay, nor an affinity descriptor without its context.
pub struct DispatchDescriptor {
    key: StrategyKey,
    shape: DispatchShape,
}

impl DispatchDescriptor {
    pub(crate) fn resolve(key: StrategyKey, strategy: DispatchStrategy) -> Arc<Self> {
        Arc::new(Self {
            key,
            shape: strategy.shape,
        })
    }

    /// The key this descriptor was registered under.
    pub fn key(&self) -> &StrategyKey {
        &self.key
    }

    /// The wrapper variant this descriptor produces.
    pub fn kind(&self) -> DispatchKind {
        self.shape.kind()
    }

    /// The relay operation, if the strategy has one
    /// ([`DispatchKind::Background`] and [`DispatchKind::Scheduler`]).
    pub fn relay(&self) -> Option<&RelayFn> {
        match &self.shape {
            DispatchShape::Background(relay) | DispatchShape::Scheduler(relay) => Some(relay),
            _ => None,
        }
    }

    /// The thread-affinity token, if the strategy targets one
    /// ([`DispatchKind::Affinity`] only).
    pub fn affinity(&self) -> Option<&AffinityContext> {
        match &self.shape {
            DispatchShape::Affinity(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub(crate) fn shape(&self) -> &DispatchShape {
        &self.shape
    }
}

impl std::fmt::Debug for DispatchDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchDescriptor")
            .field("key", &self.key)
            .field("kind", &self.kind())
            .field("has_relay", &self.relay().is_some())
            .field("affinity", &self.affinity())
            .finish()
    }
}
