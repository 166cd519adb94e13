//! # Subscriber trait and handler handles.
//!
//! Two ways to attach to a [`DiversionEvent`](crate::DiversionEvent):
//!
//! - a bare callable ([`HandlerFn`]), optionally with an explicit strategy
//!   key (`add` / `add_with_strategy`);
//! - a [`Subscriber`] implementor (`subscribe`), whose
//!   [`strategy`](Subscriber::strategy) hook is the *type-level* strategy
//!   override — the middle rung of the selection ladder.
//!
//! Either way `add` returns a [`DivertedHandler`], a handle to the stored
//! wrapper. Callers keep it to inspect the resolved descriptor (the
//! diverting collection reads the affinity context off it) or to remove
//! exactly that wrapper later.

use std::sync::Arc;

use crate::diverters::Diverter;
use crate::registry::{DispatchDescriptor, StrategyKey};

/// An event observer with an optional type-level strategy preference.
///
/// The blanket behavior mirrors attaching a bare callable; override
/// [`strategy`](Self::strategy) to pin every handler of this type to one
/// key without repeating it at each `subscribe` call site.
///
/// ## Example
/// ```
/// use diversions::{StrategyKey, Subscriber};
///
/// struct AuditLog;
///
/// impl Subscriber<String> for AuditLog {
///     fn on_event(&self, line: &String) {
///         log::info!("audit: {line}");
///     }
///
///     fn strategy(&self) -> Option<StrategyKey> {
///         Some(StrategyKey::BackgroundTask)
///     }
/// }
/// ```
pub trait Subscriber<A>: Send + Sync + 'static {
    /// Processes one event raise.
    ///
    /// Runs on whichever context the resolved strategy picked; diverted
    /// panics are swallowed into the log/failure sink, direct ones
    /// propagate to the raiser.
    fn on_event(&self, arg: &A);

    /// Type-level strategy override; `None` defers to the registry's
    /// default (unless the `subscribe` call site supplies an explicit key).
    fn strategy(&self) -> Option<StrategyKey> {
        None
    }

    /// Name used in logs. The default is `type_name::<Self>()`, which can
    /// be verbose — override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Handle to one stored handler wrapper.
///
/// Returned by every `add`/`subscribe`; exposes the resolved descriptor and
/// serves as the precise removal token for
/// [`remove_wrapper`](crate::DiversionEvent::remove_wrapper) (useful when
/// the same callable was added twice).
pub struct DivertedHandler<A> {
    diverter: Arc<dyn Diverter<A>>,
}

impl<A> DivertedHandler<A> {
    pub(crate) fn new(diverter: Arc<dyn Diverter<A>>) -> Self {
        Self { diverter }
    }

    pub(crate) fn diverter(&self) -> &Arc<dyn Diverter<A>> {
        &self.diverter
    }

    /// The immutable descriptor this wrapper relays through.
    pub fn descriptor(&self) -> &Arc<DispatchDescriptor> {
        self.diverter.descriptor()
    }

    /// The strategy key that was resolved for this handler at `add` time.
    pub fn key(&self) -> &StrategyKey {
        self.diverter.descriptor().key()
    }
}

impl<A> Clone for DivertedHandler<A> {
    fn clone(&self) -> Self {
        Self {
            diverter: Arc::clone(&self.diverter),
        }
    }
}

impl<A> std::fmt::Debug for DivertedHandler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DivertedHandler")
            .field("descriptor", self.descriptor())
            .finish()
    }
}
