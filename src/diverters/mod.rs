//! # Handler wrappers (diverters).
//!
//! A diverter wraps one subscribed handler together with the resolved
//! [`DispatchDescriptor`](crate::DispatchDescriptor) that decides *where*
//! the handler runs. The multicast list stores diverters, not raw handlers;
//! raising an event walks the list and calls [`Diverter::invoke`] on each,
//! and every diverter independently relays (or doesn't) onto its own
//! context.
//!
//! ## Variants
//! ```text
//! invoke(arg)
//!   ├─ DirectDiverter     — call inline on the raising thread
//!   ├─ TaskDiverter       — thunk ► background launcher   (fire and forget)
//!   ├─ AffinityDiverter   — inline when already on the pump thread,
//!   │                       else thunk ► affinity context
//!   └─ SchedulerDiverter  — thunk ► user-supplied scheduler (fire and forget)
//! ```
//!
//! ## Failure policy
//! Direct calls and the affinity fast path let handler panics propagate to
//! whoever raised the event. Diverted thunks catch panics, log them, and
//! forward a [`HandlerFailure`] to the registry's failure sink; the raiser
//! never observes them.

mod affinity;
mod direct;
mod scheduler;
mod task;

pub use affinity::AffinityDiverter;
pub use direct::DirectDiverter;
pub use scheduler::SchedulerDiverter;
pub use task::TaskDiverter;

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::registry::{DispatchDescriptor, DispatchShape, StrategyKey, Thunk};

/// A subscribed handler: called once per raise with a borrowed payload.
///
/// The `Arc`'s pointer identity is the handler's identity for
/// [`DiversionEvent::remove`](crate::DiversionEvent::remove).
pub type HandlerFn<A> = Arc<dyn Fn(&A) + Send + Sync + 'static>;

/// Structured record of a handler failure swallowed by a fire-and-forget
/// relay.
#[derive(Clone, Debug)]
pub struct HandlerFailure {
    /// The strategy the failing handler was diverted through.
    pub strategy: StrategyKey,
    /// Panic payload rendered as text.
    pub detail: String,
}

/// Observability channel for swallowed handler failures; installed via
/// [`StrategyRegistry::with_failure_sink`](crate::StrategyRegistry::with_failure_sink).
pub type FailureSink = Arc<dyn Fn(HandlerFailure) + Send + Sync + 'static>;

/// Capability shared by every wrapper variant: relay one event raise.
pub trait Diverter<A>: Send + Sync {
    /// Delivers `arg` to the wrapped handler through this diverter's
    /// strategy.
    fn invoke(&self, arg: &A);

    /// The resolved descriptor this wrapper was built from.
    fn descriptor(&self) -> &Arc<DispatchDescriptor>;

    /// Identity of the raw handler (data pointer), used for
    /// removal-by-identity.
    fn handler_ptr(&self) -> *const ();
}

/// Builds the wrapper variant matching the descriptor's shape.
///
/// Every shape carries the relay or context its wrapper needs, so there is
/// no fallback: a handler attached under a background strategy can only
/// ever produce a background wrapper.
pub(crate) fn build_diverter<A>(
    handler: HandlerFn<A>,
    descriptor: Arc<DispatchDescriptor>,
    sink: Option<FailureSink>,
) -> Arc<dyn Diverter<A>>
where
    A: Clone + Send + Sync + 'static,
{
    match descriptor.shape() {
        DispatchShape::CurrentThread => {
            Arc::new(DirectDiverter::new(handler, Arc::clone(&descriptor)))
        }
        DispatchShape::Background(relay) => Arc::new(TaskDiverter::new(
            handler,
            Arc::clone(&descriptor),
            Arc::clone(relay),
            sink,
        )),
        DispatchShape::Scheduler(relay) => Arc::new(SchedulerDiverter::new(
            handler,
            Arc::clone(&descriptor),
            Arc::clone(relay),
            sink,
        )),
        DispatchShape::Affinity(ctx) => Arc::new(AffinityDiverter::new(
            handler,
            Arc::clone(&descriptor),
            ctx.clone(),
            sink,
        )),
    }
}

/// Packages one handler call as a panic-catching [`Thunk`].
///
/// The thunk owns clones of the handler, the payload and the sink, so the
/// relay may run it on any thread at any later time. A panic inside the
/// handler is caught *inside the thunk*: it is logged, forwarded to the
/// sink, and never reaches the relay mechanism.
pub(crate) fn catching_thunk<A>(
    handler: &HandlerFn<A>,
    arg: &A,
    strategy: &StrategyKey,
    sink: &Option<FailureSink>,
) -> Thunk
where
    A: Clone + Send + Sync + 'static,
{
    let handler = Arc::clone(handler);
    let arg = arg.clone();
    let strategy = strategy.clone();
    let sink = sink.clone();
    Box::new(move || {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(&arg))) {
            let detail = panic_detail(&*panic);
            log::error!("diverter[{strategy}]: handler panicked: {detail}");
            if let Some(sink) = &sink {
                sink(HandlerFailure { strategy, detail });
            }
        }
    })
}

/// Renders a panic payload as text for logs and [`HandlerFailure`].
pub(crate) fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
