//! # Background-task diverter.
//!
//! Packages each raise as a panic-catching thunk and hands it to the
//! descriptor's relay — for the seeded
//! [`StrategyKey::BackgroundTask`](crate::StrategyKey::BackgroundTask)
//! strategy that is the tokio blocking pool. `invoke` returns as soon as
//! the hand-off does; completion of the handler itself is fire and forget.

use std::sync::Arc;

use crate::diverters::{catching_thunk, Diverter, FailureSink, HandlerFn};
use crate::registry::{DispatchDescriptor, RelayFn};

/// Wrapper that relays each raise onto a task launcher.
pub struct TaskDiverter<A> {
    handler: HandlerFn<A>,
    descriptor: Arc<DispatchDescriptor>,
    relay: RelayFn,
    sink: Option<FailureSink>,
}

impl<A> TaskDiverter<A> {
    pub(crate) fn new(
        handler: HandlerFn<A>,
        descriptor: Arc<DispatchDescriptor>,
        relay: RelayFn,
        sink: Option<FailureSink>,
    ) -> Self {
        Self {
            handler,
            descriptor,
            relay,
            sink,
        }
    }
}

impl<A> Diverter<A> for TaskDiverter<A>
where
    A: Clone + Send + Sync + 'static,
{
    fn invoke(&self, arg: &A) {
        let thunk = catching_thunk(&self.handler, arg, self.descriptor.key(), &self.sink);
        (self.relay)(thunk);
    }

    fn descriptor(&self) -> &Arc<DispatchDescriptor> {
        &self.descriptor
    }

    fn handler_ptr(&self) -> *const () {
        Arc::as_ptr(&self.handler) as *const ()
    }
}
