//! # User-scheduler diverter.
//!
//! Behaviorally this is the background-task shape — build the
//! panic-catching thunk, hand it to the relay, return — with the relay
//! supplied by the user at registration time instead of seeded by the
//! registry. The thunk takes the argument slot the scheduler reserves for
//! an action. Kept as its own variant so diagnostics can tell pool
//! launches from scheduler launches apart.

use std::sync::Arc;

use crate::diverters::{catching_thunk, Diverter, FailureSink, HandlerFn};
use crate::registry::{DispatchDescriptor, RelayFn};

/// Wrapper that relays each raise through a user-supplied scheduler.
pub struct SchedulerDiverter<A> {
    handler: HandlerFn<A>,
    descriptor: Arc<DispatchDescriptor>,
    relay: RelayFn,
    sink: Option<FailureSink>,
}

impl<A> SchedulerDiverter<A> {
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

impl<A> Diverter<A> for SchedulerDiverter<A>
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
