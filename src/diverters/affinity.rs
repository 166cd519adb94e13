//! # Affinity-thread diverter.
//!
//! Targets a single [`AffinityContext`]. The fast path skips the relay
//! entirely: when the raising thread already *is* the pump thread, the
//! handler runs inline (and panics propagate to the raiser, exactly like a
//! direct wrapper). Otherwise the raise is packaged as a panic-catching
//! thunk and posted to the context; the pump thread is shared, so a bad
//! handler must never take it down.

use std::sync::Arc;

use crate::affinity::AffinityContext;
use crate::diverters::{catching_thunk, Diverter, FailureSink, HandlerFn};
use crate::registry::DispatchDescriptor;

/// Wrapper that relays each raise onto one thread-affine context.
pub struct AffinityDiverter<A> {
    handler: HandlerFn<A>,
    descriptor: Arc<DispatchDescriptor>,
    ctx: AffinityContext,
    sink: Option<FailureSink>,
}

impl<A> AffinityDiverter<A> {
    pub(crate) fn new(
        handler: HandlerFn<A>,
        descriptor: Arc<DispatchDescriptor>,
        ctx: AffinityContext,
        sink: Option<FailureSink>,
    ) -> Self {
        Self {
            handler,
            descriptor,
            ctx,
            sink,
        }
    }
}

impl<A> Diverter<A> for AffinityDiverter<A>
where
    A: Clone + Send + Sync + 'static,
{
    fn invoke(&self, arg: &A) {
        if self.ctx.is_current() {
            (self.handler)(arg);
            return;
        }
        let thunk = catching_thunk(&self.handler, arg, self.descriptor.key(), &self.sink);
        self.ctx.post(thunk);
    }

    fn descriptor(&self) -> &Arc<DispatchDescriptor> {
        &self.descriptor
    }

    fn handler_ptr(&self) -> *const () {
        Arc::as_ptr(&self.handler) as *const ()
    }
}
