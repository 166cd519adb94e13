//! # Direct (current-thread) diverter.
//!
//! No diversion at all: the handler runs synchronously on whichever thread
//! raised the event, and panics propagate straight to the raiser.

use std::sync::Arc;

use crate::diverters::{Diverter, HandlerFn};
use crate::registry::DispatchDescriptor;

/// Wrapper that calls its handler inline on the raising thread.
pub struct DirectDiverter<A> {
    handler: HandlerFn<A>,
    descriptor: Arc<DispatchDescriptor>,
}

impl<A> DirectDiverter<A> {
    pub(crate) fn new(handler: HandlerFn<A>, descriptor: Arc<DispatchDescriptor>) -> Self {
        Self {
            handler,
            descriptor,
        }
    }
}

impl<A> Diverter<A> for DirectDiverter<A> {
    fn invoke(&self, arg: &A) {
        (self.handler)(arg);
    }

    fn descriptor(&self) -> &Arc<DispatchDescriptor> {
        &self.descriptor
    }

    fn handler_ptr(&self) -> *const () {
        Arc::as_ptr(&self.handler) as *const ()
    }
}
