//! # The diversion multicast list.
//!
//! [`DiversionEvent`] is the event-like primitive model classes embed to
//! implement their own change-notification events. It owns an ordered list
//! of handler wrappers; raising the event walks the list and each wrapper
//! independently relays onto its own context.
//!
//! ## Architecture
//! ```text
//! add(handler) ─► selector ─► registry.resolve(key) ─► build wrapper ─► append
//!
//! invoke(arg)  ─► snapshot ─► wrapper₁.invoke ─► … ─► wrapperₙ.invoke
//!                               │                       │
//!                               inline / launcher / pump / scheduler
//! ```
//!
//! ## Rules
//! - Insertion order is the synchronous fan-out order (hand-off order only;
//!   completion order across contexts is unspecified).
//! - The internal lock covers mutation (`add`/`remove`) and the snapshot
//!   copy; it is **never** held while a handler runs, so handlers may
//!   freely `add`/`remove` without deadlocking.
//! - `invoke` iterates a snapshot: a wrapper added during an in-flight
//!   raise is not seen by that pass.
//! - No uniqueness constraint: adding the same callable twice yields two
//!   independent wrappers (and two calls per raise).

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use crate::diverters::{build_diverter, Diverter, HandlerFn};
use crate::error::DiversionError;
use crate::event::handler::{DivertedHandler, Subscriber};
use crate::event::selector;
use crate::registry::{RelayFn, StrategyKey, StrategyRegistry};

/// Thread-safe ordered multicast list of independently-diverted handlers.
///
/// Constructed with an injected [`StrategyRegistry`]; there is no global
/// configuration.
///
/// ## Example
/// ```
/// use std::sync::{Arc, Mutex};
/// use diversions::{DiversionEvent, StrategyRegistry};
///
/// let registry = Arc::new(StrategyRegistry::new());
/// let event: DiversionEvent<u32> = DiversionEvent::new(registry);
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// event.add_fn(move |arg| sink.lock().unwrap().push(*arg)).unwrap();
///
/// event.invoke(&5);
/// assert_eq!(*seen.lock().unwrap(), vec![5]);
/// ```
pub struct DiversionEvent<A> {
    registry: Arc<StrategyRegistry>,
    list: Mutex<Vec<Arc<dyn Diverter<A>>>>,
}

impl<A> DiversionEvent<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// Creates an empty event bound to `registry`.
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self {
            registry,
            list: Mutex::new(Vec::new()),
        }
    }

    /// The registry this event resolves strategies against.
    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    /// Attaches `handler` under the registry's default strategy.
    ///
    /// Returns the stored wrapper's handle; inspect its descriptor to
    /// discover e.g. an affinity context.
    ///
    /// # Errors
    /// [`DiversionError::UnknownStrategy`] when the default key has no
    /// registry entry (possible only if the default was never registered).
    pub fn add(&self, handler: HandlerFn<A>) -> Result<DivertedHandler<A>, DiversionError> {
        self.attach(handler, None, None)
    }

    /// Attaches `handler` under an explicit per-handler strategy key.
    ///
    /// # Errors
    /// [`DiversionError::UnknownStrategy`] when `key` was never registered;
    /// the handler is not stored.
    pub fn add_with_strategy(
        &self,
        handler: HandlerFn<A>,
        key: StrategyKey,
    ) -> Result<DivertedHandler<A>, DiversionError> {
        self.attach(handler, Some(key), None)
    }

    /// Convenience for [`add`](Self::add): wraps a plain closure.
    ///
    /// The caller holds no `Arc` to the raw handler afterwards, so removal
    /// goes through [`remove_wrapper`](Self::remove_wrapper) with the
    /// returned handle.
    pub fn add_fn<F>(&self, handler: F) -> Result<DivertedHandler<A>, DiversionError>
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.add(Arc::new(handler))
    }

    /// Like [`add_fn`](Self::add_fn) with an explicit strategy key.
    pub fn add_fn_with_strategy<F>(
        &self,
        handler: F,
        key: StrategyKey,
    ) -> Result<DivertedHandler<A>, DiversionError>
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.add_with_strategy(Arc::new(handler), key)
    }

    /// Attaches a [`Subscriber`]; its [`strategy`](Subscriber::strategy)
    /// hook is the type-level override in the selection ladder.
    ///
    /// # Errors
    /// [`DiversionError::UnknownStrategy`] when the selected key was never
    /// registered.
    pub fn subscribe<S>(&self, subscriber: Arc<S>) -> Result<DivertedHandler<A>, DiversionError>
    where
        S: Subscriber<A>,
    {
        let type_level = subscriber.strategy();
        let handler: HandlerFn<A> = Arc::new(move |arg| subscriber.on_event(arg));
        self.attach(handler, None, type_level)
    }

    fn attach(
        &self,
        handler: HandlerFn<A>,
        explicit: Option<StrategyKey>,
        type_level: Option<StrategyKey>,
    ) -> Result<DivertedHandler<A>, DiversionError> {
        let key = selector::select(explicit, type_level, &self.registry);
        let descriptor = self.registry.resolve(&key)?;
        let diverter = build_diverter(handler, descriptor, self.registry.failure_sink());
        self.lock().push(Arc::clone(&diverter));
        Ok(DivertedHandler::new(diverter))
    }

    /// Removes the first wrapper whose raw handler is the same allocation
    /// as `handler`.
    ///
    /// Returns the removed wrapper's handle, or `None` when nothing
    /// matched. With duplicate adds, one call removes one wrapper; precise
    /// removal of a specific wrapper goes through
    /// [`remove_wrapper`](Self::remove_wrapper).
    pub fn remove(&self, handler: &HandlerFn<A>) -> Option<DivertedHandler<A>> {
        let target = Arc::as_ptr(handler) as *const ();
        let mut list = self.lock();
        let index = list.iter().position(|w| w.handler_ptr() == target)?;
        Some(DivertedHandler::new(list.remove(index)))
    }

    /// Removes the first wrapper routed through `relay`.
    ///
    /// This is removal by *resolved relay* rather than by subscriber:
    /// descriptors share one relay allocation per registry entry, so any
    /// wrapper attached under the strategy that owns `relay` matches,
    /// regardless of which callable it wraps. Obtain the relay from a
    /// handle's descriptor.
    pub fn remove_by_relay(&self, relay: &RelayFn) -> Option<DivertedHandler<A>> {
        let target = Arc::as_ptr(relay) as *const ();
        let mut list = self.lock();
        let index = list.iter().position(|w| {
            w.descriptor()
                .relay()
                .is_some_and(|r| Arc::as_ptr(r) as *const () == target)
        })?;
        Some(DivertedHandler::new(list.remove(index)))
    }

    /// Removes exactly the wrapper behind `handle`.
    ///
    /// Returns `false` when it was already gone.
    pub fn remove_wrapper(&self, handle: &DivertedHandler<A>) -> bool {
        let mut list = self.lock();
        let before = list.len();
        list.retain(|w| !Arc::ptr_eq(w, handle.diverter()));
        list.len() != before
    }

    /// Raises the event synchronously.
    ///
    /// Walks a snapshot of the list in insertion order and calls each
    /// wrapper's `invoke`. Direct wrappers (and affinity fast paths) run
    /// fully inline — their panics propagate to this caller; diverted
    /// wrappers return at hand-off.
    pub fn invoke(&self, arg: &A) {
        for diverter in self.snapshot() {
            diverter.invoke(arg);
        }
    }

    /// Runs the full synchronous fan-out off this thread.
    ///
    /// Returns immediately; the handle completes when every wrapper has
    /// *returned* from `invoke` (fire-and-forget relays may still have work
    /// in flight). Must be called from within a tokio runtime.
    pub fn invoke_async(&self, arg: A) -> tokio::task::JoinHandle<()> {
        let snapshot = self.snapshot();
        tokio::task::spawn_blocking(move || {
            for diverter in &snapshot {
                diverter.invoke(&arg);
            }
        })
    }

    /// Dispatches every wrapper's `invoke` concurrently instead of
    /// sequentially.
    ///
    /// The returned future completes when all hand-offs have returned.
    /// Must be polled from within a tokio runtime.
    pub fn invoke_parallel(&self, arg: A) -> impl Future<Output = ()> {
        let handles: Vec<_> = self
            .snapshot()
            .into_iter()
            .map(|diverter| {
                let arg = arg.clone();
                tokio::task::spawn_blocking(move || diverter.invoke(&arg))
            })
            .collect();
        async move {
            for joined in futures::future::join_all(handles).await {
                if let Err(err) = joined {
                    log::error!("invoke_parallel: dispatch task failed: {err}");
                }
            }
        }
    }

    /// `true` when at least one handler is attached.
    pub fn has_listeners(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Number of attached wrappers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` when no handler is attached.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<dyn Diverter<A>>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn Diverter<A>>>> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A> std::fmt::Debug for DiversionEvent<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiversionEvent")
            .field("listeners", &self.list.lock().map(|l| l.len()).unwrap_or(0))
            .finish()
    }
}
