//! # diversions
//!
//! **Diversions** is an event-diversion dispatch engine: a single logical
//! event is raised once, synchronously, on the producer's thread, while
//! each independently-subscribed observer redirects its own invocation onto
//! a thread context of its choosing — the caller's thread, a background
//! worker, a dedicated affinity (UI-style) thread, or a user-supplied
//! scheduler. The producer never knows or cares which context each
//! observer requires.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            ┌──────────────────┐
//!            │ StrategyRegistry │  register(key, strategy) / set_default
//!            │  key ─► descriptor│  seeded: CurrentThread, BackgroundTask
//!            └────────┬─────────┘
//!                     │ resolve at add-time (explicit key ► type key ► default)
//!                     ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │ DiversionEvent<A>  (ordered multicast list)               │
//! │   add(h) ─► wrapper built from resolved descriptor        │
//! │   invoke(arg) ─► wrapper₁ … wrapperₙ, insertion order     │
//! └──────┬──────────────┬──────────────┬──────────────┬───────┘
//!        ▼              ▼              ▼              ▼
//!   DirectDiverter  TaskDiverter  AffinityDiverter  SchedulerDiverter
//!   (inline)        (blocking     (pump thread,     (user relay,
//!                    pool, fire    fast path when    fire and
//!                    and forget)   already there)    forget)
//! ```
//!
//! ### The collection
//! [`DivertingCollection`] couples the engine to a mutable sequence: its
//! structural mutators are relayed onto a captured affinity context
//! *before* the change notification fans out, so an affinity-bound
//! observer never sees a notification for a mutation its thread has not
//! performed yet.
//!
//! ## Features
//! | Area               | Description                                             | Key types / traits                          |
//! |--------------------|---------------------------------------------------------|---------------------------------------------|
//! | **Strategies**     | Register/resolve named dispatch strategies.             | [`StrategyRegistry`], [`StrategyKey`], [`DispatchStrategy`] |
//! | **Events**         | Multicast list with per-handler thread redirection.     | [`DiversionEvent`], [`DivertedHandler`], [`Subscriber`] |
//! | **Affinity**       | Target a single thread-affine context (UI pump style).  | [`AffinityContext`], [`AffinityPump`]       |
//! | **Collection**     | Mutation-aware sequence with race-free notifications.   | [`DivertingCollection`], [`StructureChanged`], [`ElementChanged`] |
//! | **Errors**         | Typed configuration and mutation failures.              | [`DiversionError`]                          |
//! | **Diagnostics**    | Structured channel for swallowed handler failures.      | [`HandlerFailure`]                          |
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use diversions::{DispatchStrategy, DiversionEvent, StrategyKey, StrategyRegistry};
//!
//! // Configuration is explicit: build a registry, inject it everywhere.
//! let registry = Arc::new(StrategyRegistry::new());
//! registry
//!     .register(
//!         StrategyKey::from("own-thread"),
//!         DispatchStrategy::scheduler(|thunk| {
//!             std::thread::spawn(thunk);
//!         }),
//!     )
//!     .unwrap();
//!
//! let event: DiversionEvent<(String, u32)> = DiversionEvent::new(Arc::clone(&registry));
//!
//! // Default strategy (CurrentThread): runs inline, before invoke returns.
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! event
//!     .add_fn(move |(who, n)| sink.lock().unwrap().push(format!("{who}:{n}")))
//!     .unwrap();
//!
//! // Explicit per-handler strategy: handed off to the "own-thread" relay.
//! event
//!     .add_fn_with_strategy(|_| { /* runs elsewhere */ }, StrategyKey::from("own-thread"))
//!     .unwrap();
//!
//! event.invoke(&("model".to_string(), 5));
//! assert_eq!(*seen.lock().unwrap(), vec!["model:5"]);
//! ```
//!
//! ## Guarantees (and non-guarantees)
//! - Hand-off happens in registration order; completion order across
//!   contexts is unspecified.
//! - `invoke` never blocks beyond its wrappers' synchronous relay calls.
//! - Fire-and-forget relays swallow handler panics: logged, forwarded to
//!   the registry's failure sink, never rethrown to the raiser.
//! - No cancellation, backpressure, or priority semantics — best-effort
//!   thread redirection for event fan-out only.

mod affinity;
mod collection;
mod diverters;
mod error;
mod event;
mod registry;

// ---- Public re-exports ----

pub use affinity::{AffinityContext, AffinityPump};
pub use collection::{DivertingCollection, ElementChanged, StructureChanged};
pub use diverters::{
    AffinityDiverter, DirectDiverter, Diverter, FailureSink, HandlerFailure, HandlerFn,
    SchedulerDiverter, TaskDiverter,
};
pub use error::DiversionError;
pub use event::{DivertedHandler, DiversionEvent, Subscriber};
pub use registry::{
    DispatchDescriptor, DispatchKind, DispatchStrategy, RelayFn, StrategyKey, StrategyRegistry,
    Thunk,
};
