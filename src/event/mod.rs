//! Multicast events: handler handles, strategy selection, and the list.
//!
//! ## Contents
//! - [`DiversionEvent`] the thread-safe multicast list
//! - [`DivertedHandler`] handle to one stored wrapper
//! - [`Subscriber`] observer trait with a type-level strategy hook
//!
//! ## Quick reference
//! - **Producers** embed a `DiversionEvent<A>` per logical event and call
//!   `invoke`/`invoke_async`/`invoke_parallel`.
//! - **Consumers** attach via `add`, `add_with_strategy` or `subscribe` and
//!   may keep the returned handle for precise removal or descriptor
//!   inspection.

mod handler;
mod list;
mod selector;

pub use list::DiversionEvent;
pub use handler::{DivertedHandler, Subscriber};
