//! Strategy registration and resolution.
//!
//! This module groups the dispatch **configuration surface**: the key space,
//! the registration input, the resolved descriptor, and the registry table
//! that binds them together.
//!
//! ## Contents
//! - [`StrategyKey`] stable strategy identifiers
//! - [`DispatchStrategy`] registration input (typed relay closures)
//! - [`DispatchDescriptor`] immutable resolved record shared by wrappers
//! - [`StrategyRegistry`] the injected, internally-synchronized table
//!
//! ## Quick reference
//! - **Writers**: application start-up code (`register`, `set_default`).
//! - **Readers**: [`DiversionEvent::add`](crate::DiversionEvent::add) via the
//!   strategy selector, on every handler attach.

mod descriptor;
mod key;
mod strategy;
mod table;

pub use descriptor::DispatchDescriptor;
pub use key::StrategyKey;
pub use strategy::{DispatchKind, DispatchStrategy, RelayFn, Thunk};
pub use table::StrategyRegistry;

pub(crate) use strategy::DispatchShape;
