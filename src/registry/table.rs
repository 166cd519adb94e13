//! # The strategy registry.
//!
//! [`StrategyRegistry`] maps [`StrategyKey`]s to resolved
//! [`DispatchDescriptor`]s. It is an explicit configuration object — there
//! is no process-wide table. Build one during application start-up, wrap it
//! in an `Arc`, and inject it into every
//! [`DiversionEvent`](crate::DiversionEvent) and
//! [`DivertingCollection`](crate::DivertingCollection) that should share it.
//!
//! ## Rules
//! - Seeded at construction with [`StrategyKey::CurrentThread`] (the no-op
//!   descriptor, initial default) and [`StrategyKey::BackgroundTask`]
//!   (fire-and-forget hand-off to the runtime's blocking pool).
//! - Entries are write-once: re-registering a key is a typed error and the
//!   table keeps the original entry. Entries are never removed.
//! - Changing the default key is logged and affects subsequent resolutions
//!   only; wrappers already built keep their descriptor.
//! - Internally synchronized; registration may race with resolution from
//!   other threads.
//!
//! ## Example
//! ```
//! use diversions::{DispatchStrategy, StrategyKey, StrategyRegistry};
//!
//! let registry = StrategyRegistry::new();
//! assert_eq!(registry.default_key(), StrategyKey::CurrentThread);
//!
//! registry
//!     .register(StrategyKey::from("inline-too"), DispatchStrategy::current_thread())
//!     .unwrap();
//! registry.set_default(StrategyKey::from("inline-too")).unwrap();
//! assert_eq!(registry.default_key(), StrategyKey::from("inline-too"));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::diverters::FailureSink;
use crate::error::DiversionError;
use crate::registry::descriptor::DispatchDescriptor;
use crate::registry::key::StrategyKey;
use crate::registry::strategy::{DispatchShape, DispatchStrategy, RelayFn, Thunk};

/// Table of registered dispatch strategies plus the mutable default key.
///
/// Write-once-then-read-many: registrations happen at start-up (or rarely
/// after), resolutions happen on every handler `add`.
pub struct StrategyRegistry {
    table: RwLock<HashMap<StrategyKey, Arc<DispatchDescriptor>>>,
    default: RwLock<StrategyKey>,
    failure_sink: Option<FailureSink>,
}

impl StrategyRegistry {
    /// Creates a registry seeded with the built-in strategies.
    ///
    /// The background launcher prefers the tokio runtime that is current at
    /// construction time, so build the registry from inside your runtime
    /// when you use [`StrategyKey::BackgroundTask`].
    pub fn new() -> Self {
        let table = HashMap::from([
            (
                StrategyKey::CurrentThread,
                DispatchDescriptor::resolve(
                    StrategyKey::CurrentThread,
                    DispatchStrategy::current_thread(),
                ),
            ),
            (
                StrategyKey::BackgroundTask,
                DispatchDescriptor::resolve(
                    StrategyKey::BackgroundTask,
                    DispatchStrategy {
                        shape: DispatchShape::Background(background_relay()),
                    },
                ),
            ),
        ]);
        Self {
            table: RwLock::new(table),
            default: RwLock::new(StrategyKey::CurrentThread),
            failure_sink: None,
        }
    }

    /// Installs a structured observability channel for swallowed handler
    /// failures.
    ///
    /// Fire-and-forget relays catch handler panics so they never reach the
    /// `invoke` caller; besides the log line, each one is forwarded to this
    /// sink. The sink runs on whatever thread the failure was caught on —
    /// keep it fast and non-panicking.
    pub fn with_failure_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(crate::diverters::HandlerFailure) + Send + Sync + 'static,
    {
        self.failure_sink = Some(Arc::new(sink));
        self
    }

    /// Registers `strategy` under `key`.
    ///
    /// # Errors
    /// [`DiversionError::DuplicateStrategy`] when `key` already exists; the
    /// existing entry is kept.
    pub fn register(
        &self,
        key: StrategyKey,
        strategy: DispatchStrategy,
    ) -> Result<(), DiversionError> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if table.contains_key(&key) {
            return Err(DiversionError::DuplicateStrategy { key });
        }
        let descriptor = DispatchDescriptor::resolve(key.clone(), strategy);
        table.insert(key, descriptor);
        Ok(())
    }

    /// Registers `strategy` under `key` and makes it the default in one
    /// step.
    ///
    /// # Errors
    /// Same as [`register`](Self::register); on a duplicate key the default
    /// is left untouched.
    pub fn register_default(
        &self,
        key: StrategyKey,
        strategy: DispatchStrategy,
    ) -> Result<(), DiversionError> {
        self.register(key.clone(), strategy)?;
        self.set_default(key)
    }

    /// Resolves `key` to its descriptor.
    ///
    /// # Errors
    /// [`DiversionError::UnknownStrategy`] when `key` was never registered.
    pub fn resolve(&self, key: &StrategyKey) -> Result<Arc<DispatchDescriptor>, DiversionError> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| DiversionError::UnknownStrategy { key: key.clone() })
    }

    /// The strategy used when a handler supplies no key of its own.
    pub fn default_key(&self) -> StrategyKey {
        self.default
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Changes the default strategy for *subsequent* resolutions.
    ///
    /// Handlers already added keep the strategy they resolved at `add`
    /// time.
    ///
    /// # Errors
    /// [`DiversionError::UnknownStrategy`] when `key` was never registered.
    pub fn set_default(&self, key: StrategyKey) -> Result<(), DiversionError> {
        // Validate against the table so an unregistered default can never
        // poison later `add` calls.
        let _ = self.resolve(&key)?;
        let mut default = self.default.write().unwrap_or_else(PoisonError::into_inner);
        log::debug!("registry: default strategy changed {} -> {}", *default, key);
        *default = key;
        Ok(())
    }

    pub(crate) fn failure_sink(&self) -> Option<FailureSink> {
        self.failure_sink.clone()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("StrategyRegistry")
            .field("keys", &table.keys().collect::<Vec<_>>())
            .field("default", &self.default_key())
            .finish()
    }
}

/// Hand-off to the tokio blocking pool, falling back to a plain thread when
/// no runtime is reachable (e.g. a handler raised from a foreign OS thread).
fn background_relay() -> RelayFn {
    let handle = tokio::runtime::Handle::try_current().ok();
    Arc::new(move |thunk: Thunk| {
        let current = handle
            .clone()
            .or_else(|| tokio::runtime::Handle::try_current().ok());
        match current {
            Some(h) => {
                h.spawn_blocking(thunk);
            }
            None => {
                std::thread::spawn(thunk);
            }
        }
    })
}
