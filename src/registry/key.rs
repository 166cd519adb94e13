//! # Strategy keys.
//!
//! [`StrategyKey`] is the stable identifier a handler (or the registry
//! default) uses to name a dispatch strategy. Two keys are built in and
//! seeded by every [`StrategyRegistry`](crate::StrategyRegistry); user-defined
//! strategies use free-form [`StrategyKey::Custom`] names.

use std::fmt;
use std::sync::Arc;

/// Identifier for a registered dispatch strategy.
///
/// Cheap to clone (custom names are `Arc<str>`), hashable, and usable as a
/// map key. Uniqueness is enforced at registration time by the registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKey {
    /// Invoke handlers synchronously on the raising thread (the no-op
    /// strategy; seeded as the initial registry default).
    CurrentThread,
    /// Hand handlers off to the background task launcher (seeded).
    BackgroundTask,
    /// A user-defined strategy registered under a free-form name.
    Custom(Arc<str>),
}

impl StrategyKey {
    /// Returns the key's stable textual form, as used in logs.
    pub fn as_str(&self) -> &str {
        match self {
            StrategyKey::CurrentThread => "current_thread",
            StrategyKey::BackgroundTask => "background_task",
            StrategyKey::Custom(name) => name,
        }
    }
}

impl fmt::Display for StrategyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for StrategyKey {
    /// Builds a [`StrategyKey::Custom`] from a free-form name.
    fn from(name: &str) -> Self {
        StrategyKey::Custom(Arc::from(name))
    }
}

impl From<String> for StrategyKey {
    fn from(name: String) -> Self {
        StrategyKey::Custom(Arc::from(name.as_str()))
    }
}
