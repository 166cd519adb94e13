//! # The affinity-propagating collection.
//!
//! [`DivertingCollection`] is an ordered sequence whose structural mutators
//! relay *the mutation itself* onto a captured thread-affinity context
//! before the change notification fires. Without that, an observer pinned
//! to (say) a UI thread can receive a notification describing a mutation
//! that thread has not observed yet — the race this container exists to
//! close.
//!
//! ## Architecture
//! ```text
//! insert(i, x) from thread W, affinity context known:
//!   W ── ctx.send ──► pump thread:  mutate items
//!   W ◄── (blocks) ──               raise structure_changed  ─► observers
//!                                    │                           divert
//!                                    └─ affinity observers run   per their
//!                                       inline (fast path)       own key
//! ```
//!
//! ## Rules
//! - The context is captured as a side effect of attaching the first
//!   change observer whose resolved descriptor carries one (or set
//!   explicitly via [`set_affinity`](DivertingCollection::set_affinity));
//!   first one wins.
//! - With no known context, mutations run directly on the caller's thread.
//! - The relay is a blocking send: the mutation (and its notification
//!   fan-out hand-offs) complete before the mutator returns.
//! - A mutation issued from the thread currently raising one of this
//!   collection's notifications fails with
//!   [`DiversionError::Reentrancy`]. Mutations from *other* threads
//!   serialize on the items lock instead.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use crate::affinity::AffinityContext;
use crate::collection::change::{ElementChanged, StructureChanged};
use crate::diverters::HandlerFn;
use crate::error::DiversionError;
use crate::event::{DivertedHandler, DiversionEvent};
use crate::registry::{StrategyKey, StrategyRegistry};

/// Ordered sequence with affinity-relayed mutations and diverted change
/// events.
///
/// Cheap to clone; clones share the same items and observers.
pub struct DivertingCollection<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    items: Mutex<Vec<T>>,
    structure_changed: DiversionEvent<StructureChanged<T>>,
    element_changed: DiversionEvent<ElementChanged<T>>,
    affinity: Mutex<Option<AffinityContext>>,
    /// Threads currently inside a notification fan-out for this
    /// collection; consulted by the reentrancy check.
    notifying: Mutex<Vec<ThreadId>>,
}

impl<T> DivertingCollection<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty collection bound to `registry`.
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(Vec::new()),
                structure_changed: DiversionEvent::new(Arc::clone(&registry)),
                element_changed: DiversionEvent::new(registry),
                affinity: Mutex::new(None),
                notifying: Mutex::new(Vec::new()),
            }),
        }
    }

    // ---- Observer surface ----

    /// Attaches a structure-change observer under the registry default.
    ///
    /// If the observer's resolved descriptor carries an affinity context
    /// and none is captured yet, the collection adopts it for mutation
    /// relays.
    pub fn on_structure_changed(
        &self,
        handler: HandlerFn<StructureChanged<T>>,
    ) -> Result<DivertedHandler<StructureChanged<T>>, DiversionError> {
        let handle = self.inner.structure_changed.add(handler)?;
        self.capture_affinity(handle.descriptor().affinity());
        Ok(handle)
    }

    /// Attaches a structure-change observer under an explicit strategy key.
    pub fn on_structure_changed_with(
        &self,
        handler: HandlerFn<StructureChanged<T>>,
        key: StrategyKey,
    ) -> Result<DivertedHandler<StructureChanged<T>>, DiversionError> {
        let handle = self.inner.structure_changed.add_with_strategy(handler, key)?;
        self.capture_affinity(handle.descriptor().affinity());
        Ok(handle)
    }

    /// Attaches an element-change observer under the registry default.
    pub fn on_element_changed(
        &self,
        handler: HandlerFn<ElementChanged<T>>,
    ) -> Result<DivertedHandler<ElementChanged<T>>, DiversionError> {
        let handle = self.inner.element_changed.add(handler)?;
        self.capture_affinity(handle.descriptor().affinity());
        Ok(handle)
    }

    /// Attaches an element-change observer under an explicit strategy key.
    pub fn on_element_changed_with(
        &self,
        handler: HandlerFn<ElementChanged<T>>,
        key: StrategyKey,
    ) -> Result<DivertedHandler<ElementChanged<T>>, DiversionError> {
        let handle = self.inner.element_changed.add_with_strategy(handler, key)?;
        self.capture_affinity(handle.descriptor().affinity());
        Ok(handle)
    }

    /// Removes a structure-change observer by handler identity.
    pub fn remove_structure_observer(
        &self,
        handler: &HandlerFn<StructureChanged<T>>,
    ) -> Option<DivertedHandler<StructureChanged<T>>> {
        self.inner.structure_changed.remove(handler)
    }

    /// Removes an element-change observer by handler identity.
    pub fn remove_element_observer(
        &self,
        handler: &HandlerFn<ElementChanged<T>>,
    ) -> Option<DivertedHandler<ElementChanged<T>>> {
        self.inner.element_changed.remove(handler)
    }

    /// The captured mutation-relay context, if any.
    pub fn affinity(&self) -> Option<AffinityContext> {
        self.inner
            .affinity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Explicitly sets the mutation-relay context.
    ///
    /// Overrides whatever was (or would later be) captured from observers.
    pub fn set_affinity(&self, ctx: AffinityContext) {
        *self
            .inner
            .affinity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(ctx);
    }

    fn capture_affinity(&self, ctx: Option<&AffinityContext>) {
        let Some(ctx) = ctx else { return };
        let mut known = self
            .inner
            .affinity
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if known.is_none() {
            log::debug!("collection: captured affinity context from observer");
            *known = Some(ctx.clone());
        }
    }

    // ---- Mutators ----

    /// Appends `item`.
    ///
    /// # Errors
    /// [`DiversionError::Reentrancy`], [`DiversionError::AffinityClosed`].
    pub fn push(&self, item: T) -> Result<(), DiversionError> {
        self.check_reentrancy("push")?;
        let inner = Arc::clone(&self.inner);
        self.divert(move || inner.push_on_context(item))?
    }

    /// Inserts `item` at `index` (`index == len` appends).
    ///
    /// # Errors
    /// [`DiversionError::IndexOutOfBounds`], [`DiversionError::Reentrancy`],
    /// [`DiversionError::AffinityClosed`].
    pub fn insert(&self, index: usize, item: T) -> Result<(), DiversionError> {
        self.check_reentrancy("insert")?;
        let inner = Arc::clone(&self.inner);
        self.divert(move || inner.insert_on_context(index, item))?
    }

    /// Removes and returns the item at `index`.
    ///
    /// # Errors
    /// [`DiversionError::IndexOutOfBounds`], [`DiversionError::Reentrancy`],
    /// [`DiversionError::AffinityClosed`].
    pub fn remove(&self, index: usize) -> Result<T, DiversionError> {
        self.check_reentrancy("remove")?;
        let inner = Arc::clone(&self.inner);
        self.divert(move || inner.remove_on_context(index))?
    }

    /// Moves the item at `from` so it ends up at `to`.
    ///
    /// # Errors
    /// [`DiversionError::IndexOutOfBounds`], [`DiversionError::Reentrancy`],
    /// [`DiversionError::AffinityClosed`].
    pub fn move_item(&self, from: usize, to: usize) -> Result<(), DiversionError> {
        self.check_reentrancy("move_item")?;
        let inner = Arc::clone(&self.inner);
        self.divert(move || inner.move_on_context(from, to))?
    }

    /// Replaces the item at `index`, returning the previous value.
    ///
    /// Raises `element_changed` (not `structure_changed`): the shape of the
    /// sequence is unchanged.
    ///
    /// # Errors
    /// [`DiversionError::IndexOutOfBounds`], [`DiversionError::Reentrancy`],
    /// [`DiversionError::AffinityClosed`].
    pub fn replace(&self, index: usize, item: T) -> Result<T, DiversionError> {
        self.check_reentrancy("replace")?;
        let inner = Arc::clone(&self.inner);
        self.divert(move || inner.replace_on_context(index, item))?
    }

    /// Removes every item.
    ///
    /// # Errors
    /// [`DiversionError::Reentrancy`], [`DiversionError::AffinityClosed`].
    pub fn clear(&self) -> Result<(), DiversionError> {
        self.check_reentrancy("clear")?;
        let inner = Arc::clone(&self.inner);
        self.divert(move || inner.clear_on_context())?
    }

    // ---- Read access ----

    /// Clone of the item at `index`, if any.
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.lock_items().get(index).cloned()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.inner.lock_items().len()
    }

    /// `true` when the collection holds no items.
    pub fn is_empty(&self) -> bool {
        self.inner.lock_items().is_empty()
    }

    /// Clone of the current contents.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.lock_items().clone()
    }

    // ---- Plumbing ----

    /// Runs `f` on the captured affinity context when one is known and the
    /// caller is not already on it; otherwise runs `f` inline.
    fn divert<R, F>(&self, f: F) -> Result<R, DiversionError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let ctx = self.affinity();
        match ctx {
            Some(ctx) if !ctx.is_current() => ctx.send(f),
            _ => Ok(f()),
        }
    }

    fn check_reentrancy(&self, op: &'static str) -> Result<(), DiversionError> {
        let notifying = self
            .inner
            .notifying
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if notifying.contains(&thread::current().id()) {
            return Err(DiversionError::Reentrancy { op });
        }
        Ok(())
    }
}

impl<T> Clone for DivertingCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for DivertingCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DivertingCollection")
            .field("len", &self.inner.items.lock().map(|i| i.len()).unwrap_or(0))
            .finish()
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn lock_items(&self) -> std::sync::MutexGuard<'_, Vec<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_on_context(&self, item: T) -> Result<(), DiversionError> {
        let index = {
            let mut items = self.lock_items();
            items.push(item.clone());
            items.len() - 1
        };
        self.notify_structure(StructureChanged::Inserted { index, item });
        Ok(())
    }

    fn insert_on_context(&self, index: usize, item: T) -> Result<(), DiversionError> {
        {
            let mut items = self.lock_items();
            if index > items.len() {
                return Err(DiversionError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, item.clone());
        }
        self.notify_structure(StructureChanged::Inserted { index, item });
        Ok(())
    }

    fn remove_on_context(&self, index: usize) -> Result<T, DiversionError> {
        let item = {
            let mut items = self.lock_items();
            if index >= items.len() {
                return Err(DiversionError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.remove(index)
        };
        self.notify_structure(StructureChanged::Removed {
            index,
            item: item.clone(),
        });
        Ok(item)
    }

    fn move_on_context(&self, from: usize, to: usize) -> Result<(), DiversionError> {
        {
            let mut items = self.lock_items();
            let len = items.len();
            if from >= len {
                return Err(DiversionError::IndexOutOfBounds { index: from, len });
            }
            if to >= len {
                return Err(DiversionError::IndexOutOfBounds { index: to, len });
            }
            let item = items.remove(from);
            items.insert(to, item);
        }
        self.notify_structure(StructureChanged::Moved { from, to });
        Ok(())
    }

    fn replace_on_context(&self, index: usize, item: T) -> Result<T, DiversionError> {
        let old = {
            let mut items = self.lock_items();
            if index >= items.len() {
                return Err(DiversionError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            std::mem::replace(&mut items[index], item.clone())
        };
        self.notify_element(ElementChanged {
            index,
            old: old.clone(),
            new: item,
        });
        Ok(old)
    }

    fn clear_on_context(&self) -> Result<(), DiversionError> {
        let len = {
            let mut items = self.lock_items();
            let len = items.len();
            items.clear();
            len
        };
        self.notify_structure(StructureChanged::Cleared { len });
        Ok(())
    }

    fn notify_structure(&self, change: StructureChanged<T>) {
        let _guard = NotifyGuard::enter(&self.notifying);
        self.structure_changed.invoke(&change);
    }

    fn notify_element(&self, change: ElementChanged<T>) {
        let _guard = NotifyGuard::enter(&self.notifying);
        self.element_changed.invoke(&change);
    }
}

/// Marks the current thread as raising a notification for the collection;
/// unwinds cleanly if a direct observer panics.
struct NotifyGuard<'a> {
    notifying: &'a Mutex<Vec<ThreadId>>,
}

impl<'a> NotifyGuard<'a> {
    fn enter(notifying: &'a Mutex<Vec<ThreadId>>) -> Self {
        notifying
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(thread::current().id());
        Self { notifying }
    }
}

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        let id = thread::current().id();
        let mut notifying = self
            .notifying
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = notifying.iter().position(|t| *t == id) {
            notifying.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> DivertingCollection<u32> {
        DivertingCollection::new(Arc::new(StrategyRegistry::new()))
    }

    fn changes_of(
        col: &DivertingCollection<u32>,
    ) -> Arc<Mutex<Vec<StructureChanged<u32>>>> {
        let log: Arc<Mutex<Vec<StructureChanged<u32>>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&log);
        col.on_structure_changed(Arc::new(move |change: &StructureChanged<u32>| {
            seen.lock().unwrap().push(change.clone());
        }))
        .unwrap();
        log
    }

    #[test]
    fn test_mutators_update_and_notify_in_order() {
        let col = collection();
        let log = changes_of(&col);

        col.push(1).unwrap();
        col.push(3).unwrap();
        col.insert(1, 2).unwrap();
        assert_eq!(col.snapshot(), vec![1, 2, 3]);

        let removed = col.remove(0).unwrap();
        assert_eq!(removed, 1);
        col.move_item(0, 1).unwrap();
        assert_eq!(col.snapshot(), vec![3, 2]);
        col.clear().unwrap();
        assert!(col.is_empty());

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                StructureChanged::Inserted { index: 0, item: 1 },
                StructureChanged::Inserted { index: 1, item: 3 },
                StructureChanged::Inserted { index: 1, item: 2 },
                StructureChanged::Removed { index: 0, item: 1 },
                StructureChanged::Moved { from: 0, to: 1 },
                StructureChanged::Cleared { len: 2 },
            ]
        );
    }

    #[test]
    fn test_replace_raises_element_changed_only() {
        let col = collection();
        let structure_log = changes_of(&col);
        let element_log: Arc<Mutex<Vec<ElementChanged<u32>>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&element_log);
        col.on_element_changed(Arc::new(move |change: &ElementChanged<u32>| {
            seen.lock().unwrap().push(change.clone());
        }))
        .unwrap();

        col.push(10).unwrap();
        let old = col.replace(0, 20).unwrap();
        assert_eq!(old, 10);
        assert_eq!(col.get(0), Some(20));

        assert_eq!(
            *element_log.lock().unwrap(),
            vec![ElementChanged {
                index: 0,
                old: 10,
                new: 20
            }]
        );
        // Only the push shows up as a structural change.
        assert_eq!(structure_log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_out_of_bounds_is_typed_and_silent() {
        let col = collection();
        let log = changes_of(&col);

        assert_eq!(
            col.insert(1, 9).unwrap_err().as_label(),
            "index_out_of_bounds"
        );
        assert_eq!(col.remove(0).unwrap_err().as_label(), "index_out_of_bounds");
        assert_eq!(
            col.replace(0, 9).unwrap_err().as_label(),
            "index_out_of_bounds"
        );
        assert_eq!(
            col.move_item(0, 0).unwrap_err().as_label(),
            "index_out_of_bounds"
        );
        assert!(log.lock().unwrap().is_empty(), "failed mutations must not notify");
    }

    #[test]
    fn test_reentrant_mutation_is_rejected() {
        let col = collection();
        let reentrant: Arc<Mutex<Option<DiversionError>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&reentrant);
        let inner = col.clone();
        col.on_structure_changed(Arc::new(move |_: &StructureChanged<u32>| {
            *slot.lock().unwrap() = inner.push(99).err();
        }))
        .unwrap();

        col.push(1).unwrap();
        let err = reentrant.lock().unwrap().take().expect("push must fail inside handler");
        assert_eq!(err.as_label(), "reentrancy_violation");
        assert_eq!(col.snapshot(), vec![1]);
    }

    #[test]
    fn test_affinity_captured_from_observer() {
        let registry = Arc::new(StrategyRegistry::new());
        let (ctx, _pump) = AffinityContext::new();
        registry
            .register(
                StrategyKey::from("ui"),
                crate::registry::DispatchStrategy::affinity(ctx.clone()),
            )
            .unwrap();
        let col: DivertingCollection<u32> = DivertingCollection::new(registry);
        assert!(col.affinity().is_none());

        col.on_structure_changed_with(Arc::new(|_| {}), StrategyKey::from("ui"))
            .unwrap();
        assert_eq!(col.affinity(), Some(ctx));
    }

    #[test]
    fn test_mutation_relay_reports_dead_pump() {
        let registry = Arc::new(StrategyRegistry::new());
        let (ctx, pump) = AffinityContext::new();
        let col: DivertingCollection<u32> = DivertingCollection::new(registry);
        col.set_affinity(ctx);
        drop(pump);

        assert_eq!(col.push(1).unwrap_err().as_label(), "affinity_closed");
        assert!(col.is_empty());
    }
}
